//! MachineParser: the compiled-grammar front door.
//!
//! Compiles a grammar on construction and runs matches against it,
//! assembling the end position and the accumulated values into a
//! [`Match`].

use std::collections::HashMap;

use bumpalo::Bump;
use common::{trace, tracer, Tracer};

use crate::error::{GrammarError, MachineError};
use crate::grammar::Grammar;
use crate::value::{determine, Binding, Value};

use super::compiler::compile;
use super::program::Program;
use super::vm::Machine;

/// A grammar compiled to a program, ready to match.
pub struct MachineParser<'a> {
    start: &'a str,
    program: Program<'a>,
    #[allow(dead_code)]
    log: Tracer,
}

impl<'a> MachineParser<'a> {
    /// Compile the grammar. The start rule must be defined.
    pub fn new(arena: &'a Bump, grammar: &Grammar<'a>) -> Result<Self, GrammarError> {
        let program = compile(arena, grammar)?;
        let start = grammar.start();
        if !program.contains(start) {
            return Err(GrammarError::UndefinedRule(start.to_string()));
        }
        let log = tracer("parser");
        trace!(
            log,
            "compiled {} instructions, start rule {}",
            program.len(),
            start
        );
        Ok(Self {
            start,
            program,
            log,
        })
    }

    pub fn start(&self) -> &'a str {
        self.start
    }

    pub fn program(&self) -> &Program<'a> {
        &self.program
    }

    pub fn contains(&self, name: &str) -> bool {
        self.program.contains(name)
    }

    /// Match the start rule at the beginning of `input`.
    pub fn match_str<'s>(&self, input: &'s str) -> Result<Option<Match<'a, 's>>, MachineError> {
        self.match_at(input, 0)
    }

    /// Match the start rule with the cursor at `pos`.
    pub fn match_at<'s>(
        &self,
        input: &'s str,
        pos: usize,
    ) -> Result<Option<Match<'a, 's>>, MachineError> {
        self.match_rule(self.start, input, pos)
    }

    /// Match a named rule with the cursor at `pos`.
    pub fn match_rule<'s>(
        &self,
        name: &str,
        input: &'s str,
        pos: usize,
    ) -> Result<Option<Match<'a, 's>>, MachineError> {
        let addr = match self.program.entry(name) {
            Some(addr) => addr,
            None => return Err(MachineError::UnknownRule(name.to_string())),
        };
        let mut vm = Machine::new(&self.program, input);
        match vm.run(addr, pos)? {
            Some(end) => {
                let (args, kwargs) = vm.finish();
                Ok(Some(Match {
                    input,
                    pos,
                    end,
                    args,
                    kwargs,
                }))
            }
            None => Ok(None),
        }
    }

    /// Dump the program listing to stderr.
    pub fn dump(&self) {
        self.program.dump();
    }
}

/// The result of a successful match.
#[derive(Debug)]
pub struct Match<'a, 's> {
    input: &'s str,
    pos: usize,
    end: usize,
    args: Vec<Value<'s>>,
    kwargs: Vec<Binding<'a, 's>>,
}

impl<'a, 's> Match<'a, 's> {
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The matched region of the input.
    pub fn as_str(&self) -> &'s str {
        &self.input[self.pos..self.end]
    }

    /// Top-level emitted values.
    pub fn groups(&self) -> &[Value<'s>] {
        &self.args
    }

    pub fn group(&self, i: usize) -> Option<&Value<'s>> {
        self.args.get(i)
    }

    /// Bindings in emission order; a name may repeat.
    pub fn bindings(&self) -> &[Binding<'a, 's>] {
        &self.kwargs
    }

    /// The final name-to-value mapping; later bindings win.
    pub fn groupdict(&self) -> HashMap<&'a str, &Value<'s>> {
        self.kwargs
            .iter()
            .map(|(name, value)| (*name, value))
            .collect()
    }

    /// The determined value: the first emitted value, or the empty
    /// sentinel if nothing was emitted.
    pub fn value(&self) -> Value<'s> {
        determine(&self.args)
    }

    pub fn into_parts(self) -> (Vec<Value<'s>>, Vec<Binding<'a, 's>>) {
        (self.args, self.kwargs)
    }
}
