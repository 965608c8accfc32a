//! Compiler from operator trees to instruction programs.
//!
//! Each operator compiles to a small instruction block with relative
//! offsets; blocks compose by concatenation, so no patching pass is
//! needed. The whole program is framed by a FAIL sentinel at address 0
//! and a PASS sentinel at the end, with every rule body followed by a
//! RETURN. A final pass resolves CALL targets through the rule index.

use bumpalo::Bump;
use hashbrown::HashMap;

use crate::actions::{Action, Bind};
use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::operators::Op;

use super::program::{Instruction, OpCode, Program};
use super::scanner::{CharClass, RegexScanner, Scanner};

/// Compile a grammar. Rule bodies are laid out in definition order;
/// the index maps each rule name to the address of its body.
pub fn compile<'a>(arena: &'a Bump, grammar: &Grammar<'a>) -> Result<Program<'a>, GrammarError> {
    if grammar.is_empty() {
        return Err(GrammarError::EmptyGrammar);
    }

    let compiler = Compiler { arena };
    let mut code = vec![Instruction::new(OpCode::Fail)];
    let mut index = HashMap::new();

    for (name, expr) in grammar.definitions() {
        index.insert(name, code.len());
        code.extend(compiler.emit(expr)?);
        code.push(Instruction::new(OpCode::Return));
    }

    // Resolve CALL targets now that every rule has an address.
    for inst in code.iter_mut() {
        if inst.opcode == OpCode::Call {
            if let Some(name) = inst.name {
                match index.get(name) {
                    Some(&addr) => inst.oploc = addr as i32,
                    None => return Err(GrammarError::UndefinedRule(name.to_string())),
                }
            }
        }
    }

    code.push(Instruction::new(OpCode::Pass));

    Ok(Program::new(code, index))
}

struct Compiler<'a> {
    arena: &'a Bump,
}

impl<'a> Compiler<'a> {
    fn emit(&self, op: &'a Op<'a>) -> Result<Vec<Instruction<'a>>, GrammarError> {
        match *op {
            Op::Dot => Ok(vec![scan(Scanner::Dot)]),

            Op::Literal(s) => Ok(vec![scan(Scanner::Literal(s))]),

            Op::Class { ranges, negated } => {
                let class = CharClass::new(ranges, negated, 1, 1)?;
                Ok(vec![scan(Scanner::Class(class))])
            }

            Op::Regex { pattern, flags } => {
                let re = RegexScanner::new(pattern, flags)?;
                Ok(vec![scan(Scanner::Regex(re))])
            }

            Op::Optional(expr) => {
                // BRANCH done
                // <expr>
                // COMMIT +1
                // done:
                let body = self.emit(expr)?;
                let mut out = Vec::with_capacity(body.len() + 2);
                out.push(jump(OpCode::Branch, body.len() as i32 + 2));
                out.extend(body);
                out.push(jump(OpCode::Commit, 1));
                Ok(out)
            }

            Op::Star(expr) => self.repeat(expr, 0),

            Op::Plus(expr) => self.repeat(expr, 1),

            Op::Nonterminal(name) => {
                let mut inst = Instruction::new(OpCode::Call);
                inst.name = Some(name);
                Ok(vec![inst])
            }

            Op::And(expr) => {
                // BRANCH fail
                // <expr>
                // RESTORE +2
                // fail: FAIL
                let body = self.emit(expr)?;
                let mut out = Vec::with_capacity(body.len() + 3);
                out.push(jump(OpCode::Branch, body.len() as i32 + 2));
                out.extend(body);
                out.push(jump(OpCode::Restore, 2));
                out.push(Instruction::new(OpCode::Fail));
                Ok(out)
            }

            Op::Not(expr) => {
                // BRANCH done
                // <expr>
                // FAILTWICE
                // done:
                let body = self.emit(expr)?;
                let mut out = Vec::with_capacity(body.len() + 2);
                out.push(jump(OpCode::Branch, body.len() as i32 + 2));
                out.extend(body);
                out.push(Instruction::new(OpCode::FailTwice));
                Ok(out)
            }

            Op::Capture(expr) => self.capture(expr),

            Op::Bind { name, expr } => {
                let action: &'a dyn Action<'a> = self.arena.alloc(Bind::new(name));
                self.rule(expr, action)
            }

            Op::Sequence(items) => {
                let mut out = Vec::new();
                for &item in items {
                    out.extend(self.emit(item)?);
                }
                Ok(out)
            }

            Op::Choice(items) => self.choice(items),

            Op::Rule { expr, action } => self.rule(expr, action),
        }
    }

    /// STR and PLS share one shape; `min` mandatory copies come first.
    fn repeat(&self, expr: &'a Op<'a>, min: u32) -> Result<Vec<Instruction<'a>>, GrammarError> {
        let body = self.emit(expr)?;

        // A lone plain class scan collapses into the scanner's own run
        // counts; class greed matches the quantifier exactly.
        if let [inst] = body.as_slice() {
            if inst.opcode == OpCode::Scan
                && !inst.marking
                && !inst.capturing
                && inst.action.is_none()
            {
                if let Some(Scanner::Class(class)) = &inst.scanner {
                    return Ok(vec![scan(Scanner::Class(class.with_run(min, -1)))]);
                }
            }
        }

        // <expr>              (min times)
        // loop: BRANCH done
        // <expr>
        // UPDATE loop+1
        // done:
        let len = body.len() as i32;
        let mut out = Vec::with_capacity(body.len() * (min as usize + 1) + 2);
        for _ in 0..min {
            out.extend(body.iter().cloned());
        }
        out.push(jump(OpCode::Branch, len + 2));
        out.extend(body);
        out.push(jump(OpCode::Update, -len));
        Ok(out)
    }

    /// Right fold over the alternatives:
    ///
    /// BRANCH alt2
    /// <alt1>
    /// COMMIT done
    /// alt2: ...
    /// done:
    fn choice(&self, items: &'a [&'a Op<'a>]) -> Result<Vec<Instruction<'a>>, GrammarError> {
        let mut blocks = Vec::with_capacity(items.len());
        for &item in items {
            blocks.push(self.emit(item)?);
        }
        let mut out = match blocks.pop() {
            Some(last) => last,
            // A choice with no alternatives has nothing to take.
            None => return Ok(vec![Instruction::new(OpCode::Fail)]),
        };
        while let Some(block) = blocks.pop() {
            let mut folded = Vec::with_capacity(block.len() + out.len() + 2);
            folded.push(jump(OpCode::Branch, block.len() as i32 + 2));
            folded.extend(block);
            folded.push(jump(OpCode::Commit, out.len() as i32 + 1));
            folded.extend(out);
            out = folded;
        }
        Ok(out)
    }

    /// Mark the block head and emit the matched substring at its tail.
    fn capture(&self, expr: &'a Op<'a>) -> Result<Vec<Instruction<'a>>, GrammarError> {
        // A captured choice always needs a fresh tail: an early
        // alternative commits past the last alternative's instructions.
        let choice = matches!(expr, Op::Choice(_));
        let mut body = self.emit(expr)?;
        mark_head(&mut body);
        let tail_taken = match body.last() {
            Some(last) => {
                last.capturing
                    || last.action.is_some()
                    || last.opcode.manipulates_stack()
                    || choice
            }
            None => true,
        };
        if tail_taken {
            let mut noop = Instruction::new(OpCode::Noop);
            noop.capturing = true;
            body.push(noop);
        } else if let Some(last) = body.last_mut() {
            last.capturing = true;
        }
        Ok(body)
    }

    /// Mark the block head and attach the action at its tail.
    fn rule(
        &self,
        expr: &'a Op<'a>,
        action: &'a dyn Action<'a>,
    ) -> Result<Vec<Instruction<'a>>, GrammarError> {
        let choice = matches!(expr, Op::Choice(_));
        let mut body = self.emit(expr)?;
        mark_head(&mut body);
        let tail_taken = match body.last() {
            Some(last) => last.action.is_some() || last.opcode.manipulates_stack() || choice,
            None => true,
        };
        if tail_taken {
            let mut noop = Instruction::new(OpCode::Noop);
            noop.action = Some(action);
            body.push(noop);
        } else if let Some(last) = body.last_mut() {
            last.action = Some(action);
        }
        Ok(body)
    }
}

/// Mark the first instruction of a block, or give the block a NOOP head
/// when the natural slot already marks or manipulates the stack.
fn mark_head(body: &mut Vec<Instruction<'_>>) {
    match body.first_mut() {
        Some(first)
            if !first.marking && !first.capturing && !first.opcode.manipulates_stack() =>
        {
            first.marking = true;
        }
        _ => {
            let mut noop = Instruction::new(OpCode::Noop);
            noop.marking = true;
            body.insert(0, noop);
        }
    }
}

fn scan(scanner: Scanner<'_>) -> Instruction<'_> {
    let mut inst = Instruction::new(OpCode::Scan);
    inst.scanner = Some(scanner);
    inst
}

fn jump<'a>(opcode: OpCode, oploc: i32) -> Instruction<'a> {
    let mut inst = Instruction::new(opcode);
    inst.oploc = oploc;
    inst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(program: &Program) -> Vec<OpCode> {
        program.code.iter().map(|inst| inst.opcode).collect()
    }

    #[test]
    fn program_framing() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::lit(&arena, "abc"));
        let program = compile(&arena, &grammar).unwrap();
        assert_eq!(
            opcodes(&program),
            vec![OpCode::Fail, OpCode::Scan, OpCode::Return, OpCode::Pass]
        );
        assert_eq!(program.entry("Start"), Some(1));
    }

    #[test]
    fn quantifier_collapse() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::plus(&arena, Op::class(&arena, "0-9")));
        let program = compile(&arena, &grammar).unwrap();
        // The class absorbs the quantifier: one SCAN, no loop.
        assert_eq!(
            opcodes(&program),
            vec![OpCode::Fail, OpCode::Scan, OpCode::Return, OpCode::Pass]
        );
        match &program.code[1].scanner {
            Some(Scanner::Class(class)) => {
                assert_eq!(class.min(), 1);
                assert_eq!(class.max(), -1);
            }
            _ => panic!("expected a class scanner"),
        }
    }

    #[test]
    fn star_of_non_class_loops() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::star(&arena, Op::lit(&arena, "ab")));
        let program = compile(&arena, &grammar).unwrap();
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::Fail,
                OpCode::Branch,
                OpCode::Scan,
                OpCode::Update,
                OpCode::Return,
                OpCode::Pass,
            ]
        );
        assert_eq!(program.code[1].oploc, 3);
        assert_eq!(program.code[3].oploc, -1);
    }

    #[test]
    fn optional_layout() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::opt(&arena, Op::lit(&arena, "a")));
        let program = compile(&arena, &grammar).unwrap();
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::Fail,
                OpCode::Branch,
                OpCode::Scan,
                OpCode::Commit,
                OpCode::Return,
                OpCode::Pass,
            ]
        );
        assert_eq!(program.code[1].oploc, 3);
        assert_eq!(program.code[3].oploc, 1);
    }

    #[test]
    fn call_targets_resolve() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::sym(&arena, "Digit"));
        grammar.define("Digit", Op::class(&arena, "0-9"));
        let program = compile(&arena, &grammar).unwrap();
        let call = &program.code[1];
        assert_eq!(call.opcode, OpCode::Call);
        assert_eq!(call.oploc as usize, program.entry("Digit").unwrap());
    }

    #[test]
    fn undefined_rule_is_reported() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::sym(&arena, "Missing"));
        match compile(&arena, &grammar) {
            Err(GrammarError::UndefinedRule(name)) => assert_eq!(name, "Missing"),
            _ => panic!("expected an undefined-rule error"),
        };
    }

    #[test]
    fn empty_grammar_is_rejected() {
        let arena = Bump::new();
        let grammar = Grammar::new(&arena, "Start");
        assert!(matches!(
            compile(&arena, &grammar),
            Err(GrammarError::EmptyGrammar)
        ));
    }

    #[test]
    fn captured_call_gets_noop_carriers() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        grammar.define("Start", Op::capture(&arena, Op::sym(&arena, "Inner")));
        grammar.define("Inner", Op::dot(&arena));
        let program = compile(&arena, &grammar).unwrap();
        // NOOP[mark] CALL NOOP[cap]
        let body = &program.code[1..4];
        assert_eq!(body[0].opcode, OpCode::Noop);
        assert!(body[0].marking);
        assert_eq!(body[1].opcode, OpCode::Call);
        assert!(!body[1].marking && !body[1].capturing);
        assert_eq!(body[2].opcode, OpCode::Noop);
        assert!(body[2].capturing);
    }

    #[test]
    fn captured_choice_gets_fresh_tail() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        let alt = Op::choice(&arena, &[Op::lit(&arena, "ab"), Op::lit(&arena, "a")]);
        grammar.define("Start", Op::capture(&arena, alt));
        let program = compile(&arena, &grammar).unwrap();
        let last_body = &program.code[program.code.len() - 3];
        assert_eq!(last_body.opcode, OpCode::Noop);
        assert!(last_body.capturing);
    }

    #[test]
    fn flags_stay_off_stack_opcodes() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "Start");
        let digits = Op::capture(&arena, Op::plus(&arena, Op::class(&arena, "0-9")));
        let inner = Op::bind(&arena, "n", digits);
        let body = Op::seq(
            &arena,
            &[
                inner,
                Op::choice(&arena, &[Op::sym(&arena, "Tail"), Op::lit(&arena, "!")]),
                Op::not(&arena, Op::dot(&arena)),
            ],
        );
        grammar.define("Start", Op::capture(&arena, body));
        grammar.define("Tail", Op::opt(&arena, Op::lit(&arena, "?")));
        let program = compile(&arena, &grammar).unwrap();
        for inst in &program.code {
            if inst.opcode.manipulates_stack() {
                assert!(!inst.marking && !inst.capturing && inst.action.is_none());
            }
        }
    }
}
