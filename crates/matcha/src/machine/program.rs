//! The instruction program: opcodes, instructions, and the compiled
//! program with its rule-name index.

use std::io::Write;

use hashbrown::HashMap;

use crate::actions::Action;

use super::scanner::Scanner;

/// Machine opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Unconditional failure; address 0 holds one as the universal
    /// failure target.
    Fail,
    /// Successful termination sentinel at the end of the program.
    Pass,
    /// Push a backtrack frame and fall through.
    Branch,
    /// Pop the top frame and jump.
    Commit,
    /// Refresh the top backtrack frame with the current state and jump.
    Update,
    /// Restore the cursor from the top frame, pop it, and jump.
    Restore,
    /// Pop a frame, then fail.
    FailTwice,
    /// Push a return frame and jump to a rule body.
    Call,
    /// Pop a return frame and resume there.
    Return,
    /// Relative jump.
    Jump,
    /// Run the attached scanner.
    Scan,
    /// Fall through; a carrier for marks, captures, and actions.
    Noop,
}

impl OpCode {
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Fail => "FAIL",
            OpCode::Pass => "PASS",
            OpCode::Branch => "BRANCH",
            OpCode::Commit => "COMMIT",
            OpCode::Update => "UPDATE",
            OpCode::Restore => "RESTORE",
            OpCode::FailTwice => "FAILTWICE",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::Jump => "JUMP",
            OpCode::Scan => "SCAN",
            OpCode::Noop => "NOOP",
        }
    }

    /// Opcodes that push or pop frames. Marks, captures, and actions
    /// must never ride on these; the compiler inserts a NOOP carrier
    /// instead.
    pub fn manipulates_stack(&self) -> bool {
        matches!(
            self,
            OpCode::Call
                | OpCode::Commit
                | OpCode::Update
                | OpCode::Restore
                | OpCode::FailTwice
                | OpCode::Return
        )
    }
}

/// One instruction.
///
/// `oploc` is a relative offset for the jumping opcodes and, after the
/// resolution pass, an absolute address for CALL. `name` holds a CALL's
/// target rule until resolution.
#[derive(Clone)]
pub struct Instruction<'a> {
    pub opcode: OpCode,
    pub oploc: i32,
    pub scanner: Option<Scanner<'a>>,
    pub marking: bool,
    pub capturing: bool,
    pub action: Option<&'a dyn Action<'a>>,
    pub name: Option<&'a str>,
}

impl<'a> Instruction<'a> {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            oploc: 1,
            scanner: None,
            marking: false,
            capturing: false,
            action: None,
            name: None,
        }
    }
}

/// A compiled program: the instruction sequence plus the map from rule
/// name to the absolute address of its body.
pub struct Program<'a> {
    pub code: Vec<Instruction<'a>>,
    index: HashMap<&'a str, usize>,
}

impl<'a> Program<'a> {
    pub fn new(code: Vec<Instruction<'a>>, index: HashMap<&'a str, usize>) -> Self {
        Self { code, index }
    }

    /// Address of a rule's body.
    pub fn entry(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Rule entry points, unordered.
    pub fn rules(&self) -> impl Iterator<Item = (&'a str, usize)> + '_ {
        self.index.iter().map(|(name, addr)| (*name, *addr))
    }

    /// Write the instruction listing with rule labels and resolved
    /// jump targets.
    pub fn disassemble<W: Write>(&self, out: &mut W) {
        let mut labels: Vec<(usize, &str)> = self.rules().map(|(n, a)| (a, n)).collect();
        labels.sort_unstable();

        for (pc, inst) in self.code.iter().enumerate() {
            if let Ok(at) = labels.binary_search_by_key(&pc, |&(a, _)| a) {
                writeln!(out, "; === {} ===", labels[at].1).ok();
            }

            let desc = match inst.opcode {
                OpCode::Scan => match &inst.scanner {
                    Some(scanner) => format!("SCAN         {}", scanner),
                    None => "SCAN         ???".to_string(),
                },
                OpCode::Call => match inst.name {
                    Some(name) => format!("CALL         @{} ({})", inst.oploc, name),
                    None => format!("CALL         @{}", inst.oploc),
                },
                OpCode::Branch | OpCode::Commit | OpCode::Update | OpCode::Restore
                | OpCode::Jump => {
                    let target = pc as i64 + inst.oploc as i64;
                    format!("{:<12} {:+} -> @{}", inst.opcode.name(), inst.oploc, target)
                }
                other => other.name().to_string(),
            };

            let mut flags = String::new();
            if inst.marking {
                flags.push_str(" [mark]");
            }
            if inst.capturing {
                flags.push_str(" [cap]");
            }
            if inst.action.is_some() {
                flags.push_str(" [act]");
            }

            writeln!(out, "  {:4}: {}{}", pc, desc, flags).ok();
        }
    }

    /// Dump the listing to stderr.
    pub fn dump(&self) {
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        self.disassemble(&mut out);
    }
}
