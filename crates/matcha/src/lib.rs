//! matcha: a PEG parsing machine.
//!
//! Grammars are operator trees over the standard PEG operators plus
//! three semantic extensions: substring capture, named binding, and
//! rule actions. A grammar compiles to a linear instruction program,
//! which a backtracking virtual machine executes against an input
//! string.
//!
//! # Example
//!
//! ```ignore
//! use bumpalo::Bump;
//! use matcha::{Grammar, MachineParser, Op};
//!
//! let arena = Bump::new();
//! let mut grammar = Grammar::new(&arena, "Start");
//! grammar.define(
//!     "Start",
//!     Op::seq(&arena, &[
//!         Op::bind(&arena, "n", Op::capture(&arena, Op::plus(&arena, Op::class(&arena, "0-9")))),
//!         Op::lit(&arena, "!"),
//!     ]),
//! );
//!
//! let parser = MachineParser::new(&arena, &grammar)?;
//! let m = parser.match_str("42!")?.expect("should match");
//! assert_eq!(m.end(), 3);
//! ```
//!
//! # Pipeline
//!
//! - [`Op`] - the operator tree (produced by hand or by a notation
//!   parser built on top of this crate)
//! - [`machine::compile`] - operator tree to instruction program
//! - [`Machine`] - the VM; [`MachineParser`] wraps compile-and-match
//! - [`Match`] - end position, emitted values, bindings
//!
//! Deliberately not here: a surface PEG notation, grammar-level
//! optimization, and packrat memoization. All three layer on top of
//! the operator tree and program interfaces without touching the VM.

pub mod actions;
pub mod error;
pub mod grammar;
pub mod machine;
pub mod operators;
pub mod value;

// Re-export from matcha-common
pub use common::{intern, trace};
pub use common::{tracer, StringInterner, Tracer};

pub use actions::{Action, Bind, Call, Constant, First, Join, Last};
pub use error::{BoxError, GrammarError, MachineError};
pub use grammar::Grammar;
pub use machine::{
    compile, CharClass, Instruction, Machine, MachineParser, Match, OpCode, Program,
    RegexScanner, Scanner,
};
pub use operators::{Op, RegexFlags};
pub use value::{determine, Binding, Value};
