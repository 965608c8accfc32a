//! Error taxonomy.
//!
//! Compile-time problems are [`GrammarError`]s; match-time problems are
//! [`MachineError`]s. A failed match is neither: the match API reports
//! it as `Ok(None)`.

use thiserror::Error;

/// Boxed error type carried out of user actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while compiling an operator tree to a program.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("undefined rule: {0}")]
    UndefinedRule(String),

    #[error("invalid class range: {lo:?}-{hi:?}")]
    InvalidClassRange { lo: char, hi: char },

    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("grammar has no definitions")]
    EmptyGrammar,
}

/// Errors raised while running a program.
///
/// `Action` wraps a user action error unchanged; `Internal` indicates a
/// miscompiled program or corrupted machine state and is not
/// recoverable.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    #[error("action failed at {start}..{end}: {source}")]
    Action {
        start: usize,
        end: usize,
        #[source]
        source: BoxError,
    },

    #[error("machine state corrupt: {0}")]
    Internal(&'static str),
}
