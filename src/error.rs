//! Error taxonomy (see SPEC_FULL.md §7).
//!
//! Every fallible boundary returns a plain `Result` with one of these types.
//! None of them panic or carry a backtrace dependency; each implements
//! `Display` by hand the way the teacher library hand-rolls `Display` for
//! `ImplementationError`/`ParseError` rather than reaching for a derive macro.

use std::fmt::{Display, Formatter};
use crate::util::Position;

/// Fatal error produced while compiling a grammar or action source. Aborts
/// grammar loading; never produced once a `Grammar` has been built successfully.
#[derive(Debug, Clone)]
pub enum CompileError {
    UnknownRule { name: String },
    DuplicateDefinition { name: String },
    DuplicateToken { name: String },
    BadArgument { message: String },
    BadRepeater { message: String },
    SyntaxError { message: String, position: Option<Position> },
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnknownRule { name } => {
                write!(f, "CompileError: unknown rule or token '{}'", name)
            }
            CompileError::DuplicateDefinition { name } => {
                write!(f, "CompileError: '{}' is already defined", name)
            }
            CompileError::DuplicateToken { name } => {
                write!(f, "CompileError: token class '{}' is already declared", name)
            }
            CompileError::BadArgument { message } => {
                write!(f, "CompileError: bad argument - {}", message)
            }
            CompileError::BadRepeater { message } => {
                write!(f, "CompileError: bad repetition count - {}", message)
            }
            CompileError::SyntaxError { message, position } => match position {
                Some(p) => write!(f, "CompileError: {} at {}", message, p),
                None => write!(f, "CompileError: {}", message),
            },
        }
    }
}

impl std::error::Error for CompileError {}

/// Error produced by the line tokenizer. Reported to the caller; a tokenizer
/// never produces partial tokens except for `IncompleteQuoted`, which is a
/// legitimate dry-run state and not carried as an error.
#[derive(Debug, Clone)]
pub enum TokenizerError {
    IllegalChar { offending_char: char, position: usize },
    BadEscape { offending_char: char, position: usize },
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenizerError::IllegalChar { offending_char, position } => write!(
                f,
                "TokenizerError: illegal character '{}' at byte {}",
                offending_char, position
            ),
            TokenizerError::BadEscape { offending_char, position } => write!(
                f,
                "TokenizerError: bad escape '\\{}' at byte {}",
                offending_char, position
            ),
        }
    }
}

impl std::error::Error for TokenizerError {}

/// Error raised while running the execution engine after a successful,
/// non-dry-run match. Caught at the top of the execution engine; the CLI
/// loop reports it on stderr and re-prompts (§7 propagation policy).
#[derive(Debug, Clone)]
pub enum ExecutionError {
    MissingHostFunction { name: String },
    ArgumentMismatch { message: String },
    HostException { message: String },
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionError::MissingHostFunction { name } => {
                write!(f, "ExecutionError: missing host function '{}'", name)
            }
            ExecutionError::ArgumentMismatch { message } => {
                write!(f, "ExecutionError: argument mismatch - {}", message)
            }
            ExecutionError::HostException { message } => {
                write!(f, "ExecutionError: {}", message)
            }
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Non-fatal configuration issue detected at token-class or host-function
/// registration time, e.g. a class mixing sync and async `match`/`complete`/
/// `get_value` implementations (§5). Surfaced to the application author, not
/// to the interactive user.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
}

impl Display for ConfigWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigWarning: {}", self.message)
    }
}
