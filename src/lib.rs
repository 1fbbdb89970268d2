//! `cligram` — a grammar-driven interactive command-line interpreter framework.
//!
//! Application authors describe a command language as production rules over
//! terminal tokens (literal keywords and custom token classes). This crate
//! compiles those rules into a tree, then drives an online matcher that at
//! every keystroke decides which tokens may come next, completes the current
//! word, and on a full match runs the grammar's embedded semantic actions.
//!
//! The hard core: [`grammar`] (element tree + compiler), [`matcher`] (the
//! online matching engine), [`exec`] (the semantic-action interpreter),
//! [`tokenizer`] (line splitting) and [`token`] (pluggable terminal classes).
//! [`cli`] is thin glue for an external line editor; it does not draw a
//! prompt or manage a terminal.

pub mod diagnostics;
pub mod error;
pub mod util;
pub mod value;

pub mod token;
pub mod tokenizer;

pub mod grammar;
pub mod walk;

pub mod matcher;

pub mod exec;

pub mod cli;

pub use error::{CompileError, ConfigWarning, ExecutionError, TokenizerError};
pub use value::Value;
