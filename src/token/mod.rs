//! Pluggable terminal token classes (SPEC_FULL.md §6).
//!
//! Mirrors `lang_pt`'s tokenization traits in shape — a small trait the
//! matcher drives uniformly — but the contract here is the domain's own:
//! `match`/`complete`/`get_value`/`get_helpstring` against a live input
//! prefix rather than a byte stream, because this matcher must suspend and
//! resume at every keystroke instead of consuming a whole buffer at once.

mod alternative_strings;
mod any_string;
mod boolean;
mod bounded_string;
mod cache;
mod keyword;
mod path;
mod ranged_decimal;
mod ranged_int;

pub use alternative_strings::AlternativeStrings;
pub use any_string::AnyString;
pub use boolean::Boolean;
pub use bounded_string::BoundedString;
pub use cache::MatchCache;
pub use keyword::KeywordToken;
pub use path::{Path, PathKind};
pub use ranged_decimal::RangedDecimal;
pub use ranged_int::RangedInt;

use crate::error::ConfigWarning;
use crate::value::Value;

/// Outcome of classifying one input prefix against a token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// The input is a complete, acceptable value for this class.
    Success,
    /// The input is a valid, unambiguous prefix of some acceptable value but
    /// is not itself acceptable yet.
    Partial,
    /// The input cannot lead to an acceptable value.
    Failure,
}

/// Result of [`ITokenClass::complete`]: either a bounded list of suggestions
/// or a count that exceeded the class's enumeration budget.
#[derive(Debug, Clone, PartialEq)]
pub enum Completions {
    Bounded(Vec<String>),
    TooMany(usize),
}

impl Completions {
    pub fn is_empty(&self) -> bool {
        matches!(self, Completions::Bounded(v) if v.is_empty())
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Completions::Bounded(v) => v,
            Completions::TooMany(_) => &[],
        }
    }
}

/// The contract the matcher requires of every terminal token class.
///
/// All four methods are synchronous here; an `AsyncTokenClass` wrapper
/// (below) adapts the same contract for classes that must suspend (§5).
pub trait ITokenClass: std::fmt::Debug {
    fn match_input(&self, input: &str) -> MatchStatus;
    fn complete(&self, input: &str) -> Completions;
    /// Returns `Value::Null` ("NullTokenValue" in the original) when `input`
    /// is not an acceptable value for this class.
    fn get_value(&self, input: &str) -> Value;
    fn get_helpstring(&self) -> String;

    fn completable(&self) -> bool {
        true
    }
    fn case_insensitive(&self) -> bool {
        false
    }
    fn cacheable(&self) -> bool {
        false
    }
}

/// A future-returning variant of [`ITokenClass`] for token classes whose
/// author declared them asynchronous (§5). A synchronous class can be
/// adapted into this trait trivially by returning an already-ready future;
/// the reverse is not offered; mixing sync and async across the three
/// value-producing methods of one class is a configuration error, not
/// something this trait can prevent at compile time, so validation happens
/// at registration (see [`validate_registration`]).
pub trait AsyncTokenClass: std::fmt::Debug {
    fn match_input<'a>(
        &'a self,
        input: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = MatchStatus> + 'a>>;
    fn complete<'a>(
        &'a self,
        input: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Completions> + 'a>>;
    fn get_value<'a>(
        &'a self,
        input: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Value> + 'a>>;
    fn get_helpstring(&self) -> String;

    fn completable(&self) -> bool {
        true
    }
    fn case_insensitive(&self) -> bool {
        false
    }
    fn cacheable(&self) -> bool {
        false
    }
}

/// Whether a registered token class declared itself synchronous or
/// asynchronous, used purely to detect the mixed case at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sync3 {
    Sync,
    Async,
}

/// Mirrors `NessaidCli.validate_token_classes`: a class's `match`/`complete`/
/// `get_value` triple must be uniformly synchronous or uniformly
/// asynchronous. Returns a warning rather than failing registration outright,
/// matching the original's preference to warn and continue.
pub fn validate_registration(
    name: &str,
    match_kind: Sync3,
    complete_kind: Sync3,
    value_kind: Sync3,
) -> Option<ConfigWarning> {
    if match_kind == complete_kind && complete_kind == value_kind {
        None
    } else {
        Some(ConfigWarning {
            message: format!(
                "token class '{}' mixes sync and async match/complete/get_value implementations",
                name
            ),
        })
    }
}

/// Longest common prefix of a set of suggestions, used to compute the
/// matcher's inline-completion hint (§4.4 point 5).
pub fn longest_common_prefix(values: &[String]) -> String {
    let mut iter = values.iter();
    let first = match iter.next() {
        Some(v) => v,
        None => return String::new(),
    };
    let mut prefix_len = first.chars().count();
    for v in iter {
        let common = first
            .chars()
            .zip(v.chars())
            .take_while(|(a, b)| a == b)
            .count();
        prefix_len = prefix_len.min(common);
    }
    first.chars().take(prefix_len).collect()
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn lcp_of_single_value_is_itself() {
        assert_eq!(longest_common_prefix(&["apple".to_string()]), "apple");
    }

    #[test]
    fn lcp_stops_at_first_divergence() {
        let values = vec!["apple".to_string(), "apricot".to_string()];
        assert_eq!(longest_common_prefix(&values), "ap");
    }

    #[test]
    fn lcp_of_empty_set_is_empty() {
        assert_eq!(longest_common_prefix(&[]), "");
    }
}
