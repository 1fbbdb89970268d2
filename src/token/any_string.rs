use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Accepts any non-empty string; never completable, since any input is
/// already a valid answer.
#[derive(Debug, Clone, Default)]
pub struct AnyString {
    pub helpstring: Option<String>,
}

impl AnyString {
    pub fn new(helpstring: Option<String>) -> Self {
        Self { helpstring }
    }
}

impl ITokenClass for AnyString {
    fn match_input(&self, input: &str) -> MatchStatus {
        if input.is_empty() {
            MatchStatus::Partial
        } else {
            MatchStatus::Success
        }
    }

    fn complete(&self, _input: &str) -> Completions {
        Completions::Bounded(vec![])
    }

    fn get_value(&self, input: &str) -> Value {
        if input.is_empty() {
            Value::Null
        } else {
            Value::Str(input.to_string())
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring
            .clone()
            .unwrap_or_else(|| "Any string".to_string())
    }

    fn completable(&self) -> bool {
        false
    }
}
