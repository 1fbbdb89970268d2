use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Accepts `"true"`/`"false"` case-insensitively.
/// Grounded on `nessaid_cli.tokens.BooleanToken`.
#[derive(Debug, Clone, Default)]
pub struct Boolean {
    pub helpstring: Option<String>,
}

impl Boolean {
    pub fn new(helpstring: Option<String>) -> Self {
        Self { helpstring }
    }

    fn candidates() -> [&'static str; 2] {
        ["true", "false"]
    }
}

impl ITokenClass for Boolean {
    fn match_input(&self, input: &str) -> MatchStatus {
        let lower = input.to_ascii_lowercase();
        if Self::candidates().iter().any(|c| *c == lower) {
            MatchStatus::Success
        } else if Self::candidates().iter().any(|c| c.starts_with(&lower)) && !lower.is_empty() {
            MatchStatus::Partial
        } else {
            MatchStatus::Failure
        }
    }

    fn complete(&self, input: &str) -> Completions {
        let lower = input.to_ascii_lowercase();
        Completions::Bounded(
            Self::candidates()
                .iter()
                .filter(|c| c.starts_with(&lower))
                .map(|c| c.to_string())
                .collect(),
        )
    }

    fn get_value(&self, input: &str) -> Value {
        match input.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Null,
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring
            .clone()
            .unwrap_or_else(|| "true or false".to_string())
    }

    fn case_insensitive(&self) -> bool {
        true
    }

    fn cacheable(&self) -> bool {
        true
    }
}
