use super::{longest_common_prefix, Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Matches one of a fixed set of values, with prefix-based completion.
/// Grounded on `nessaid_cli.tokens.AlternativeStringsToken`.
#[derive(Debug, Clone)]
pub struct AlternativeStrings {
    pub values: Vec<String>,
    pub helpstring: Option<String>,
}

impl AlternativeStrings {
    pub fn new(values: Vec<String>, helpstring: Option<String>) -> Self {
        Self { values, helpstring }
    }

    fn matches(&self, input: &str) -> Vec<&String> {
        self.values.iter().filter(|v| v.starts_with(input)).collect()
    }
}

impl ITokenClass for AlternativeStrings {
    fn match_input(&self, input: &str) -> MatchStatus {
        if self.values.iter().any(|v| v == input) {
            MatchStatus::Success
        } else if !self.matches(input).is_empty() {
            MatchStatus::Partial
        } else {
            MatchStatus::Failure
        }
    }

    fn complete(&self, input: &str) -> Completions {
        Completions::Bounded(self.matches(input).into_iter().cloned().collect())
    }

    fn get_value(&self, input: &str) -> Value {
        if self.values.iter().any(|v| v == input) {
            Value::Str(input.to_string())
        } else {
            Value::Null
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring
            .clone()
            .unwrap_or_else(|| format!("One of: {}", self.values.join(", ")))
    }
}

/// Convenience: the matcher's inline-completion hint for this class, built
/// from its own suggestion set rather than threading through the generic
/// helper on every call site.
impl AlternativeStrings {
    pub fn inline_hint(&self, input: &str) -> String {
        let matches: Vec<String> = self.matches(input).into_iter().cloned().collect();
        longest_common_prefix(&matches)
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn completes_on_shared_prefix() {
        let t = AlternativeStrings::new(
            vec!["apple".to_string(), "apricot".to_string()],
            None,
        );
        assert_eq!(t.match_input("ap"), MatchStatus::Partial);
        assert_eq!(t.inline_hint("ap"), "ap");
    }

    #[test]
    fn exact_value_succeeds() {
        let t = AlternativeStrings::new(vec!["apple".to_string()], None);
        assert_eq!(t.match_input("apple"), MatchStatus::Success);
    }
}
