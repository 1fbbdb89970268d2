use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Matches exactly one fixed string. The simplest token class; also what a
/// bare grammar literal (`"go"`) compiles down to internally.
#[derive(Debug, Clone)]
pub struct KeywordToken {
    pub keyword: String,
    pub helpstring: Option<String>,
}

impl KeywordToken {
    pub fn new(keyword: impl Into<String>, helpstring: Option<String>) -> Self {
        Self {
            keyword: keyword.into(),
            helpstring,
        }
    }
}

impl ITokenClass for KeywordToken {
    fn match_input(&self, input: &str) -> MatchStatus {
        if input == self.keyword {
            MatchStatus::Success
        } else if !input.is_empty() && self.keyword.starts_with(input) {
            MatchStatus::Partial
        } else {
            MatchStatus::Failure
        }
    }

    fn complete(&self, input: &str) -> Completions {
        if self.keyword.starts_with(input) {
            Completions::Bounded(vec![self.keyword.clone()])
        } else {
            Completions::Bounded(vec![])
        }
    }

    fn get_value(&self, input: &str) -> Value {
        if input == self.keyword {
            Value::Str(input.to_string())
        } else {
            Value::Null
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring
            .clone()
            .unwrap_or_else(|| self.keyword.clone())
    }

    fn cacheable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn matches_exact_keyword() {
        let t = KeywordToken::new("hello", None);
        assert_eq!(t.match_input("hello"), MatchStatus::Success);
        assert_eq!(t.match_input("he"), MatchStatus::Partial);
        assert_eq!(t.match_input("x"), MatchStatus::Failure);
    }
}
