use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Accepts any string whose length lies within `[min, max]` inclusive.
/// Grounded on `nessaid_cli.tokens.RangedStringToken`.
#[derive(Debug, Clone)]
pub struct BoundedString {
    pub min: usize,
    pub max: usize,
    pub helpstring: Option<String>,
}

impl BoundedString {
    pub fn new(min: usize, max: usize, helpstring: Option<String>) -> Self {
        Self { min, max, helpstring }
    }
}

impl ITokenClass for BoundedString {
    fn match_input(&self, input: &str) -> MatchStatus {
        let len = input.chars().count();
        if len >= self.min && len <= self.max {
            MatchStatus::Success
        } else if len < self.min {
            MatchStatus::Partial
        } else {
            MatchStatus::Failure
        }
    }

    fn complete(&self, _input: &str) -> Completions {
        Completions::Bounded(vec![])
    }

    fn get_value(&self, input: &str) -> Value {
        let len = input.chars().count();
        if len >= self.min && len <= self.max {
            Value::Str(input.to_string())
        } else {
            Value::Null
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring.clone().unwrap_or_else(|| {
            format!("A string between {} and {} characters", self.min, self.max)
        })
    }

    fn completable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn enforces_length_bounds() {
        let t = BoundedString::new(2, 4, None);
        assert_eq!(t.match_input("a"), MatchStatus::Partial);
        assert_eq!(t.match_input("ab"), MatchStatus::Success);
        assert_eq!(t.match_input("abcde"), MatchStatus::Failure);
    }
}
