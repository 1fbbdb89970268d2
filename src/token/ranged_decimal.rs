use once_cell::sync::Lazy;
use regex::Regex;

use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Matches a string that could still become a valid decimal literal as more
/// characters are typed (a leading sign, digits, at most one `.`, an
/// optional exponent) without itself being a complete number yet. Mirrors
/// `lang_pt::lexeme::Pattern`'s own regex-driven matching rather than a
/// hand-rolled scanner, since this is exactly the "does this prefix still
/// have a chance" question a lexical regex answers directly.
static PARTIAL_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d*\.?\d*([eE][-+]?\d*)?$").unwrap());

/// Accepts reals in `[lo, hi]`; never completable, matching
/// `nessaid_cli.tokens.RangedDecimalToken`.
#[derive(Debug, Clone)]
pub struct RangedDecimal {
    pub lo: f64,
    pub hi: f64,
    pub helpstring: Option<String>,
}

impl RangedDecimal {
    pub fn new(lo: f64, hi: f64, helpstring: Option<String>) -> Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        Self { lo, hi, helpstring }
    }
}

impl ITokenClass for RangedDecimal {
    fn match_input(&self, input: &str) -> MatchStatus {
        if input.is_empty() {
            return MatchStatus::Partial;
        }
        match input.parse::<f64>() {
            Ok(n) if n >= self.lo && n <= self.hi => MatchStatus::Success,
            Ok(_) => MatchStatus::Failure,
            Err(_) => {
                if PARTIAL_DECIMAL.is_match(input) {
                    MatchStatus::Partial
                } else {
                    MatchStatus::Failure
                }
            }
        }
    }

    fn complete(&self, _input: &str) -> Completions {
        Completions::Bounded(vec![])
    }

    fn get_value(&self, input: &str) -> Value {
        match input.parse::<f64>() {
            Ok(n) if n >= self.lo && n <= self.hi => Value::Float(n),
            _ => Value::Null,
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring
            .clone()
            .unwrap_or_else(|| format!("A decimal number between {} and {}", self.lo, self.hi))
    }

    fn completable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn in_range_value_matches() {
        let t = RangedDecimal::new(0.0, 10.0, None);
        assert_eq!(t.match_input("3.5"), MatchStatus::Success);
        assert_eq!(t.get_value("3.5"), Value::Float(3.5));
    }

    #[test]
    fn out_of_range_value_fails() {
        let t = RangedDecimal::new(0.0, 10.0, None);
        assert_eq!(t.match_input("20"), MatchStatus::Failure);
    }

    #[test]
    fn incomplete_prefixes_are_partial_not_failure() {
        let t = RangedDecimal::new(-100.0, 100.0, None);
        for prefix in ["-", "1.", ".", "1e", "1e-"] {
            assert_eq!(t.match_input(prefix), MatchStatus::Partial, "prefix {:?}", prefix);
        }
    }

    #[test]
    fn garbage_is_failure() {
        let t = RangedDecimal::new(0.0, 10.0, None);
        assert_eq!(t.match_input("abc"), MatchStatus::Failure);
    }
}
