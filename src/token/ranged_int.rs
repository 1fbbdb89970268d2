use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// Accepts integers in `[lo, hi]`. Completion enumerates candidate prefixes
/// by numeric-prefix expansion rather than literal string matching, so that
/// e.g. a prefix `"1"` against range `1..=120` suggests `1, 10..19, 100..109`
/// (not `1, 12, 123`, which a naive string-prefix scheme would produce).
/// Ported from `nessaid_cli.tokens.RangedIntToken`, including its negative-
/// range reflection trick: a negative input is completed by negating it,
/// running the same positive-range algorithm against the mirrored bounds,
/// then negating the results back.
#[derive(Debug, Clone)]
pub struct RangedInt {
    pub lo: i64,
    pub hi: i64,
    pub max_suggestions: usize,
    pub helpstring: Option<String>,
}

impl RangedInt {
    pub fn new(lo: i64, hi: i64, max_suggestions: usize, helpstring: Option<String>) -> Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        Self { lo, hi, max_suggestions, helpstring }
    }

    /// Port of `RangedIntToken._complete`: enumerate integers in
    /// `[min_limit, max_limit]` whose decimal representation starts with the
    /// decimal representation of `number` (`number == 0` means "no prefix
    /// constraint, enumerate the whole range").
    fn complete_in_range(&self, min_limit: i64, max_limit: i64, number: i64) -> (usize, Vec<i64>) {
        if number == 0 {
            let span = (max_limit - min_limit + 1) as usize;
            if span > self.max_suggestions {
                return (span, vec![]);
            }
            return (span, (min_limit..=max_limit).collect());
        }

        if number > max_limit {
            return (0, vec![]);
        }

        let min_len = digit_len(min_limit);
        let max_len = digit_len(max_limit);
        let number_len = digit_len(number);

        let mut count;
        let mut completions: Vec<i64> = vec![];
        let mut min_num = number;
        let mut max_num = number;
        let mut num_len = number_len;
        let mut power: i64 = 10;

        if num_len < min_len {
            while num_len < min_len {
                min_num *= 10;
                max_num = min_num + power - 1;
                num_len += 1;
                power *= 10;
            }
        }

        if num_len == min_len {
            if num_len == max_len && (max_num < min_limit || min_num > max_limit) {
                return (0, vec![]);
            }
            let lower_limit = min_limit.max(min_num);
            let upper_limit = max_limit.min(max_num);
            count = (upper_limit - lower_limit + 1).max(0) as usize;
            if count > self.max_suggestions {
                return (count, vec![]);
            }
            completions = (lower_limit..=upper_limit).collect();
            if num_len == max_len || count > self.max_suggestions {
                return (count, completions);
            }
        } else {
            count = 1;
            completions = vec![number];
        }

        num_len += 1;
        min_num *= 10;
        max_num = min_num + power - 1;

        while num_len < max_len {
            count += power as usize;
            if count > self.max_suggestions {
                return (count, vec![]);
            }
            completions.extend(min_num..=max_num);
            num_len += 1;
            power = 10i64.pow((num_len - number_len) as u32);
            min_num *= 10;
            max_num = min_num + power - 1;
        }

        if min_num <= max_limit && num_len == max_len {
            let upper = max_num.min(max_limit);
            count += (upper - min_num + 1).max(0) as usize;
            if count > self.max_suggestions {
                return (count, vec![]);
            }
            completions.extend(min_num..=upper);
        }

        (count, completions)
    }
}

fn digit_len(n: i64) -> usize {
    n.abs().to_string().len()
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

impl ITokenClass for RangedInt {
    fn match_input(&self, input: &str) -> MatchStatus {
        match self.complete(input) {
            Completions::TooMany(_) => MatchStatus::Partial,
            Completions::Bounded(v) if v.len() > 1 => MatchStatus::Partial,
            Completions::Bounded(v) if v.len() == 1 => {
                if v[0] == input {
                    MatchStatus::Success
                } else {
                    MatchStatus::Partial
                }
            }
            _ => MatchStatus::Failure,
        }
    }

    fn complete(&self, input: &str) -> Completions {
        if input == "-" {
            if self.lo >= 0 {
                return Completions::Bounded(vec![]);
            }
            let (n, comps) = if self.hi >= 0 {
                self.complete_in_range(0, -self.lo, 0)
            } else {
                self.complete_in_range(-self.hi, -self.lo, 0)
            };
            if n > 0 && comps.is_empty() {
                return Completions::TooMany(n);
            }
            return Completions::Bounded(comps.into_iter().map(|c| (-c).to_string()).collect());
        }

        if input.is_empty() {
            let count = (self.hi - self.lo + 1).max(0) as usize;
            if count > 10 || count > self.max_suggestions {
                return if count > self.max_suggestions {
                    Completions::TooMany(count)
                } else {
                    Completions::Bounded(vec![])
                };
            }
            if count == 0 {
                return Completions::Bounded(vec![]);
            }
            return Completions::Bounded((self.lo..=self.hi).map(|v| v.to_string()).collect());
        }

        let negative = input.starts_with('-');
        let digits = if negative { &input[1..] } else { input };
        if !is_numeric(digits) {
            return Completions::Bounded(vec![]);
        }
        let number: i64 = match input.parse() {
            Ok(n) => n,
            Err(_) => return Completions::Bounded(vec![]),
        };

        if negative || number < 0 {
            if number == 0 && self.lo == 0 {
                return Completions::Bounded(vec!["0".to_string()]);
            }
            if self.lo >= 0 {
                return Completions::Bounded(vec![]);
            }
            let (n, comps) = if self.hi >= 0 {
                self.complete_in_range(0, -self.lo, -number)
            } else {
                self.complete_in_range(-self.hi, -self.lo, -number)
            };
            if n > 0 && comps.is_empty() {
                return Completions::TooMany(n);
            }
            Completions::Bounded(comps.into_iter().map(|c| (-c).to_string()).collect())
        } else {
            if self.hi < 0 {
                return Completions::Bounded(vec![]);
            }
            let (n, comps) = if self.lo <= 0 {
                self.complete_in_range(0, self.hi, number)
            } else {
                self.complete_in_range(self.lo, self.hi, number)
            };
            if n > 0 && comps.is_empty() {
                return Completions::TooMany(n);
            }
            Completions::Bounded(comps.into_iter().map(|c| c.to_string()).collect())
        }
    }

    fn get_value(&self, input: &str) -> Value {
        if is_numeric(input) || (input.starts_with('-') && is_numeric(&input[1..])) {
            if let Ok(n) = input.parse::<i64>() {
                if n >= self.lo && n <= self.hi {
                    return Value::Int(n);
                }
            }
        }
        Value::Null
    }

    fn get_helpstring(&self) -> String {
        self.helpstring
            .clone()
            .unwrap_or_else(|| format!("An integer between {} and {}", self.lo, self.hi))
    }

    fn cacheable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn exact_single_value_range() {
        let t = RangedInt::new(0, 0, 10, None);
        assert_eq!(t.get_value("0"), Value::Int(0));
        assert_eq!(t.match_input("0"), MatchStatus::Success);
    }

    #[test]
    fn rejects_out_of_range_value() {
        let t = RangedInt::new(1, 100, 10, None);
        assert_eq!(t.get_value("101"), Value::Null);
        assert_eq!(t.get_value("42"), Value::Int(42));
    }

    #[test]
    fn small_range_enumerates_values() {
        let t = RangedInt::new(1, 5, 10, None);
        match t.complete("") {
            Completions::Bounded(v) => {
                assert_eq!(v, vec!["1", "2", "3", "4", "5"]);
            }
            _ => panic!("expected bounded completions"),
        }
    }

    #[test]
    fn large_range_prefix_completion_is_bounded() {
        let t = RangedInt::new(1, 999, 10, None);
        match t.complete("9") {
            Completions::Bounded(v) => assert!(v.iter().all(|s| s.starts_with('9'))),
            Completions::TooMany(n) => assert!(n > 0),
        }
    }

    #[test]
    fn negative_range_reflects_completion() {
        let t = RangedInt::new(-50, -1, 10, None);
        match t.complete("-5") {
            Completions::Bounded(v) => assert!(v.iter().all(|s| s.starts_with("-5"))),
            Completions::TooMany(n) => assert!(n > 0),
        }
    }
}
