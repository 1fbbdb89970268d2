//! Generalizes `lang_pt::Cache` (a `HashMap` keyed by production identity and
//! stream position, bounded and never shrunk until flushed) into a cache for
//! token-class results keyed by object identity and raw input instead (§4.4
//! point 6).

use std::collections::HashMap;

use crate::value::Value;

/// `(token_class_id, input)` -> resolved value, and `(token_name, helpstring)`
/// -> a reusable description string. Caching only ever applies to classes
/// that declare themselves cacheable; the matcher is responsible for not
/// consulting this cache for classes that don't.
#[derive(Debug, Default)]
pub struct MatchCache {
    values: HashMap<(usize, String), Value>,
    helpstrings: HashMap<(String, String), String>,
    threshold: usize,
}

impl MatchCache {
    pub fn new(threshold: usize) -> Self {
        Self {
            values: HashMap::new(),
            helpstrings: HashMap::new(),
            threshold,
        }
    }

    pub fn get_value(&self, token_class_id: usize, input: &str) -> Option<&Value> {
        self.values.get(&(token_class_id, input.to_string()))
    }

    pub fn insert_value(&mut self, token_class_id: usize, input: String, value: Value) {
        if self.values.len() >= self.threshold {
            self.values.clear();
        }
        self.values.insert((token_class_id, input), value);
    }

    pub fn get_helpstring(&self, token_name: &str, fallback: &str) -> Option<&String> {
        self.helpstrings
            .get(&(token_name.to_string(), fallback.to_string()))
    }

    pub fn insert_helpstring(&mut self, token_name: String, fallback: String, rendered: String) {
        if self.helpstrings.len() >= self.threshold {
            self.helpstrings.clear();
        }
        self.helpstrings.insert((token_name, fallback), rendered);
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.helpstrings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn stores_and_retrieves_a_value() {
        let mut cache = MatchCache::new(64);
        cache.insert_value(1, "42".to_string(), Value::Int(42));
        assert_eq!(cache.get_value(1, "42"), Some(&Value::Int(42)));
        assert_eq!(cache.get_value(1, "7"), None);
    }

    #[test]
    fn flushes_once_threshold_reached() {
        let mut cache = MatchCache::new(2);
        cache.insert_value(1, "a".to_string(), Value::Int(1));
        cache.insert_value(1, "b".to_string(), Value::Int(2));
        cache.insert_value(1, "c".to_string(), Value::Int(3));
        assert_eq!(cache.get_value(1, "a"), None);
        assert_eq!(cache.get_value(1, "c"), Some(&Value::Int(3)));
    }
}
