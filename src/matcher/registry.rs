//! Host-populated table mapping a grammar's `token NAME ...;` names to live
//! [`ITokenClass`] implementations (SPEC_FULL.md §6). Grammar compilation
//! never needs this table — only the matcher, at match time, which is why
//! it is constructed separately from [`crate::grammar::compile::compile`].

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ConfigWarning;
use crate::token::ITokenClass;

#[derive(Default)]
pub struct TokenRegistry {
    classes: HashMap<String, Rc<dyn ITokenClass>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, class: Rc<dyn ITokenClass>) {
        self.classes.insert(name.into(), class);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn ITokenClass>> {
        self.classes.get(name).cloned()
    }

    /// Checks every name a compiled grammar declared against this registry,
    /// the way `NessaidCli.validate_token_classes` checks a grammar's
    /// declared token names against the classes actually registered on the
    /// interpreter before a session starts.
    pub fn validate_against(&self, declared: &[String]) -> Vec<ConfigWarning> {
        declared
            .iter()
            .filter(|name| !self.classes.contains_key(*name))
            .map(|name| ConfigWarning {
                message: format!("token '{}' is declared but no token class is registered for it", name),
            })
            .collect()
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::token::AnyString;

    #[test]
    fn registers_and_retrieves_by_name() {
        let mut r = TokenRegistry::new();
        r.register("WORD", Rc::new(AnyString::new(None)));
        assert!(r.get("WORD").is_some());
        assert!(r.get("MISSING").is_none());
    }

    #[test]
    fn flags_undeclared_classes() {
        let r = TokenRegistry::new();
        let warnings = r.validate_against(&["WORD".to_string()]);
        assert_eq!(warnings.len(), 1);
    }
}
