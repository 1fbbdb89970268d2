//! The six numbered end-to-end scenarios of SPEC_FULL.md's testable-properties
//! section (spec.md §8), exercised as an integration test over the public
//! grammar-compile / match / execute pipeline rather than any single
//! component in isolation.

use std::rc::Rc;

use cligram::exec::{execute, NullHost};
use cligram::grammar::compile::compile;
use cligram::matcher::{MatchStatusResult, Matcher, TokenRegistry};
use cligram::token::{AnyString, RangedInt};
use cligram::Value;

/// 1. Simple keyword: `root: "hello" ;`.
#[test]
fn scenario_1_simple_keyword() {
    let spec = compile(r#"root: "hello" ;"#).unwrap();
    let tokens = TokenRegistry::new();
    let matcher = Matcher::new(&spec, &tokens);

    let ok = matcher.run(&["hello".to_string()], false, true);
    assert_eq!(ok.status, MatchStatusResult::Success);

    let prefix = matcher.run(&["he".to_string()], true, false);
    assert_eq!(prefix.status, MatchStatusResult::PartialIncomplete);
    let texts: Vec<_> = prefix.next_tokens.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["hello"]);

    let bad = matcher.run(&["x".to_string()], false, true);
    assert_eq!(bad.status, MatchStatusResult::Failure);
    assert_eq!(bad.offending_token.as_deref(), Some("x"));
    assert_eq!(bad.offending_index, Some(0));
}

/// 2. Alternative with value extraction: `root[$v]: "set" INT << $v = $1; >> ;`
/// where `INT = RangedInt(1, 100)`. The binding wraps only the immediately
/// preceding unit (INT itself), so `$1` is INT's own matched text.
#[test]
fn scenario_2_value_extraction() {
    let grammar = r#"root[$v]: "set" INT << $v = $1; >> ;"#;
    let mut registry = TokenRegistry::new();
    registry.register("INT", Rc::new(RangedInt::new(1, 100, 10, None)));
    let spec = compile(grammar).unwrap();
    let matcher = Matcher::new(&spec, &registry);

    let result = matcher.run(&["set".to_string(), "42".to_string()], false, true);
    assert_eq!(result.status, MatchStatusResult::Success);
    let path = result.path.unwrap();
    let root = spec.root_rule().unwrap();
    let out = execute(root, &path, vec![Value::Null], &mut NullHost).unwrap();
    assert_eq!(out, vec![Value::Str("42".to_string())]);

    let out_of_range = matcher.run(&["set".to_string(), "101".to_string()], false, true);
    assert_eq!(out_of_range.status, MatchStatusResult::Failure);

    let incomplete = matcher.run(&["set".to_string()], false, true);
    assert_eq!(incomplete.status, MatchStatusResult::PartialIncomplete);
}

/// 3. Optional + orderless set: `cmd: "go" { ("fast" , "quiet") } ;`.
#[test]
fn scenario_3_optional_orderless_set() {
    let spec = compile(r#"cmd: "go" { ("fast" , "quiet") } ;"#).unwrap();
    let tokens = TokenRegistry::new();
    let matcher = Matcher::new(&spec, &tokens);

    for input in [
        vec!["go".to_string()],
        vec!["go".to_string(), "fast".to_string()],
        vec!["go".to_string(), "quiet".to_string()],
        vec!["go".to_string(), "fast".to_string(), "quiet".to_string()],
        vec!["go".to_string(), "quiet".to_string(), "fast".to_string()],
    ] {
        let result = matcher.run(&input, false, true);
        assert_eq!(result.status, MatchStatusResult::Success, "input {:?}", input);
    }

    let repeated = matcher.run(&["go".to_string(), "fast".to_string(), "fast".to_string()], false, true);
    assert_eq!(repeated.status, MatchStatusResult::Failure);
}

/// 4. Rule reference with args: `inner[$x]: WORD << $x = $1; >> ; outer[$r]:
/// "take" inner[$r] ;`. `outer` is declared first so it becomes the root
/// rule; passing `$r` into `inner[$x]` aliases the same cell, so `inner`'s
/// assignment to `$x` is observed through `$r` once it unwinds.
#[test]
fn scenario_4_rule_reference_with_args() {
    let grammar = r#"
        outer[$r]: "take" inner[$r] ;
        inner[$x]: WORD << $x = $1; >> ;
    "#;
    let mut registry = TokenRegistry::new();
    registry.register("WORD", Rc::new(AnyString::new(None)));
    let spec = compile(grammar).unwrap();
    let matcher = Matcher::new(&spec, &registry);

    let result = matcher.run(&["take".to_string(), "hello".to_string()], false, true);
    assert_eq!(result.status, MatchStatusResult::Success);
    let path = result.path.unwrap();
    let root = spec.root_rule().unwrap();
    let out = execute(root, &path, vec![Value::Null], &mut NullHost).unwrap();
    assert_eq!(out, vec![Value::Str("hello".to_string())]);
}

/// 5. Repetition: `root: (WORD)*(1:3) ;`.
#[test]
fn scenario_5_repetition() {
    let spec = compile(r#"root: WORD * (1:3) ;"#).unwrap();
    let mut registry = TokenRegistry::new();
    registry.register("WORD", Rc::new(AnyString::new(None)));
    let matcher = Matcher::new(&spec, &registry);

    assert_eq!(matcher.run(&["a".to_string()], false, true).status, MatchStatusResult::Success);
    assert_eq!(
        matcher.run(&["a".to_string(), "b".to_string(), "c".to_string()], false, true).status,
        MatchStatusResult::Success
    );

    let overflow =
        matcher.run(&["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()], false, true);
    assert_eq!(overflow.status, MatchStatusResult::Failure);
    assert_eq!(overflow.offending_index, Some(3));

    let empty: Vec<String> = vec![];
    assert_eq!(matcher.run(&empty, true, true).status, MatchStatusResult::PartialIncomplete);
}

/// 6. Completion: alternatives `"apple" | "apricot"`, prefix `"ap"` offers
/// both with no single unambiguous continuation.
#[test]
fn scenario_6_completion() {
    let spec = compile(r#"root: "apple" | "apricot" ;"#).unwrap();
    let tokens = TokenRegistry::new();
    let matcher = Matcher::new(&spec, &tokens);

    let result = matcher.run(&["ap".to_string()], true, false);
    assert_eq!(result.status, MatchStatusResult::PartialIncomplete);
    let mut texts: Vec<_> = result.next_tokens.iter().map(|s| s.text.clone()).collect();
    texts.sort();
    assert_eq!(texts, vec!["apple".to_string(), "apricot".to_string()]);
}
