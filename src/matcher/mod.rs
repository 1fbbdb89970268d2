//! The online matcher (SPEC_FULL.md §4.4).
//!
//! Generalizes `lang_pt`'s `impl_first_set`/`is_nullable`/`advance_fltr_ptr`
//! machinery — computed once per production and reused — into an *online*
//! frontier-advancing algorithm: instead of one recursive call that consumes
//! an entire remaining stream, [`Matcher::step`] advances every live
//! candidate sequence by exactly one token and returns control, because an
//! interactive prompt must pause at every keystroke.

mod registry;

pub use registry::TokenRegistry;

use std::collections::HashMap;
use std::rc::Rc;

use crate::grammar::compile::resolve_through;
use crate::grammar::element::{
    Alternative, IElement, NamedRule, OptionalElem, OrderlessSet, RuleRef, Sequence, TokenRefElem,
    Literal,
};
use crate::grammar::GrammarSpecification;
use crate::token::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;
use crate::walk::{path_key, LookupToken, PathKey, PathSegment};

/// Tunable knobs for matcher construction, the way `lang_pt::Tokenizer`/
/// `CombinedTokenizer` take constructor arguments instead of reading global
/// state.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub cache_threshold: usize,
    pub default_max_suggestions: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { cache_threshold: 512, default_max_suggestions: 10 }
    }
}

/// Map from an `OrderlessSet` activation (identified by the path leading to
/// it) to the set of child indices already consumed in that activation —
/// the Rust encoding of the spec's `lookup_path`.
pub type Consumed = HashMap<PathKey, Vec<usize>>;

/// One reachable terminal position together with the ancestry path needed
/// to advance past it once it is matched.
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub terminal: Rc<dyn IElement>,
    pub path: Vec<PathSegment>,
}

fn push(path: &[PathSegment], element: Rc<dyn IElement>, child_index: usize, repeat_index: usize) -> Vec<PathSegment> {
    let mut out = path.to_vec();
    out.push(PathSegment { element, child_index, repeat_index });
    out
}

fn is_terminal(element: &Rc<dyn IElement>) -> bool {
    let any = element.as_any();
    any.downcast_ref::<Literal>().is_some() || any.downcast_ref::<TokenRefElem>().is_some()
}

/// Computes the first-set of `element` as encountered fresh at `path_prefix`.
fn expand_first(element: &Rc<dyn IElement>, path_prefix: &[PathSegment], consumed: &Consumed) -> Vec<FrontierEntry> {
    let element = resolve_through(element);
    if is_terminal(&element) {
        return vec![FrontierEntry { terminal: element, path: path_prefix.to_vec() }];
    }
    let any = element.as_any();

    if let Some(seq) = any.downcast_ref::<Sequence>() {
        if seq.repeat_count > 1 {
            let child = resolve_through(&seq.children[0]);
            return expand_first(&child, &push(path_prefix, element.clone(), 0, 0), consumed);
        }
        return first_in_siblings(&seq.children, 0, &element, path_prefix, consumed);
    }
    if let Some(alt) = any.downcast_ref::<Alternative>() {
        let mut out = Vec::new();
        for (i, child) in alt.children.iter().enumerate() {
            let child = resolve_through(child);
            out.extend(expand_first(&child, &push(path_prefix, element.clone(), i, 0), consumed));
        }
        return out;
    }
    if let Some(opt) = any.downcast_ref::<OptionalElem>() {
        let body = resolve_through(&opt.body);
        return expand_first(&body, &push(path_prefix, element.clone(), 0, 0), consumed);
    }
    if let Some(set) = any.downcast_ref::<OrderlessSet>() {
        let key = orderless_key(path_prefix, &element);
        let used = consumed.get(&key).cloned().unwrap_or_default();
        let mut out = Vec::new();
        for (i, child) in set.children.iter().enumerate() {
            if used.contains(&i) {
                continue;
            }
            let c = resolve_through(&child.element);
            out.extend(expand_first(&c, &push(path_prefix, element.clone(), i, 0), consumed));
        }
        return out;
    }
    if let Some(rule) = any.downcast_ref::<NamedRule>() {
        let body = resolve_through(rule.body());
        return expand_first(&body, &push(path_prefix, element.clone(), 0, 0), consumed);
    }
    if let Some(rref) = any.downcast_ref::<RuleRef>() {
        let with_ref = push(path_prefix, element.clone(), 0, 0);
        let target_elem: Rc<dyn IElement> = rref.target.clone();
        let body = resolve_through(rref.target.body());
        let with_rule = push(&with_ref, target_elem, 0, 0);
        return expand_first(&body, &with_rule, consumed);
    }
    Vec::new()
}

fn first_in_siblings(
    children: &[Rc<dyn IElement>],
    from_index: usize,
    parent: &Rc<dyn IElement>,
    path_prefix: &[PathSegment],
    consumed: &Consumed,
) -> Vec<FrontierEntry> {
    let mut out = Vec::new();
    for idx in from_index..children.len() {
        let child = resolve_through(&children[idx]);
        out.extend(expand_first(&child, &push(path_prefix, parent.clone(), idx, 0), consumed));
        if !child.is_nullable() {
            break;
        }
    }
    out
}

fn orderless_key(path_prefix: &[PathSegment], orderless: &Rc<dyn IElement>) -> PathKey {
    let mut key = path_key(path_prefix);
    key.push((orderless.element_id(), usize::MAX, usize::MAX));
    key
}

/// Computes what may legally follow the terminal whose ancestry is `path`,
/// returning the frontier plus whether end-of-input is acceptable here, plus
/// an updated `consumed` map (only changed when `path`'s immediate parent is
/// an `OrderlessSet`).
fn next_set(path: &[PathSegment], consumed: &Consumed) -> (Vec<FrontierEntry>, bool, Consumed) {
    if path.is_empty() {
        return (Vec::new(), true, consumed.clone());
    }
    let last = path.last().unwrap().clone();
    let outer = &path[..path.len() - 1];
    let parent = &last.element;
    let any = parent.as_any();

    if let Some(seq) = any.downcast_ref::<Sequence>() {
        if seq.repeat_count > 1 {
            if last.repeat_index + 1 < seq.repeat_count {
                let child = resolve_through(&seq.children[0]);
                let entries = expand_first(&child, &push(outer, parent.clone(), 0, last.repeat_index + 1), consumed);
                return (entries, false, consumed.clone());
            }
            return next_set(outer, consumed);
        }

        let next_idx = last.child_index + 1;
        if next_idx < seq.children.len() {
            let entries = first_in_siblings(&seq.children, next_idx, parent, outer, consumed);
            let tail_all_nullable =
                seq.children[next_idx..].iter().all(|c| resolve_through(c).is_nullable());
            if tail_all_nullable {
                let (mut outer_entries, outer_can_end, outer_consumed) = next_set(outer, consumed);
                let mut entries = entries;
                entries.append(&mut outer_entries);
                return (entries, outer_can_end, outer_consumed);
            }
            return (entries, false, consumed.clone());
        }
        return next_set(outer, consumed);
    }

    if any.downcast_ref::<Alternative>().is_some() {
        return next_set(outer, consumed);
    }

    if any.downcast_ref::<OptionalElem>().is_some() {
        return next_set(outer, consumed);
    }

    if let Some(set) = any.downcast_ref::<OrderlessSet>() {
        let key = orderless_key(outer, parent);
        let mut used = consumed.get(&key).cloned().unwrap_or_default();
        if !used.contains(&last.child_index) {
            used.push(last.child_index);
        }
        let mut new_consumed = consumed.clone();
        new_consumed.insert(key, used.clone());

        let mandatory_remaining = set
            .children
            .iter()
            .enumerate()
            .any(|(i, c)| c.mandatory && !used.contains(&i));

        let mut entries = Vec::new();
        for (i, child) in set.children.iter().enumerate() {
            if used.contains(&i) {
                continue;
            }
            let c = resolve_through(&child.element);
            entries.extend(expand_first(&c, &push(outer, parent.clone(), i, 0), &new_consumed));
        }

        if !mandatory_remaining {
            let (mut outer_entries, outer_can_end, outer_consumed) = next_set(outer, &new_consumed);
            entries.append(&mut outer_entries);
            return (entries, outer_can_end, outer_consumed);
        }
        return (entries, false, new_consumed);
    }

    if any.downcast_ref::<NamedRule>().is_some() || any.downcast_ref::<RuleRef>().is_some() {
        return next_set(outer, consumed);
    }

    (Vec::new(), true, consumed.clone())
}

/// Result status of a match attempt (§7).
#[derive(Debug, Clone, PartialEq)]
pub enum MatchStatusResult {
    Success,
    PartialIncomplete,
    Failure,
    Ambiguous,
}

/// One suggested continuation, as surfaced to a line editor.
#[derive(Debug, Clone)]
pub struct NextTokenSuggestion {
    pub text: String,
    pub helpstring: String,
}

/// Everything the matcher reports back for one `match` call (§4.4).
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub status: MatchStatusResult,
    pub matched_input: Vec<String>,
    pub offending_token: Option<String>,
    pub offending_index: Option<usize>,
    pub next_tokens: Vec<NextTokenSuggestion>,
    pub unique_completion: Option<String>,
    pub case_insensitive: bool,
    pub end_of_input_possible: bool,
    /// The winning candidate's recorded path, set only on `Success`; handed
    /// to [`crate::exec`] to run the attached semantic actions.
    pub path: Option<Vec<LookupToken>>,
}

#[derive(Clone)]
struct Candidate {
    path_so_far: Vec<LookupToken>,
    frontier_source: Option<Vec<PathSegment>>,
    consumed: Consumed,
}

impl Candidate {
    fn frontier(&self, root: &Rc<dyn IElement>) -> (Vec<FrontierEntry>, bool, Consumed) {
        match &self.frontier_source {
            None => {
                let entries = expand_first(root, &[], &self.consumed);
                (entries, root.is_nullable(), self.consumed.clone())
            }
            Some(path) => next_set(path, &self.consumed),
        }
    }
}

/// Drives the online matcher over a grammar and a registry of live token
/// classes.
pub struct Matcher<'g> {
    pub spec: &'g GrammarSpecification,
    pub tokens: &'g TokenRegistry,
    pub config: MatcherConfig,
    /// §4.4 point 6's "interface-level cache", owned by the matcher itself
    /// (not per-call) so repeated `get_value` calls across the many
    /// candidates a dry-run completion evaluates amortize across an entire
    /// interactive session, not just one keystroke. A `RefCell` because the
    /// matching algorithm otherwise only ever needs `&self`.
    cache: std::cell::RefCell<crate::token::MatchCache>,
}

impl<'g> Matcher<'g> {
    pub fn new(spec: &'g GrammarSpecification, tokens: &'g TokenRegistry) -> Self {
        let config = MatcherConfig::default();
        let cache = std::cell::RefCell::new(crate::token::MatchCache::new(config.cache_threshold));
        Self { spec, tokens, config, cache }
    }

    fn class_for(&self, terminal: &Rc<dyn IElement>) -> Option<Rc<dyn ITokenClass>> {
        let any = terminal.as_any();
        if let Some(lit) = any.downcast_ref::<Literal>() {
            let class: Rc<dyn ITokenClass> =
                Rc::new(crate::token::KeywordToken::new(lit.keyword.clone(), lit.helpstring.clone()));
            return Some(class);
        }
        if let Some(tok) = any.downcast_ref::<TokenRefElem>() {
            return self.tokens.get(&tok.token_name);
        }
        None
    }

    /// Resolves `class.get_value(input)` for the terminal at `terminal`,
    /// going through the bounded `(token_object, token_input)` cache of
    /// §4.4 point 6 when the class declares itself cacheable. `terminal`'s
    /// own `element_id` stands in for "token object identity": unlike the
    /// fresh `KeywordToken` `class_for` builds per literal lookup, the
    /// grammar's `Rc<dyn IElement>` nodes are the one thing that stays
    /// stable across every call into this matcher.
    fn cached_value(&self, terminal: &Rc<dyn IElement>, class: &Rc<dyn ITokenClass>, input: &str) -> Value {
        if !class.cacheable() {
            return class.get_value(input);
        }
        let key = terminal.element_id();
        if let Some(cached) = self.cache.borrow().get_value(key, input) {
            return cached.clone();
        }
        let value = class.get_value(input);
        self.cache.borrow_mut().insert_value(key, input.to_string(), value.clone());
        value
    }

    fn helpstring_for(&self, terminal: &Rc<dyn IElement>, class: &Rc<dyn ITokenClass>) -> String {
        terminal.helpstring().map(|s| s.to_string()).unwrap_or_else(|| class.get_helpstring())
    }

    /// Runs the match algorithm of §4.4 over a full token list.
    pub fn run(&self, input: &[String], dry_run: bool, last_token_complete: bool) -> ParseResult {
        let root: Rc<dyn IElement> = match self.spec.root_rule() {
            Some(r) => r.clone(),
            None => {
                return ParseResult {
                    status: MatchStatusResult::Failure,
                    matched_input: vec![],
                    offending_token: None,
                    offending_index: None,
                    next_tokens: vec![],
                    unique_completion: None,
                    case_insensitive: false,
                    end_of_input_possible: false,
                    path: None,
                }
            }
        };

        let mut candidates = vec![Candidate { path_so_far: vec![], frontier_source: None, consumed: Consumed::new() }];

        for (index, token) in input.iter().enumerate() {
            let is_last = index + 1 == input.len();
            let treat_as_prefix = is_last && !last_token_complete;

            let mut next_candidates = Vec::new();
            let mut any_partial_ambiguous = false;

            for candidate in &candidates {
                let (frontier, _can_end, _consumed) = candidate.frontier(&root);
                for entry in &frontier {
                    let class = match self.class_for(&entry.terminal) {
                        Some(c) => c,
                        None => continue,
                    };
                    let status = class.match_input(token);
                    let accept = match status {
                        MatchStatus::Success => !self.cached_value(&entry.terminal, &class, token).is_null(),
                        MatchStatus::Partial if class.completable() => {
                            if treat_as_prefix {
                                true
                            } else {
                                let comps = class.complete(token);
                                let suggestions = comps.suggestions();
                                if suggestions.len() == 1 {
                                    true
                                } else if !self.cached_value(&entry.terminal, &class, token).is_null() {
                                    true
                                } else {
                                    any_partial_ambiguous = true;
                                    false
                                }
                            }
                        }
                        MatchStatus::Partial => !self.cached_value(&entry.terminal, &class, token).is_null(),
                        MatchStatus::Failure => false,
                    };
                    if accept {
                        let mut path = candidate.path_so_far.clone();
                        path.push(LookupToken { path: entry.path.clone(), terminal: entry.terminal.clone(), input: token.clone() });
                        next_candidates.push(Candidate {
                            path_so_far: path,
                            frontier_source: Some(entry.path.clone()),
                            consumed: candidate.consumed.clone(),
                        });
                    }
                }
            }

            if next_candidates.is_empty() {
                let status = if any_partial_ambiguous {
                    MatchStatusResult::Failure
                } else {
                    MatchStatusResult::Failure
                };
                return ParseResult {
                    status,
                    matched_input: input[..index].to_vec(),
                    offending_token: Some(token.clone()),
                    offending_index: Some(index),
                    next_tokens: vec![],
                    unique_completion: None,
                    case_insensitive: false,
                    end_of_input_possible: false,
                    path: None,
                };
            }

            candidates = dedup_orderless(next_candidates);
        }

        self.finish(&root, candidates, input, dry_run)
    }

    fn finish(&self, root: &Rc<dyn IElement>, candidates: Vec<Candidate>, input: &[String], _dry_run: bool) -> ParseResult {
        let mut completions: Vec<Candidate> = Vec::new();
        let mut frontier_union: Vec<FrontierEntry> = Vec::new();
        let mut case_insensitive = false;

        for c in &candidates {
            let (frontier, can_end, _) = c.frontier(root);
            if can_end {
                completions.push(c.clone());
            }
            for entry in frontier {
                frontier_union.push(entry);
            }
        }

        if !completions.is_empty() {
            let winner = self.resolve_ambiguity(completions);
            return match winner {
                Ok(winner) => ParseResult {
                    status: MatchStatusResult::Success,
                    matched_input: input.to_vec(),
                    offending_token: None,
                    offending_index: None,
                    next_tokens: vec![],
                    unique_completion: None,
                    case_insensitive,
                    end_of_input_possible: true,
                    path: Some(winner.path_so_far),
                },
                Err(_) => ParseResult {
                    status: MatchStatusResult::Ambiguous,
                    matched_input: input.to_vec(),
                    offending_token: None,
                    offending_index: None,
                    next_tokens: vec![],
                    unique_completion: None,
                    case_insensitive,
                    end_of_input_possible: true,
                    path: None,
                },
            };
        }

        // No candidate can terminate here: surface completions (dry-run) or
        // report an incomplete sequence.
        let mut suggestions: Vec<NextTokenSuggestion> = Vec::new();
        let mut texts: Vec<String> = Vec::new();
        for entry in &frontier_union {
            if let Some(class) = self.class_for(&entry.terminal) {
                case_insensitive |= class.case_insensitive();
                let helpstring = self.helpstring_for(&entry.terminal, &class);
                match class.complete("") {
                    Completions::Bounded(values) => {
                        for v in values {
                            texts.push(v.clone());
                            suggestions.push(NextTokenSuggestion { text: v, helpstring: helpstring.clone() });
                        }
                    }
                    Completions::TooMany(_) => {
                        suggestions.push(NextTokenSuggestion { text: String::new(), helpstring });
                    }
                }
            }
        }
        let unique_completion = crate::token::longest_common_prefix(&texts);

        ParseResult {
            status: MatchStatusResult::PartialIncomplete,
            matched_input: input.to_vec(),
            offending_token: None,
            offending_index: None,
            next_tokens: suggestions,
            unique_completion: if unique_completion.is_empty() { None } else { Some(unique_completion) },
            case_insensitive,
            end_of_input_possible: false,
            path: None,
        }
    }

    /// Ambiguity resolution (§4.4 point 3). The tie-break order below is
    /// load-bearing: it is the one place a reader can rely on to disambiguate
    /// two structurally different rules that both fully match the same
    /// input. Do not reorder these checks.
    fn resolve_ambiguity(&self, mut completions: Vec<Candidate>) -> Result<Candidate, ()> {
        if completions.len() == 1 {
            return Ok(completions.remove(0));
        }

        // 1. identical element sequence at every position -> pick the first.
        let first_shape: Vec<usize> =
            completions[0].path_so_far.iter().map(|t| t.terminal.element_id()).collect();
        if completions.iter().all(|c| {
            let shape: Vec<usize> = c.path_so_far.iter().map(|t| t.terminal.element_id()).collect();
            shape == first_shape
        }) {
            return Ok(completions.remove(0));
        }

        // 2. position by position, prefer MATCH_SUCCESS over MATCH_PARTIAL,
        //    then prefer non-completable (value-returning) classes over
        //    completable ones — walking left to right and stopping at the
        //    first position where two candidates differ. `Vec<(i32, i32)>`'s
        //    own derived `Ord` already does exactly this (compares element 0
        //    first, recursing to element 1 only once element 0 ties), so the
        //    per-candidate score is a vector, not a sum, and the winner is
        //    whichever vector is strictly greatest. If exactly one candidate
        //    survives, it wins.
        let scores: Vec<Vec<(i32, i32)>> = completions.iter().map(|c| self.candidate_score(c)).collect();
        if let Some(best) = scores.iter().max().cloned() {
            let survivors: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] == best).collect();
            if survivors.len() == 1 {
                return Ok(completions.remove(survivors[0]));
            }
        }

        Err(())
    }

    /// One `(match rank, completable rank)` pair per position of the
    /// candidate's path, compared lexicographically by the caller rather
    /// than summed — a win at an earlier position must not be erasable by a
    /// loss at a later one.
    fn candidate_score(&self, candidate: &Candidate) -> Vec<(i32, i32)> {
        candidate
            .path_so_far
            .iter()
            .map(|token| match self.class_for(&token.terminal) {
                Some(class) => {
                    let match_rank = match class.match_input(&token.input) {
                        MatchStatus::Success => 1,
                        MatchStatus::Partial | MatchStatus::Failure => 0,
                    };
                    let completable_rank = if class.completable() { 0 } else { 1 };
                    (match_rank, completable_rank)
                }
                None => (0, 0),
            })
            .collect()
    }
}

/// Coalesces candidates that differ only by the ordering in which they
/// consumed an `OrderlessSet`'s siblings (§4.4 point 4) — the only grammar
/// shape allowed to legitimately produce multiple permutations for the same
/// input.
fn dedup_orderless(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: Vec<Vec<(usize, String)>> = Vec::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let mut shape: Vec<(usize, String)> = candidate
            .path_so_far
            .iter()
            .map(|t| (t.terminal.element_id(), t.input.clone()))
            .collect();
        shape.sort();
        if !seen.contains(&shape) {
            seen.push(shape);
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::grammar::compile::compile;
    use crate::token::RangedInt;

    fn registry_with_int(lo: i64, hi: i64) -> TokenRegistry {
        let mut r = TokenRegistry::new();
        r.register("INT", Rc::new(RangedInt::new(lo, hi, 10, None)));
        r
    }

    #[test]
    fn simple_keyword_matches_exactly() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let matcher = Matcher::new(&spec, &tokens);
        let result = matcher.run(&["hello".to_string()], false, true);
        assert_eq!(result.status, MatchStatusResult::Success);
    }

    #[test]
    fn simple_keyword_partial_prefix_suggests_completion() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let matcher = Matcher::new(&spec, &tokens);
        let result = matcher.run(&["he".to_string()], true, false);
        assert_eq!(result.status, MatchStatusResult::PartialIncomplete);
        assert!(result.next_tokens.iter().any(|s| s.text == "hello"));
    }

    #[test]
    fn unknown_token_fails() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let matcher = Matcher::new(&spec, &tokens);
        let result = matcher.run(&["x".to_string()], false, true);
        assert_eq!(result.status, MatchStatusResult::Failure);
        assert_eq!(result.offending_token.as_deref(), Some("x"));
    }

    #[test]
    fn alternative_with_value_extraction() {
        let spec = compile(r#"root: "set" INT ;"#).unwrap();
        let tokens = registry_with_int(1, 100);
        let matcher = Matcher::new(&spec, &tokens);
        let ok = matcher.run(&["set".to_string(), "42".to_string()], false, true);
        assert_eq!(ok.status, MatchStatusResult::Success);

        let out_of_range = matcher.run(&["set".to_string(), "101".to_string()], false, true);
        assert_eq!(out_of_range.status, MatchStatusResult::Failure);

        let partial = matcher.run(&["set".to_string()], true, false);
        assert_eq!(partial.status, MatchStatusResult::PartialIncomplete);
    }

    #[test]
    fn optional_orderless_set_accepts_any_permutation() {
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

        let bad = matcher.run(
            &["go".to_string(), "fast".to_string(), "fast".to_string()],
            false,
            true,
        );
        assert_eq!(bad.status, MatchStatusResult::Failure);
    }

    #[test]
    fn rule_reference_with_args() {
        let spec = compile(r#"outer[$r]: "take" inner[$r] ; inner[$x]: WORD ;"#).unwrap();
        let mut tokens = TokenRegistry::new();
        tokens.register("WORD", Rc::new(crate::token::AnyString::new(None)));
        let matcher = Matcher::new(&spec, &tokens);
        let result = matcher.run(&["take".to_string(), "hello".to_string()], false, true);
        assert_eq!(result.status, MatchStatusResult::Success);
    }

    #[test]
    fn repetition_bounds_are_enforced() {
        let spec = compile(r#"root: WORD * (1:3) ;"#).unwrap();
        let mut tokens = TokenRegistry::new();
        tokens.register("WORD", Rc::new(crate::token::AnyString::new(None)));
        let matcher = Matcher::new(&spec, &tokens);

        assert_eq!(matcher.run(&["a".to_string()], false, true).status, MatchStatusResult::Success);
        assert_eq!(
            matcher.run(&["a".to_string(), "b".to_string(), "c".to_string()], false, true).status,
            MatchStatusResult::Success
        );
        let overflow = matcher.run(
            &["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
            false,
            true,
        );
        assert_eq!(overflow.status, MatchStatusResult::Failure);

        let empty: Vec<String> = vec![];
        assert_eq!(matcher.run(&empty, true, true).status, MatchStatusResult::PartialIncomplete);
    }

    #[test]
    fn cacheable_class_values_populate_the_match_cache() {
        let spec = compile(r#"root: "set" INT ;"#).unwrap();
        let tokens = registry_with_int(1, 100);
        let matcher = Matcher::new(&spec, &tokens);
        assert!(matcher.cache.borrow().is_empty());
        let result = matcher.run(&["set".to_string(), "42".to_string()], false, true);
        assert_eq!(result.status, MatchStatusResult::Success);
        assert!(!matcher.cache.borrow().is_empty());
    }

    #[test]
    fn completion_offers_all_alternatives() {
        let spec = compile(r#"root: "apple" | "apricot" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let matcher = Matcher::new(&spec, &tokens);
        let result = matcher.run(&["ap".to_string()], true, false);
        assert_eq!(result.status, MatchStatusResult::PartialIncomplete);
        let mut texts: Vec<_> = result.next_tokens.iter().map(|s| s.text.clone()).collect();
        texts.sort();
        assert_eq!(texts, vec!["apple".to_string(), "apricot".to_string()]);
    }

    #[derive(Debug)]
    struct FixedClass {
        status: MatchStatus,
        completable: bool,
    }

    impl ITokenClass for FixedClass {
        fn match_input(&self, _input: &str) -> MatchStatus {
            self.status
        }
        fn complete(&self, _input: &str) -> Completions {
            Completions::Bounded(vec![])
        }
        fn get_value(&self, input: &str) -> Value {
            Value::Str(input.to_string())
        }
        fn get_helpstring(&self) -> String {
            String::new()
        }
        fn completable(&self) -> bool {
            self.completable
        }
    }

    fn fixed_lookup(token_name: &str, input: &str) -> LookupToken {
        let terminal: Rc<dyn IElement> = Rc::new(TokenRefElem {
            token_name: token_name.to_string(),
            mandatory: true,
            helpstring: None,
            pre: vec![],
            post: vec![],
        });
        LookupToken { path: vec![], terminal, input: input.to_string() }
    }

    /// The summed-score tie-break this replaces would score both candidates
    /// equal (3 vs 3: one Success+non-completable position worth 3, one
    /// Partial+completable position worth 0, in either order) and report
    /// `Ambiguous`. A position-by-position walk must instead pick candidate A
    /// outright, since it wins at the very first position.
    #[test]
    fn ambiguity_resolves_by_first_differing_position_not_summed_score() {
        let spec = compile(r#"root: "noop" ;"#).unwrap();
        let mut tokens = TokenRegistry::new();
        tokens.register("SUCCESS_NONCOMPLETABLE", Rc::new(FixedClass { status: MatchStatus::Success, completable: false }));
        tokens.register("PARTIAL_COMPLETABLE", Rc::new(FixedClass { status: MatchStatus::Partial, completable: true }));
        let matcher = Matcher::new(&spec, &tokens);

        let candidate_a = Candidate {
            path_so_far: vec![
                fixed_lookup("SUCCESS_NONCOMPLETABLE", "x"),
                fixed_lookup("PARTIAL_COMPLETABLE", "y"),
            ],
            frontier_source: None,
            consumed: Consumed::new(),
        };
        let candidate_b = Candidate {
            path_so_far: vec![
                fixed_lookup("PARTIAL_COMPLETABLE", "y"),
                fixed_lookup("SUCCESS_NONCOMPLETABLE", "x"),
            ],
            frontier_source: None,
            consumed: Consumed::new(),
        };

        assert_eq!(matcher.candidate_score(&candidate_a), vec![(1, 1), (0, 0)]);
        assert_eq!(matcher.candidate_score(&candidate_b), vec![(0, 0), (1, 1)]);

        let winner = matcher.resolve_ambiguity(vec![candidate_a.clone(), candidate_b.clone()]).unwrap();
        assert_eq!(winner.path_so_far[0].input, "x");
        assert_eq!(winner.path_so_far[0].terminal.as_any().downcast_ref::<TokenRefElem>().unwrap().token_name, "SUCCESS_NONCOMPLETABLE");
    }
}
