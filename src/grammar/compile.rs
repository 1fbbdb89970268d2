//! Resolution pass and entry point for compiling grammar source
//! (SPEC_FULL.md §4.3).
//!
//! Parses grammar source via [`super::parser::GrammarParser`], then replaces
//! every `Unresolved` placeholder with either a `RuleRef` (rule names) or
//! leaves token names to be resolved against the token-class registry at
//! match time (token classes may be registered by the host after the
//! grammar is compiled, so `TokenRefElem` construction happens here but
//! actual class lookup stays late-bound).

use std::rc::Rc;

use crate::error::CompileError;

use super::element::{
    Alternative, IElement, NamedRule, OptionalElem, OrderlessSet, RuleArg, RuleRef, Sequence,
    TokenRefElem, Unresolved,
};
use super::parser::GrammarParser;
use super::GrammarSpecification;

/// Compiles grammar source into a fully resolved [`GrammarSpecification`].
pub fn compile(source: &str) -> Result<GrammarSpecification, CompileError> {
    let spec = GrammarParser::parse(source)?;
    for name in &spec.rule_order {
        let rule = spec.rules.get(name).expect("just parsed");
        resolve_tree(rule.body(), &spec)?;
    }
    Ok(spec)
}

/// Walks an element subtree resolving every `Unresolved` node reachable from
/// it. Idempotent: an already-resolved `Unresolved` is skipped.
fn resolve_tree(element: &Rc<dyn IElement>, spec: &GrammarSpecification) -> Result<(), CompileError> {
    let any = element.as_any();

    if let Some(unresolved) = any.downcast_ref::<Unresolved>() {
        if unresolved.resolved.borrow().is_some() {
            return Ok(());
        }
        let resolved = resolve_reference(unresolved, spec)?;
        *unresolved.resolved.borrow_mut() = Some(resolved);
        return Ok(());
    }
    if let Some(seq) = any.downcast_ref::<Sequence>() {
        for child in &seq.children {
            resolve_tree(child, spec)?;
        }
        return Ok(());
    }
    if let Some(alt) = any.downcast_ref::<Alternative>() {
        for child in &alt.children {
            resolve_tree(child, spec)?;
        }
        return Ok(());
    }
    if let Some(opt) = any.downcast_ref::<OptionalElem>() {
        return resolve_tree(&opt.body, spec);
    }
    if let Some(set) = any.downcast_ref::<OrderlessSet>() {
        for child in &set.children {
            resolve_tree(&child.element, spec)?;
        }
        return Ok(());
    }
    // Literal, TokenRefElem, NamedRule, RuleRef: nothing further to resolve.
    Ok(())
}

fn resolve_reference(
    unresolved: &Unresolved,
    spec: &GrammarSpecification,
) -> Result<Rc<dyn IElement>, CompileError> {
    if let Some(rule) = spec.rules.get(&unresolved.name) {
        validate_args(rule, &unresolved.args)?;
        return Ok(Rc::new(RuleRef {
            target: rule.clone(),
            args: unresolved.args.clone(),
            helpstring: unresolved.helpstring.clone(),
            pre: unresolved.pre.clone(),
            post: unresolved.post.clone(),
        }));
    }
    if spec.tokens.contains_key(&unresolved.name) {
        return Ok(Rc::new(TokenRefElem {
            token_name: unresolved.name.clone(),
            mandatory: true,
            helpstring: unresolved.helpstring.clone(),
            pre: unresolved.pre.clone(),
            post: unresolved.post.clone(),
        }));
    }
    Err(CompileError::UnknownRule { name: unresolved.name.clone() })
}

/// Rule references do not supply more arguments than the target rule has
/// parameters; unknown keyword arguments are rejected; positional arguments
/// may not follow a keyword argument (§3 invariant).
fn validate_args(rule: &Rc<NamedRule>, args: &[RuleArg]) -> Result<(), CompileError> {
    if args.len() > rule.params.len() {
        return Err(CompileError::BadArgument {
            message: format!(
                "rule '{}' takes at most {} argument(s), {} given",
                rule.name,
                rule.params.len(),
                args.len()
            ),
        });
    }
    let mut seen_keyword = false;
    for arg in args {
        match &arg.name {
            Some(kw) => {
                seen_keyword = true;
                if rule.param_index(kw).is_none() {
                    return Err(CompileError::BadArgument {
                        message: format!("rule '{}' has no parameter '{}'", rule.name, kw),
                    });
                }
            }
            None => {
                if seen_keyword {
                    return Err(CompileError::BadArgument {
                        message: format!(
                            "positional argument follows keyword argument in call to '{}'",
                            rule.name
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Follows `Unresolved` indirection transparently, returning the real
/// element the matcher/executor should actually operate on. A no-op for any
/// element that isn't an unresolved placeholder.
pub fn resolve_through(element: &Rc<dyn IElement>) -> Rc<dyn IElement> {
    if let Some(unresolved) = element.as_any().downcast_ref::<Unresolved>() {
        if let Some(target) = unresolved.resolved.borrow().as_ref() {
            return resolve_through(target);
        }
    }
    element.clone()
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn resolves_forward_rule_reference() {
        let spec = compile(r#"outer: "take" inner ; inner: "hello" ;"#).unwrap();
        let outer = spec.rule("outer").unwrap();
        resolve_tree(outer.body(), &spec).unwrap();
    }

    #[test]
    fn unknown_rule_name_is_a_compile_error() {
        let err = compile(r#"root: nope ;"#).unwrap_err();
        assert!(matches!(err, CompileError::UnknownRule { .. }));
    }

    #[test]
    fn rejects_too_many_arguments() {
        let err = compile(r#"root: inner[$1, $2] ; inner[$x]: "a" ;"#).unwrap_err();
        assert!(matches!(err, CompileError::BadArgument { .. }));
    }

    #[test]
    fn token_reference_resolves_without_rule_lookup() {
        let spec = compile(r#"token INT RangedInt(1, 10); root: INT ;"#).unwrap();
        assert!(spec.rule("root").is_some());
    }
}
