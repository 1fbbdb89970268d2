//! The grammar element tree (SPEC_FULL.md §3).
//!
//! `Element` is realized as a family of structs behind `Rc<dyn IElement>`,
//! mirroring `lang_pt`'s `Rc<dyn IProduction>` production trees, rather than
//! as a single Rust `enum` — this lets a [`NamedRule`] hold a [`RuleRef`]
//! back to itself (directly or transitively) the way `lang_pt::Union`/
//! `Concat` hold `Vec<Rc<dyn IProduction>>` of each other. Nullability is
//! memoized once per element via `OnceCell`, following
//! `production/non_terminals/{concat,union,suffixes}.rs`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use super::action::ActionStmt;

/// Implemented by every node of the grammar tree.
pub trait IElement: Debug {
    fn as_any(&self) -> &dyn Any;
    fn is_nullable(&self) -> bool;
    fn pre_match_binding(&self) -> &[ActionStmt];
    fn post_match_binding(&self) -> &[ActionStmt];
    fn helpstring(&self) -> Option<&str>;

    /// A stable per-instance identity for caching and debug display, the
    /// same role `lang_pt`'s `&'static str` production identifiers play.
    fn element_id(&self) -> usize {
        self as *const Self as *const () as usize
    }
}

#[derive(Debug)]
pub struct Literal {
    pub keyword: String,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
}

impl IElement for Literal {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        false
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// References a declared token class by name. Resolution of the name
/// against the grammar's token-class table happens at match time, not at
/// compile time, since token classes may be registered by the host after
/// the grammar tree is built.
#[derive(Debug)]
pub struct TokenRefElem {
    pub token_name: String,
    pub mandatory: bool,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
}

impl IElement for TokenRefElem {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        !self.mandatory
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// Matches its children in order. `repeat_count > 1` means "one child
/// matched N times" (§3 invariant: `repeat_count > 1` implies exactly one
/// child).
#[derive(Debug)]
pub struct Sequence {
    pub children: Vec<Rc<dyn IElement>>,
    pub repeat_count: usize,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
    nullable: OnceCell<bool>,
}

impl Sequence {
    pub fn new(
        children: Vec<Rc<dyn IElement>>,
        repeat_count: usize,
        helpstring: Option<String>,
        pre: Vec<ActionStmt>,
        post: Vec<ActionStmt>,
    ) -> Self {
        Self { children, repeat_count, helpstring, pre, post, nullable: OnceCell::new() }
    }
}

impl IElement for Sequence {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        *self.nullable.get_or_init(|| self.children.iter().all(|c| c.is_nullable()))
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// Matches exactly one of its children.
#[derive(Debug)]
pub struct Alternative {
    pub children: Vec<Rc<dyn IElement>>,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
    nullable: OnceCell<bool>,
}

impl Alternative {
    pub fn new(
        children: Vec<Rc<dyn IElement>>,
        helpstring: Option<String>,
        pre: Vec<ActionStmt>,
        post: Vec<ActionStmt>,
    ) -> Self {
        Self { children, helpstring, pre, post, nullable: OnceCell::new() }
    }
}

impl IElement for Alternative {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        *self.nullable.get_or_init(|| self.children.iter().any(|c| c.is_nullable()))
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// Wraps a body (usually a [`Sequence`]) whose whole matching is optional.
#[derive(Debug)]
pub struct OptionalElem {
    pub body: Rc<dyn IElement>,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
}

impl IElement for OptionalElem {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        true
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// One child of an [`OrderlessSet`] with its own mandatory/optional flag.
#[derive(Debug, Clone)]
pub struct OrderlessChild {
    pub element: Rc<dyn IElement>,
    pub mandatory: bool,
}

/// Matches each child at most once, in any order.
#[derive(Debug)]
pub struct OrderlessSet {
    pub children: Vec<OrderlessChild>,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
    nullable: OnceCell<bool>,
}

impl OrderlessSet {
    pub fn new(
        children: Vec<OrderlessChild>,
        helpstring: Option<String>,
        pre: Vec<ActionStmt>,
        post: Vec<ActionStmt>,
    ) -> Self {
        Self { children, helpstring, pre, post, nullable: OnceCell::new() }
    }
}

impl IElement for OrderlessSet {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        *self
            .nullable
            .get_or_init(|| self.children.iter().all(|c| !c.mandatory || c.element.is_nullable()))
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// A rule parameter: `$name` or `$name = default`.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<crate::value::Value>,
}

/// A named production. Has no parent (§3 invariant). `body` is set once,
/// after construction, via `OnceCell` so that mutually recursive rules can
/// reference each other by name before either body is built (the grammar
/// parser constructs every `NamedRule` shell up front, then fills in
/// bodies during the resolution pass, see `grammar::compile`).
#[derive(Debug)]
pub struct NamedRule {
    pub name: String,
    pub params: Vec<Param>,
    pub body: OnceCell<Rc<dyn IElement>>,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
}

impl NamedRule {
    pub fn shell(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
            body: OnceCell::new(),
            helpstring: None,
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn set_body(&self, body: Rc<dyn IElement>) -> Result<(), &'static str> {
        self.body.set(body).map_err(|_| "rule body already set")
    }

    pub fn body(&self) -> &Rc<dyn IElement> {
        self.body.get().expect("NamedRule body accessed before resolution completed")
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

impl IElement for NamedRule {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        self.body().is_nullable()
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// A single argument passed to a [`RuleRef`]: positional (`name == None`) or
/// keyword-style.
#[derive(Debug, Clone)]
pub struct RuleArg {
    pub name: Option<String>,
    pub expr: super::action::ActionExpr,
}

/// References a [`NamedRule`] with a list of argument expressions.
#[derive(Debug)]
pub struct RuleRef {
    pub target: Rc<NamedRule>,
    pub args: Vec<RuleArg>,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
}

impl IElement for RuleRef {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        self.target.is_nullable()
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

/// A forward reference to a rule/token name not yet resolved. Every
/// `Unresolved` must be replaced by a `RuleRef` (or inlined `TokenRefElem`/
/// `Literal`) during the compiler's resolution pass (§4.3); none may survive
/// into a successfully compiled grammar.
#[derive(Debug)]
pub struct Unresolved {
    pub name: String,
    pub args: Vec<RuleArg>,
    pub resolved: RefCell<Option<Rc<dyn IElement>>>,
    pub helpstring: Option<String>,
    pub pre: Vec<ActionStmt>,
    pub post: Vec<ActionStmt>,
}

impl IElement for Unresolved {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn is_nullable(&self) -> bool {
        match self.resolved.borrow().as_ref() {
            Some(e) => e.is_nullable(),
            None => false,
        }
    }
    fn pre_match_binding(&self) -> &[ActionStmt] {
        &self.pre
    }
    fn post_match_binding(&self) -> &[ActionStmt] {
        &self.post
    }
    fn helpstring(&self) -> Option<&str> {
        self.helpstring.as_deref()
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    fn lit(s: &str) -> Rc<dyn IElement> {
        Rc::new(Literal { keyword: s.to_string(), helpstring: None, pre: vec![], post: vec![] })
    }

    #[test]
    fn sequence_nullable_iff_all_children_nullable() {
        let seq = Sequence::new(vec![lit("a"), lit("b")], 1, None, vec![], vec![]);
        assert!(!seq.is_nullable());
    }

    #[test]
    fn optional_is_always_nullable() {
        let opt = OptionalElem { body: lit("a"), helpstring: None, pre: vec![], post: vec![] };
        assert!(opt.is_nullable());
    }

    #[test]
    fn alternative_nullable_if_any_child_nullable() {
        let alt = Alternative::new(
            vec![lit("a"), Rc::new(OptionalElem { body: lit("b"), helpstring: None, pre: vec![], post: vec![] })],
            None,
            vec![],
            vec![],
        );
        assert!(alt.is_nullable());
    }

    #[test]
    fn orderless_set_nullable_iff_all_optional() {
        let set = OrderlessSet::new(
            vec![
                OrderlessChild { element: lit("a"), mandatory: false },
                OrderlessChild { element: lit("b"), mandatory: false },
            ],
            None,
            vec![],
            vec![],
        );
        assert!(set.is_nullable());

        let set2 = OrderlessSet::new(
            vec![
                OrderlessChild { element: lit("a"), mandatory: true },
                OrderlessChild { element: lit("b"), mandatory: false },
            ],
            None,
            vec![],
            vec![],
        );
        assert!(!set2.is_nullable());
    }
}
