//! Walk tree (SPEC_FULL.md §3): the lazily-expanded runtime mirror of the
//! grammar tree used during matching and, after a successful match, replayed
//! by the execution engine.
//!
//! A `Candidate` in [`crate::matcher`] never materializes a full walk-tree
//! arena while it is still one of several live alternatives — that would
//! mean cloning a tree on every fork. Instead it carries a lightweight
//! [`PathSegment`] ancestry chain per matched terminal; only the single
//! winning candidate's recorded path of [`LookupToken`]s is replayed into a
//! real, mutable walk tree by [`crate::exec`], which is the only place that
//! needs `named_variables`/`token_variables` cells and enter/exit
//! bookkeeping.

use std::rc::Rc;

use crate::grammar::element::IElement;

/// One step of ancestry: "inside `element`, at child `child_index`,
/// repetition clone `repeat_index`". `child_index` is normalized to 0 under
/// `Alternative`s (every branch sits at position 0 of its chosen arm) and
/// under repeat groups, per §4.5's normalization rule for positional
/// variables.
#[derive(Debug, Clone)]
pub struct PathSegment {
    pub element: Rc<dyn IElement>,
    pub child_index: usize,
    pub repeat_index: usize,
}

impl PathSegment {
    /// A hashable/comparable identity for this segment, used to key
    /// per-activation state (e.g. an `OrderlessSet`'s consumed-children set)
    /// without requiring `Rc<dyn IElement>` itself to be `Eq`/`Hash`.
    pub fn key(&self) -> (usize, usize, usize) {
        (self.element.element_id(), self.child_index, self.repeat_index)
    }
}

/// A handle into the walk tree identifying one matched terminal and its full
/// ancestry context, recorded in match order as a candidate consumes input.
#[derive(Debug, Clone)]
pub struct LookupToken {
    pub path: Vec<PathSegment>,
    pub terminal: Rc<dyn IElement>,
    pub input: String,
}

/// Key type for a path prefix, used to identify a specific activation of a
/// repeatable or orderless structure across possibly many matched tokens.
pub type PathKey = Vec<(usize, usize, usize)>;

pub fn path_key(path: &[PathSegment]) -> PathKey {
    path.iter().map(PathSegment::key).collect()
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::grammar::element::Literal;

    #[test]
    fn path_key_is_stable_for_identical_segments() {
        let lit: Rc<dyn IElement> =
            Rc::new(Literal { keyword: "a".to_string(), helpstring: None, pre: vec![], post: vec![] });
        let seg = PathSegment { element: lit.clone(), child_index: 0, repeat_index: 0 };
        let seg2 = PathSegment { element: lit, child_index: 0, repeat_index: 0 };
        assert_eq!(seg.key(), seg2.key());
    }
}
