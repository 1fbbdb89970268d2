//! Grammar model: element tree, action-AST parser, grammar source parser
//! and compiler (SPEC_FULL.md §3, §4.2, §4.3).

pub mod action;
pub mod compile;
pub mod element;
pub mod parser;

use std::collections::HashMap;
use std::rc::Rc;

use element::{IElement, NamedRule};

/// A `token NAME [ClassName(args…)] ;` declaration. Token-class names and
/// rule names share one namespace (§3); duplicates of either are rejected
/// during compilation.
#[derive(Debug, Clone)]
pub struct TokenDeclaration {
    pub name: String,
    pub class_name: Option<String>,
    pub args: Vec<crate::value::Value>,
    pub helpstring: Option<String>,
}

/// The compiled output of the grammar parser/compiler: every `NamedRule`
/// keyed by name, every token-class declaration, and the name of the root
/// rule (the first rule declared, absent an explicit `start` directive).
#[derive(Debug, Default)]
pub struct GrammarSpecification {
    pub rules: HashMap<String, Rc<NamedRule>>,
    pub rule_order: Vec<String>,
    pub tokens: HashMap<String, TokenDeclaration>,
    pub root: Option<String>,
}

impl GrammarSpecification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&self, name: &str) -> Option<&Rc<NamedRule>> {
        self.rules.get(name)
    }

    pub fn root_rule(&self) -> Option<&Rc<NamedRule>> {
        self.root.as_ref().and_then(|name| self.rule(name))
    }

    /// Renders one rule's element tree as an indented `ptree` diagram, the
    /// way `ASTNode::print` walks a parsed tree via `ptree::TreeItem` for
    /// interactive debugging. A host's `:tree <rule>` debug command is the
    /// intended caller; `RuleRef` nodes stop at the referenced rule's name
    /// rather than expanding its body, the same guard `render_element` below
    /// uses, so a recursive rule cannot recurse this printer forever.
    pub fn debug_tree(&self, rule_name: &str) -> std::io::Result<String> {
        let rule = match self.rule(rule_name) {
            Some(r) => r,
            None => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such rule: {}", rule_name),
                ))
            }
        };
        let node = DebugNode {
            label: rule_name.to_string(),
            children: vec![build_debug_node(rule.body())],
        };
        let mut buf = Vec::new();
        ptree::write_tree(&node, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Pretty-prints the compiled grammar back to a source-like form, the
    /// way every teacher production exposes a `build_grammar`/`impl_grammar`
    /// method for debugging a compiled tree.
    pub fn build_grammar(&self) -> String {
        let mut out = String::new();
        for (name, decl) in &self.tokens {
            match &decl.class_name {
                Some(class) => {
                    out.push_str(&format!("token {} {}(", name, class));
                    out.push_str(
                        &decl
                            .args
                            .iter()
                            .map(|v| v.to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    );
                    out.push_str(");\n");
                }
                None => out.push_str(&format!("token {};\n", name)),
            }
        }
        for name in &self.rule_order {
            if let Some(rule) = self.rules.get(name) {
                out.push_str(&format!("{}: {};\n", name, render_element(rule.body())));
            }
        }
        out
    }
}

/// An owned, `Clone`-able snapshot of one element-tree node, the debug-only
/// counterpart `lang_pt::ast_node::ASTNode` plays for a *parsed* tree: a
/// value `ptree::TreeItem` can walk without borrowing the `Rc<dyn IElement>`
/// tree itself.
#[derive(Debug, Clone)]
struct DebugNode {
    label: String,
    children: Vec<DebugNode>,
}

impl ptree::TreeItem for DebugNode {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<[Self::Child]> {
        std::borrow::Cow::from(&self.children)
    }
}

fn build_debug_node(element: &Rc<dyn IElement>) -> DebugNode {
    use element::*;
    let any = element.as_any();
    if let Some(lit) = any.downcast_ref::<Literal>() {
        return DebugNode { label: format!("\"{}\"", lit.keyword), children: vec![] };
    }
    if let Some(tok) = any.downcast_ref::<TokenRefElem>() {
        return DebugNode { label: tok.token_name.clone(), children: vec![] };
    }
    if let Some(seq) = any.downcast_ref::<Sequence>() {
        let label = if seq.repeat_count > 1 {
            format!("sequence * {}", seq.repeat_count)
        } else {
            "sequence".to_string()
        };
        return DebugNode { label, children: seq.children.iter().map(build_debug_node).collect() };
    }
    if let Some(alt) = any.downcast_ref::<Alternative>() {
        return DebugNode {
            label: "alternative".to_string(),
            children: alt.children.iter().map(build_debug_node).collect(),
        };
    }
    if let Some(opt) = any.downcast_ref::<OptionalElem>() {
        return DebugNode { label: "optional".to_string(), children: vec![build_debug_node(&opt.body)] };
    }
    if let Some(set) = any.downcast_ref::<OrderlessSet>() {
        return DebugNode {
            label: "orderless".to_string(),
            children: set.children.iter().map(|c| build_debug_node(&c.element)).collect(),
        };
    }
    if let Some(rref) = any.downcast_ref::<RuleRef>() {
        return DebugNode { label: format!("{}[...]", rref.target.name), children: vec![] };
    }
    DebugNode { label: "<?>".to_string(), children: vec![] }
}

fn render_element(element: &Rc<dyn IElement>) -> String {
    use element::*;
    let any = element.as_any();
    if let Some(lit) = any.downcast_ref::<Literal>() {
        return format!("\"{}\"", lit.keyword);
    }
    if let Some(tok) = any.downcast_ref::<TokenRefElem>() {
        return tok.token_name.clone();
    }
    if let Some(seq) = any.downcast_ref::<Sequence>() {
        let body = seq.children.iter().map(render_element).collect::<Vec<_>>().join(" ");
        return if seq.repeat_count > 1 {
            format!("({}) * {}", body, seq.repeat_count)
        } else {
            format!("({})", body)
        };
    }
    if let Some(alt) = any.downcast_ref::<Alternative>() {
        return alt.children.iter().map(render_element).collect::<Vec<_>>().join(" | ");
    }
    if let Some(opt) = any.downcast_ref::<OptionalElem>() {
        return format!("{{ {} }}", render_element(&opt.body));
    }
    if let Some(set) = any.downcast_ref::<OrderlessSet>() {
        let body = set.children.iter().map(|c| render_element(&c.element)).collect::<Vec<_>>().join(", ");
        return format!("({})", body);
    }
    if let Some(rref) = any.downcast_ref::<RuleRef>() {
        return format!("{}[...]", rref.target.name);
    }
    "<?>".to_string()
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::grammar::compile::compile;

    #[test]
    fn build_grammar_round_trips_a_simple_rule() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        let rendered = spec.build_grammar();
        assert!(rendered.contains("root: \"hello\""));
    }

    #[test]
    fn debug_tree_renders_every_child() {
        let spec = compile(r#"cmd: "go" { ("fast" , "quiet") } ;"#).unwrap();
        let tree = spec.debug_tree("cmd").unwrap();
        assert!(tree.contains("\"go\""));
        assert!(tree.contains("\"fast\""));
        assert!(tree.contains("\"quiet\""));
    }

    #[test]
    fn debug_tree_rejects_unknown_rule() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        assert!(spec.debug_tree("nope").is_err());
    }
}
