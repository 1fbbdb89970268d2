//! Grammar source parser (SPEC_FULL.md §4.3).
//!
//! Parses grammar source text into a [`GrammarSpecification`] whose
//! `NamedRule`s may still contain `Unresolved` placeholders for rule names
//! referenced before their declaration; [`crate::grammar::compile`] performs
//! the resolution pass afterward. Grounded on `nessaid_cli/compiler.py`'s
//! PLY grammar, re-expressed as a hand-written recursive-descent parser in
//! the style the teacher itself uses to build productions.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::CompileError;
use crate::value::Value;

use super::action::{ActionExpr, ActionParser, ActionStmt};
use super::element::{
    Alternative, IElement, Literal, NamedRule, OptionalElem, OrderlessChild, OrderlessSet, Param,
    RuleArg, Sequence, Unresolved,
};
use super::{GrammarSpecification, TokenDeclaration};

#[derive(Debug, Clone, PartialEq)]
enum GTok {
    Ident(String),
    Str(String),
    Int(i64),
    Dollar,
    Action(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Pipe,
    Comma,
    Colon,
    Semi,
    Star,
    Eq,
    Eof,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self { chars: source.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.pos += 1;
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<GTok, CompileError> {
        self.skip_trivia();
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(GTok::Eof),
        };
        match c {
            '[' => { self.bump(); Ok(GTok::LBracket) }
            ']' => { self.bump(); Ok(GTok::RBracket) }
            '(' => { self.bump(); Ok(GTok::LParen) }
            ')' => { self.bump(); Ok(GTok::RParen) }
            '{' => { self.bump(); Ok(GTok::LBrace) }
            '}' => { self.bump(); Ok(GTok::RBrace) }
            '|' => { self.bump(); Ok(GTok::Pipe) }
            ',' => { self.bump(); Ok(GTok::Comma) }
            ':' => { self.bump(); Ok(GTok::Colon) }
            ';' => { self.bump(); Ok(GTok::Semi) }
            '*' => { self.bump(); Ok(GTok::Star) }
            '=' => { self.bump(); Ok(GTok::Eq) }
            '$' => { self.bump(); Ok(GTok::Dollar) }
            '"' => self.read_string(),
            '<' if self.peek2() == Some('<') => self.read_action(),
            c if c.is_ascii_digit() => self.read_int(),
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            other => Err(CompileError::SyntaxError {
                message: format!("unexpected character '{}' in grammar source", other),
                position: None,
            }),
        }
    }

    fn read_string(&mut self) -> Result<GTok, CompileError> {
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(GTok::Str(s)),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(other) => {
                        return Err(CompileError::SyntaxError {
                            message: format!("bad escape '\\{}' in grammar string literal", other),
                            position: None,
                        })
                    }
                    None => {
                        return Err(CompileError::SyntaxError {
                            message: "unterminated string literal in grammar source".to_string(),
                            position: None,
                        })
                    }
                },
                Some(c) => s.push(c),
                None => {
                    return Err(CompileError::SyntaxError {
                        message: "unterminated string literal in grammar source".to_string(),
                        position: None,
                    })
                }
            }
        }
    }

    fn read_action(&mut self) -> Result<GTok, CompileError> {
        self.bump();
        self.bump();
        let mut s = String::new();
        loop {
            match self.peek() {
                Some('>') if self.peek2() == Some('>') => {
                    self.bump();
                    self.bump();
                    return Ok(GTok::Action(s));
                }
                Some(c) => {
                    s.push(c);
                    self.bump();
                }
                None => {
                    return Err(CompileError::SyntaxError {
                        message: "unterminated action block '<< ... >>'".to_string(),
                        position: None,
                    })
                }
            }
        }
    }

    fn read_int(&mut self) -> Result<GTok, CompileError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>().map(GTok::Int).map_err(|_| CompileError::SyntaxError {
            message: format!("invalid integer '{}'", text),
            position: None,
        })
    }

    fn read_ident(&mut self) -> Result<GTok, CompileError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        Ok(GTok::Ident(self.chars[start..self.pos].iter().collect()))
    }
}

/// Recursive-descent grammar-source parser producing a [`GrammarSpecification`].
pub struct GrammarParser {
    lexer: Lexer,
    lookahead: GTok,
    spec: GrammarSpecification,
}

impl GrammarParser {
    pub fn parse(source: &str) -> Result<GrammarSpecification, CompileError> {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token()?;
        let mut parser = Self { lexer, lookahead, spec: GrammarSpecification::new() };
        parser.parse_program()?;
        Ok(parser.spec)
    }

    fn advance(&mut self) -> Result<GTok, CompileError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn expect(&mut self, tok: &GTok) -> Result<(), CompileError> {
        if &self.lookahead == tok {
            self.advance()?;
            Ok(())
        } else {
            Err(CompileError::SyntaxError {
                message: format!("expected {:?}, found {:?}", tok, self.lookahead),
                position: None,
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompileError> {
        match self.advance()? {
            GTok::Ident(name) => Ok(name),
            other => Err(CompileError::SyntaxError {
                message: format!("expected identifier, found {:?}", other),
                position: None,
            }),
        }
    }

    fn parse_program(&mut self) -> Result<(), CompileError> {
        while self.lookahead != GTok::Eof {
            if self.lookahead == GTok::Ident("token".to_string()) {
                self.parse_token_decl()?;
            } else {
                self.parse_rule_decl()?;
            }
        }
        Ok(())
    }

    fn parse_token_decl(&mut self) -> Result<(), CompileError> {
        self.advance()?; // `token`
        let name = self.expect_ident()?;
        if self.spec.tokens.contains_key(&name) || self.spec.rules.contains_key(&name) {
            return Err(CompileError::DuplicateToken { name });
        }
        let (class_name, args) = if let GTok::Ident(class) = self.lookahead.clone() {
            self.advance()?;
            self.expect(&GTok::LParen)?;
            let mut args = Vec::new();
            while self.lookahead != GTok::RParen {
                args.push(self.parse_literal_value()?);
                if self.lookahead == GTok::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
            self.expect(&GTok::RParen)?;
            (Some(class), args)
        } else {
            (None, Vec::new())
        };
        let helpstring = self.parse_optional_helpstring()?;
        self.expect(&GTok::Semi)?;
        self.spec.tokens.insert(name.clone(), TokenDeclaration { name, class_name, args, helpstring });
        Ok(())
    }

    fn parse_literal_value(&mut self) -> Result<Value, CompileError> {
        match self.advance()? {
            GTok::Str(s) => Ok(Value::Str(s)),
            GTok::Int(n) => Ok(Value::Int(n)),
            GTok::Ident(i) if i == "True" => Ok(Value::Bool(true)),
            GTok::Ident(i) if i == "False" => Ok(Value::Bool(false)),
            other => Err(CompileError::BadArgument { message: format!("expected a literal, found {:?}", other) }),
        }
    }

    fn parse_optional_helpstring(&mut self) -> Result<Option<String>, CompileError> {
        if self.lookahead == GTok::Colon {
            self.advance()?;
            match self.advance()? {
                GTok::Str(s) => Ok(Some(s)),
                other => Err(CompileError::SyntaxError {
                    message: format!("expected help string, found {:?}", other),
                    position: None,
                }),
            }
        } else {
            Ok(None)
        }
    }

    fn parse_rule_decl(&mut self) -> Result<(), CompileError> {
        let name = self.expect_ident()?;
        if self.spec.rules.contains_key(&name) || self.spec.tokens.contains_key(&name) {
            return Err(CompileError::DuplicateDefinition { name });
        }
        let params = if self.lookahead == GTok::LBracket {
            self.advance()?;
            let mut params = Vec::new();
            while self.lookahead != GTok::RBracket {
                self.expect(&GTok::Dollar)?;
                let pname = self.expect_ident()?;
                let default = if self.lookahead == GTok::Eq {
                    self.advance()?;
                    Some(self.parse_literal_value()?)
                } else {
                    None
                };
                params.push(Param { name: pname, default });
                if self.lookahead == GTok::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
            self.expect(&GTok::RBracket)?;
            params
        } else {
            Vec::new()
        };
        self.expect(&GTok::Colon)?;
        let body = self.parse_alternative()?;
        self.expect(&GTok::Semi)?;

        let rule = NamedRule::shell(name.clone(), params);
        rule.set_body(body).expect("fresh shell");
        let rc = Rc::new(rule);
        if self.spec.root.is_none() {
            self.spec.root = Some(name.clone());
        }
        self.spec.rule_order.push(name.clone());
        self.spec.rules.insert(name, rc);
        Ok(())
    }

    /// `alt := group ('|' group)*`
    fn parse_alternative(&mut self) -> Result<Rc<dyn IElement>, CompileError> {
        let mut branches = vec![self.parse_group(true)?];
        while self.lookahead == GTok::Pipe {
            self.advance()?;
            branches.push(self.parse_group(true)?);
        }
        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(Rc::new(Alternative::new(branches, None, vec![], vec![])))
        }
    }

    /// Parses a flat, top-level (not explicitly bracketed) run of elements
    /// up to a terminator (`|`, `;`, or a closing bracket handled by the
    /// caller), yielding a Sequence (juxtaposition) or OrderlessSet (comma).
    fn parse_group(&mut self, top_level: bool) -> Result<Rc<dyn IElement>, CompileError> {
        let mut items: Vec<Rc<dyn IElement>> = Vec::new();
        let mut saw_comma = false;
        loop {
            if self.at_group_terminator(top_level) {
                break;
            }
            items.push(self.parse_element()?);
            if self.lookahead == GTok::Comma {
                saw_comma = true;
                self.advance()?;
            } else if self.at_group_terminator(top_level) {
                break;
            } else if top_level && (self.lookahead == GTok::Pipe || self.lookahead == GTok::Semi) {
                break;
            }
        }
        Ok(self.finish_group(items, saw_comma))
    }

    fn at_group_terminator(&self, top_level: bool) -> bool {
        match &self.lookahead {
            GTok::Eof => true,
            GTok::RParen | GTok::RBrace => true,
            GTok::Semi | GTok::Pipe if top_level => true,
            _ => false,
        }
    }

    fn finish_group(&self, items: Vec<Rc<dyn IElement>>, saw_comma: bool) -> Rc<dyn IElement> {
        if saw_comma {
            let children = items
                .into_iter()
                .map(|e| {
                    let mandatory = !e.is_nullable();
                    OrderlessChild { element: e, mandatory }
                })
                .collect();
            Rc::new(OrderlessSet::new(children, None, vec![], vec![]))
        } else if items.len() == 1 {
            items.into_iter().next().unwrap()
        } else {
            Rc::new(Sequence::new(items, 1, None, vec![], vec![]))
        }
    }

    /// One grammar element, with optional bindings and repetition suffix.
    fn parse_element(&mut self) -> Result<Rc<dyn IElement>, CompileError> {
        let pre = self.parse_bindings()?;
        let mut unit = self.parse_unit()?;
        let post = self.parse_bindings()?;

        if self.lookahead == GTok::Star {
            self.advance()?;
            let (min, max) = self.parse_repeat_spec()?;
            unit = rewrite_repetition(unit, min, max)?;
        }

        if !pre.is_empty() || !post.is_empty() {
            unit = attach_bindings(unit, pre, post);
        }
        Ok(unit)
    }

    fn parse_bindings(&mut self) -> Result<Vec<ActionStmt>, CompileError> {
        let mut stmts = Vec::new();
        while let GTok::Action(src) = self.lookahead.clone() {
            self.advance()?;
            stmts.extend(ActionParser::parse_body(&src)?);
        }
        Ok(stmts)
    }

    fn parse_repeat_spec(&mut self) -> Result<(usize, usize), CompileError> {
        if self.lookahead == GTok::LParen {
            self.advance()?;
            let min = self.expect_int()? as usize;
            self.expect(&GTok::Colon)?;
            let max = self.expect_int()? as usize;
            self.expect(&GTok::RParen)?;
            Ok((min, max))
        } else {
            let n = self.expect_int()? as usize;
            Ok((n, n))
        }
    }

    fn expect_int(&mut self) -> Result<i64, CompileError> {
        match self.advance()? {
            GTok::Int(n) => {
                if n < 0 {
                    Err(CompileError::BadRepeater { message: "negative repeat counts are rejected".to_string() })
                } else {
                    Ok(n)
                }
            }
            other => Err(CompileError::BadRepeater { message: format!("expected a repeat count, found {:?}", other) }),
        }
    }

    fn parse_unit(&mut self) -> Result<Rc<dyn IElement>, CompileError> {
        match self.lookahead.clone() {
            GTok::Str(s) => {
                self.advance()?;
                let helpstring = self.parse_optional_helpstring()?;
                Ok(Rc::new(Literal { keyword: s, helpstring, pre: vec![], post: vec![] }))
            }
            GTok::Ident(name) => {
                self.advance()?;
                let args = if self.lookahead == GTok::LBracket {
                    self.advance()?;
                    let mut args = Vec::new();
                    while self.lookahead != GTok::RBracket {
                        args.push(self.parse_rule_arg()?);
                        if self.lookahead == GTok::Comma {
                            self.advance()?;
                        } else {
                            break;
                        }
                    }
                    self.expect(&GTok::RBracket)?;
                    args
                } else {
                    Vec::new()
                };
                Ok(Rc::new(Unresolved {
                    name,
                    args,
                    resolved: RefCell::new(None),
                    helpstring: None,
                    pre: vec![],
                    post: vec![],
                }))
            }
            GTok::LParen => {
                self.advance()?;
                let group = self.parse_group(false)?;
                self.expect(&GTok::RParen)?;
                Ok(group)
            }
            GTok::LBrace => {
                self.advance()?;
                let group = self.parse_group(false)?;
                self.expect(&GTok::RBrace)?;
                // A comma group inside braces is already an OrderlessSet and
                // stays one (§4.3); only a plain sequence gets Optional-wrapped.
                if group.as_any().downcast_ref::<OrderlessSet>().is_some() {
                    Ok(group)
                } else {
                    Ok(Rc::new(OptionalElem { body: group, helpstring: None, pre: vec![], post: vec![] }))
                }
            }
            other => Err(CompileError::SyntaxError {
                message: format!("unexpected token {:?} in grammar body", other),
                position: None,
            }),
        }
    }

    fn parse_rule_arg(&mut self) -> Result<RuleArg, CompileError> {
        if let GTok::Ident(name) = self.lookahead.clone() {
            // lookahead two tokens to see if this is `name = expr`
            let save_pos = self.lexer.pos;
            let save_lookahead = self.lookahead.clone();
            self.advance()?;
            if self.lookahead == GTok::Eq {
                self.advance()?;
                let expr = self.parse_arg_expr()?;
                return Ok(RuleArg { name: Some(name), expr });
            }
            // not a keyword arg; rewind
            self.lexer.pos = save_pos;
            self.lookahead = save_lookahead;
        }
        let expr = self.parse_arg_expr()?;
        Ok(RuleArg { name: None, expr })
    }

    fn parse_arg_expr(&mut self) -> Result<ActionExpr, CompileError> {
        match self.lookahead.clone() {
            GTok::Dollar => {
                self.advance()?;
                match self.advance()? {
                    GTok::Ident(name) => Ok(ActionExpr::Named(name)),
                    GTok::Int(n) => Ok(ActionExpr::Positional(n as usize)),
                    other => Err(CompileError::SyntaxError {
                        message: format!("expected variable after '$', found {:?}", other),
                        position: None,
                    }),
                }
            }
            GTok::Str(s) => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Str(s)))
            }
            GTok::Int(n) => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Int(n)))
            }
            GTok::Ident(i) if i == "True" => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Bool(true)))
            }
            GTok::Ident(i) if i == "False" => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Bool(false)))
            }
            GTok::Ident(i) if i == "None" => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Null))
            }
            other => Err(CompileError::SyntaxError {
                message: format!("unexpected token {:?} in rule argument", other),
                position: None,
            }),
        }
    }
}

/// Applies the repetition rewrite table of §4.3 at parse time.
fn rewrite_repetition(
    element: Rc<dyn IElement>,
    min: usize,
    max: usize,
) -> Result<Rc<dyn IElement>, CompileError> {
    if max < min {
        return Err(CompileError::BadRepeater {
            message: format!("repetition max ({}) is less than min ({})", max, min),
        });
    }
    if min == 1 && max == 1 {
        return Ok(element);
    }
    if min == max {
        return Ok(Rc::new(Sequence::new(vec![element], max, None, vec![], vec![])));
    }
    if min == 0 && max == 1 {
        return Ok(Rc::new(OptionalElem { body: element, helpstring: None, pre: vec![], post: vec![] }));
    }
    if min == 0 {
        let repeated = Rc::new(Sequence::new(vec![element], max, None, vec![], vec![]));
        return Ok(Rc::new(OptionalElem { body: repeated, helpstring: None, pre: vec![], post: vec![] }));
    }
    // min >= 1, max > min: mandatory_block followed by Sequence(Optional(clone), repeat_count = max-min)
    let mandatory_block: Rc<dyn IElement> =
        Rc::new(Sequence::new(vec![element.clone()], min, None, vec![], vec![]));
    let optional_clone = Rc::new(OptionalElem { body: element, helpstring: None, pre: vec![], post: vec![] });
    let optional_tail: Rc<dyn IElement> =
        Rc::new(Sequence::new(vec![optional_clone], max - min, None, vec![], vec![]));
    Ok(Rc::new(Sequence::new(vec![mandatory_block, optional_tail], 1, None, vec![], vec![])))
}

fn attach_bindings(element: Rc<dyn IElement>, pre: Vec<ActionStmt>, post: Vec<ActionStmt>) -> Rc<dyn IElement> {
    // Bindings wrap the element in a single-child Sequence so that they fire
    // exactly at this element's entry/exit without mutating shared element
    // instances (elements may be `Rc`-shared across repetition clones).
    Rc::new(Sequence::new(vec![element], 1, None, pre, post))
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn parses_simple_keyword_rule() {
        let spec = GrammarParser::parse(r#"root: "hello" ;"#).unwrap();
        assert!(spec.rule("root").is_some());
        assert_eq!(spec.root.as_deref(), Some("root"));
    }

    #[test]
    fn parses_token_declaration() {
        let spec = GrammarParser::parse(
            r#"token INT RangedInt(1, 100); root: "set" INT ;"#,
        )
        .unwrap();
        assert!(spec.tokens.contains_key("INT"));
    }

    #[test]
    fn rejects_duplicate_rule_names() {
        let err = GrammarParser::parse(r#"root: "a" ; root: "b" ;"#).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefinition { .. }));
    }

    #[test]
    fn rejects_rule_name_colliding_with_a_token_name() {
        let err = GrammarParser::parse(r#"token WORD AnyString(); WORD: "x" ;"#).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefinition { .. }));
    }

    #[test]
    fn parses_orderless_set_inside_optional() {
        let spec = GrammarParser::parse(r#"cmd: "go" { ("fast" , "quiet") } ;"#).unwrap();
        assert!(spec.rule("cmd").is_some());
    }

    #[test]
    fn parses_repetition_with_range() {
        let spec = GrammarParser::parse(r#"root: "a" * (1:3) ;"#).unwrap();
        assert!(spec.rule("root").is_some());
    }
}
