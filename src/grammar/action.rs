//! Action-AST parser (SPEC_FULL.md §4.2).
//!
//! Parses the body of a `<< … >>` binding into a list of statements.
//! Grounded on `nessaid_cli/binding_parser/binding_text_parser.py` and
//! `binding_objects.py`: `BindingCode` (a list of statements),
//! `AssignmentStatement(lhs, rhs)`, `FunctionCall`/`BindingCall` (bare vs.
//! `call`-prefixed), and `NamedVariable`/`TokenVariable` as the two `$`-lvalue
//! kinds.

use crate::error::CompileError;
use crate::value::Value;

/// An action statement: one `;`-terminated entry of a binding body.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionStmt {
    Assignment { lhs: LValue, rhs: ActionExpr },
    /// A bare expression statement — almost always a call, evaluated for
    /// side effect.
    Expression(ActionExpr),
}

/// The left-hand side of an assignment: a named variable (`$name`) or a
/// positional/token variable (`$<n>`).
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Named(String),
    Positional(usize),
}

/// An expression appearing on the right-hand side of an assignment or as a
/// standalone statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionExpr {
    Named(String),
    Positional(usize),
    Literal(Value),
    /// A bare call, resolved first against the builtin table then the host.
    Call { name: String, args: Vec<CallArg> },
    /// A `call`-prefixed invocation: must resolve on the host or fail.
    HostCall { name: String, args: Vec<CallArg> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: ActionExpr,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Dollar,
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    None_,
    Eq,
    Comma,
    LParen,
    RParen,
    Semi,
    Eof,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { chars: source.chars().collect(), pos: 0, source }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Tok, CompileError> {
        self.skip_ws();
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Tok::Eof),
        };
        match c {
            '$' => {
                self.bump();
                Ok(Tok::Dollar)
            }
            '=' => {
                self.bump();
                Ok(Tok::Eq)
            }
            ',' => {
                self.bump();
                Ok(Tok::Comma)
            }
            '(' => {
                self.bump();
                Ok(Tok::LParen)
            }
            ')' => {
                self.bump();
                Ok(Tok::RParen)
            }
            ';' => {
                self.bump();
                Ok(Tok::Semi)
            }
            '"' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c == '-' && self.chars.get(self.pos + 1).is_some_and(|n| n.is_ascii_digit()) => {
                self.read_number()
            }
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            other => Err(CompileError::SyntaxError {
                message: format!("unexpected character '{}' in action code", other),
                position: None,
            }),
        }
    }

    fn read_string(&mut self) -> Result<Tok, CompileError> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Tok::Str(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        return Err(CompileError::SyntaxError {
                            message: format!("bad escape '\\{}' in action string literal", other),
                            position: None,
                        })
                    }
                    None => {
                        return Err(CompileError::SyntaxError {
                            message: "unterminated string literal in action code".to_string(),
                            position: None,
                        })
                    }
                },
                Some(c) => out.push(c),
                None => {
                    return Err(CompileError::SyntaxError {
                        message: "unterminated string literal in action code".to_string(),
                        position: None,
                    })
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Tok, CompileError> {
        let start = self.pos;
        if self.peek_char() == Some('-') {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>().map(Tok::Float).map_err(|_| CompileError::SyntaxError {
                message: format!("invalid float literal '{}'", text),
                position: None,
            })
        } else {
            text.parse::<i64>().map(Tok::Int).map_err(|_| CompileError::SyntaxError {
                message: format!("invalid integer literal '{}'", text),
                position: None,
            })
        }
    }

    fn read_ident(&mut self) -> Result<Tok, CompileError> {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Ok(match text.as_str() {
            "True" => Tok::True,
            "False" => Tok::False,
            "None" => Tok::None_,
            _ => Tok::Ident(text),
        })
    }
}

/// Recursive-descent parser over the token stream produced by [`Lexer`].
pub struct ActionParser<'a> {
    lexer: Lexer<'a>,
    lookahead: Tok,
}

impl<'a> ActionParser<'a> {
    pub fn new(source: &'a str) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token()?;
        Ok(Self { lexer, lookahead })
    }

    fn advance(&mut self) -> Result<Tok, CompileError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), CompileError> {
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

    /// Parses an entire `<< … >>` body into its statement list.
    pub fn parse_body(source: &str) -> Result<Vec<ActionStmt>, CompileError> {
        let mut parser = Self::new(source)?;
        let mut stmts = Vec::new();
        while parser.lookahead != Tok::Eof {
            stmts.push(parser.parse_stmt()?);
            if parser.lookahead == Tok::Semi {
                parser.advance()?;
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<ActionStmt, CompileError> {
        if self.lookahead == Tok::Ident("call".to_string()) {
            self.advance()?;
            let expr = self.parse_host_call()?;
            return Ok(ActionStmt::Expression(expr));
        }
        if self.lookahead == Tok::Dollar {
            let lhs = self.parse_lvalue()?;
            self.expect(&Tok::Eq)?;
            let rhs = self.parse_expr()?;
            return Ok(ActionStmt::Assignment { lhs, rhs });
        }
        let expr = self.parse_expr()?;
        Ok(ActionStmt::Expression(expr))
    }

    fn parse_lvalue(&mut self) -> Result<LValue, CompileError> {
        self.expect(&Tok::Dollar)?;
        match self.advance()? {
            Tok::Ident(name) => Ok(LValue::Named(name)),
            Tok::Int(n) if n >= 0 => Ok(LValue::Positional(n as usize)),
            other => Err(CompileError::SyntaxError {
                message: format!("expected variable name after '$', found {:?}", other),
                position: None,
            }),
        }
    }

    fn parse_dollar_expr(&mut self) -> Result<ActionExpr, CompileError> {
        self.expect(&Tok::Dollar)?;
        match self.advance()? {
            Tok::Ident(name) => Ok(ActionExpr::Named(name)),
            Tok::Int(n) if n >= 0 => Ok(ActionExpr::Positional(n as usize)),
            other => Err(CompileError::SyntaxError {
                message: format!("expected variable name after '$', found {:?}", other),
                position: None,
            }),
        }
    }

    fn parse_host_call(&mut self) -> Result<ActionExpr, CompileError> {
        match self.parse_expr()? {
            ActionExpr::Call { name, args } => Ok(ActionExpr::HostCall { name, args }),
            other => Err(CompileError::SyntaxError {
                message: format!("'call' must be followed by a function call, found {:?}", other),
                position: None,
            }),
        }
    }

    fn parse_expr(&mut self) -> Result<ActionExpr, CompileError> {
        match self.lookahead.clone() {
            Tok::Dollar => self.parse_dollar_expr(),
            Tok::Int(n) => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Int(n)))
            }
            Tok::Float(f) => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Float(f)))
            }
            Tok::Str(s) => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Str(s)))
            }
            Tok::True => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Bool(true)))
            }
            Tok::False => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Bool(false)))
            }
            Tok::None_ => {
                self.advance()?;
                Ok(ActionExpr::Literal(Value::Null))
            }
            Tok::Ident(name) => {
                self.advance()?;
                self.expect(&Tok::LParen)?;
                let mut args = Vec::new();
                while self.lookahead != Tok::RParen {
                    args.push(self.parse_call_arg()?);
                    if self.lookahead == Tok::Comma {
                        self.advance()?;
                    } else {
                        break;
                    }
                }
                self.expect(&Tok::RParen)?;
                Ok(ActionExpr::Call { name, args })
            }
            other => Err(CompileError::SyntaxError {
                message: format!("unexpected token {:?} in action expression", other),
                position: None,
            }),
        }
    }

    fn parse_call_arg(&mut self) -> Result<CallArg, CompileError> {
        // keyword-style args are not part of the action-call grammar in the
        // original; every argument is positional.
        let value = self.parse_expr()?;
        Ok(CallArg { name: None, value })
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn parses_a_positional_assignment() {
        let stmts = ActionParser::parse_body("$v = $2;").unwrap();
        assert_eq!(
            stmts,
            vec![ActionStmt::Assignment {
                lhs: LValue::Named("v".to_string()),
                rhs: ActionExpr::Positional(2),
            }]
        );
    }

    #[test]
    fn parses_a_bare_and_host_call() {
        let stmts = ActionParser::parse_body("print($1); call do_thing($v);").unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(
            stmts[0],
            ActionStmt::Expression(ActionExpr::Call { .. })
        ));
        assert!(matches!(
            stmts[1],
            ActionStmt::Expression(ActionExpr::HostCall { .. })
        ));
    }

    #[test]
    fn parses_literal_kinds() {
        let stmts = ActionParser::parse_body("$a = 42; $b = 3.5; $c = \"hi\"; $d = True; $e = None;").unwrap();
        assert_eq!(stmts.len(), 5);
    }
}
