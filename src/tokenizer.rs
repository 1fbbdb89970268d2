//! Line tokenizer (SPEC_FULL.md §4.1).
//!
//! Splits one raw input line into a sequence of [`Token`]s, tracking quoting
//! so that the matcher can tell a bare word from a quoted one and can treat
//! an unterminated quote as a legitimate dry-run completion state rather than
//! an error. Grounded on `nessaid_cli/tokenizer/tokenizer.py`'s PLY lexer
//! rules for `WORD`, `QUOTED_STR` and `QUOTED_INCOMPLETE_STR`.

use crate::error::TokenizerError;

/// One token split out of an input line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The decoded token value (escapes resolved, surrounding quotes stripped).
    pub value: String,
    /// The original surface text, including quotes if any, as typed by the user.
    pub surface: String,
    pub quoted: bool,
    /// True if this token is a quoted token whose closing quote was never seen
    /// (end of line or bare newline reached first). Only the last token in a
    /// line can be incomplete.
    pub incomplete: bool,
    /// Byte offset of the token's first character in the source line.
    pub position: usize,
}

fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn decode_escape(c: char) -> Option<char> {
    match c {
        '\\' => Some('\\'),
        '"' => Some('"'),
        '0' => Some('\0'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'b' => Some('\u{8}'),
        'v' => Some('\u{b}'),
        'a' => Some('\u{7}'),
        _ => None,
    }
}

/// Splits `line` into tokens. A `#` never starts a comment here; that is a
/// file-input concept layered on top (§6), applied before this function ever
/// sees the line.
pub fn tokenize(line: &str) -> Result<Vec<Token>, TokenizerError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        if is_whitespace(chars[i]) {
            i += 1;
            continue;
        }
        if chars[i] == '"' {
            let (token, next) = read_quoted(&chars, i)?;
            tokens.push(token);
            i = next;
        } else {
            let (token, next) = read_bare(&chars, i)?;
            tokens.push(token);
            i = next;
        }
    }

    Ok(tokens)
}

fn read_bare(chars: &[char], start: usize) -> Result<(Token, usize), TokenizerError> {
    let mut i = start;
    let mut surface = String::new();
    while i < chars.len() {
        let c = chars[i];
        if is_whitespace(c) || c == '"' || c == '\n' {
            break;
        }
        if c == '\\' {
            return Err(TokenizerError::IllegalChar {
                offending_char: c,
                position: i,
            });
        }
        surface.push(c);
        i += 1;
    }
    Ok((
        Token {
            value: surface.clone(),
            surface,
            quoted: false,
            incomplete: false,
            position: start,
        },
        i,
    ))
}

fn read_quoted(chars: &[char], start: usize) -> Result<(Token, usize), TokenizerError> {
    let mut i = start + 1; // skip opening quote
    let mut value = String::new();
    let mut surface = String::new();
    surface.push('"');

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            surface.push('"');
            return Ok((
                Token {
                    value,
                    surface,
                    quoted: true,
                    incomplete: false,
                    position: start,
                },
                i + 1,
            ));
        }
        if c == '\n' {
            // Unterminated quote at a bare newline: incomplete, not an error.
            return Ok((
                Token {
                    value,
                    surface,
                    quoted: true,
                    incomplete: true,
                    position: start,
                },
                i,
            ));
        }
        if c == '\\' {
            surface.push('\\');
            if i + 1 >= chars.len() {
                return Ok((
                    Token {
                        value,
                        surface,
                        quoted: true,
                        incomplete: true,
                        position: start,
                    },
                    i + 1,
                ));
            }
            let escaped = chars[i + 1];
            match decode_escape(escaped) {
                Some(decoded) => {
                    value.push(decoded);
                    surface.push(escaped);
                    i += 2;
                }
                None => {
                    return Err(TokenizerError::BadEscape {
                        offending_char: escaped,
                        position: i,
                    });
                }
            }
            continue;
        }
        value.push(c);
        surface.push(c);
        i += 1;
    }

    // Reached end of input without a closing quote.
    Ok((
        Token {
            value,
            surface,
            quoted: true,
            incomplete: true,
            position: start,
        },
        i,
    ))
}

/// Re-renders a decoded token list back into a line that would re-tokenize
/// to the same values, quoting any value containing whitespace or characters
/// that require escaping (§8 round-trip property).
pub fn render(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| render_token(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_token(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.chars().any(|c| {
            is_whitespace(c) || c == '"' || c == '\\' || c == '\n' || c == '\r' || c == '\t'
        });
    if !needs_quoting {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{7}' => out.push_str("\\a"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn splits_bare_tokens_on_whitespace() {
        let toks = tokenize("go   fast  quiet").unwrap();
        let values: Vec<_> = toks.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["go", "fast", "quiet"]);
    }

    #[test]
    fn decodes_quoted_escapes() {
        let toks = tokenize(r#""a\tb\nc""#).unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].value, "a\tb\nc");
        assert!(toks[0].quoted);
        assert!(!toks[0].incomplete);
    }

    #[test]
    fn unterminated_quote_is_incomplete_not_error() {
        let toks = tokenize(r#""hello wor"#).unwrap();
        assert_eq!(toks.len(), 1);
        assert!(toks[0].incomplete);
        assert_eq!(toks[0].value, "hello wor");
    }

    #[test]
    fn bad_escape_is_an_error() {
        let err = tokenize(r#""a\qb""#).unwrap_err();
        assert!(matches!(err, TokenizerError::BadEscape { offending_char: 'q', .. }));
    }

    #[test]
    fn bare_backslash_outside_quotes_is_illegal() {
        let err = tokenize(r"go\fast").unwrap_err();
        assert!(matches!(err, TokenizerError::IllegalChar { offending_char: '\\', .. }));
    }

    #[test]
    fn render_round_trips_through_tokenize() {
        let values = vec!["hello".to_string(), "with space".to_string(), "a\"b".to_string()];
        let rendered = render(&values);
        let retok: Vec<_> = tokenize(&rendered)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect();
        assert_eq!(retok, values);
    }
}
