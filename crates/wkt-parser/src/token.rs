//! WKT tokenizer.

use crs_common::ParseError;

/// A single lexeme with its byte offset into the source text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    /// The raw source slice, kept for error reporting.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Bare identifier: element keyword or axis direction.
    Keyword(String),
    /// IEEE-754 double precision literal.
    Number(f64),
    /// Double-quoted string, quotes stripped.
    Text(String),
    Open,
    Close,
    Comma,
}

/// Split WKT text into tokens. Both `[` `]` and `(` `)` delimit elements.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            '[' | '(' => {
                tokens.push(Token {
                    kind: TokenKind::Open,
                    offset: i,
                    raw: c.to_string(),
                });
                i += 1;
            }
            ']' | ')' => {
                tokens.push(Token {
                    kind: TokenKind::Close,
                    offset: i,
                    raw: c.to_string(),
                });
                i += 1;
            }
            ',' => {
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    offset: i,
                    raw: ",".to_string(),
                });
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != b'"' {
                    end += 1;
                }
                if end >= bytes.len() {
                    // Truncate on char boundaries; the text may be
                    // multi-byte UTF-8.
                    let fragment: String = src[i..].chars().take(16).collect();
                    return Err(ParseError::new("unterminated quoted string", fragment, i));
                }
                tokens.push(Token {
                    kind: TokenKind::Text(src[start..end].to_string()),
                    offset: i,
                    raw: src[i..=end].to_string(),
                });
                i = end + 1;
            }
            '-' | '+' | '.' | '0'..='9' => {
                let start = i;
                let mut end = i + 1;
                while end < bytes.len() {
                    match bytes[end] as char {
                        '0'..='9' | '.' | 'e' | 'E' => end += 1,
                        // Signs are only valid immediately after an exponent marker.
                        '-' | '+' if matches!(bytes[end - 1], b'e' | b'E') => end += 1,
                        _ => break,
                    }
                }
                let raw = &src[start..end];
                let value: f64 = raw.parse().map_err(|_| {
                    ParseError::new("invalid numeric literal", raw, start)
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset: start,
                    raw: raw.to_string(),
                });
                i = end;
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let start = i;
                let mut end = i + 1;
                while end < bytes.len()
                    && matches!(bytes[end] as char, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_')
                {
                    end += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Keyword(src[start..end].to_string()),
                    offset: start,
                    raw: src[start..end].to_string(),
                });
                i = end;
            }
            _ => {
                return Err(ParseError::new(
                    format!("unexpected character '{c}'"),
                    c.to_string(),
                    i,
                ));
            }
        }
    }

    Ok(tokens)
}
