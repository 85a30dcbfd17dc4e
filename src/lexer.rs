use std::cmp;

use memchr::memchr3;

use crate::containers::DArray;
use crate::error::{Error, ErrorKind};
use crate::Result;

/// Byte range into the lexer's source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Str,
    Integer,
    Float,
    BracketOpen,
    BracketClose,
    BraceOpen,
    BraceClose,
    Colon,
    Comma,
}

/// One lexical unit. The span points into the owning [`Lexer`]'s buffer;
/// string spans exclude the surrounding quotes and keep escapes raw.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based source line, for error reporting.
    pub line: u64,
    pub span: Span,
}

/// Single-pass tokenizer. Stops at the first error; tokens lexed before the
/// error remain available.
pub struct Lexer {
    content: String,
    tokens: DArray<Token>,
}

impl Lexer {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens: DArray::new(),
        }
    }

    /// Swaps in new source text, keeping the token buffer for reuse.
    pub fn reset(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.tokens.clear();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.content[span.start..span.end]
    }

    pub fn lex(&mut self) -> Result<()> {
        self.tokens.clear();
        // Rough token-count estimate to avoid early regrowth.
        self.tokens.reserve(cmp::max(2, self.content.len() / 3));
        lex_bytes(self.content.as_bytes(), &mut self.tokens)
    }
}

fn lex_bytes(bytes: &[u8], tokens: &mut DArray<Token>) -> Result<()> {
    let mut index = 0;
    let mut line: u64 = 1;
    loop {
        while index < bytes.len() && is_whitespace(bytes[index]) {
            line += (bytes[index] == b'\n') as u64;
            index += 1;
        }
        if index >= bytes.len() {
            return Ok(());
        }
        match bytes[index] {
            byte @ (b'[' | b']' | b'{' | b'}' | b':' | b',') => {
                tokens.push_back(Token {
                    kind: punctuation_kind(byte),
                    line,
                    span: Span {
                        start: index,
                        end: index + 1,
                    },
                });
                index += 1;
            }
            b'"' => tokens.push_back(scan_string(bytes, &mut index, line)?),
            b'-' | b'.' | b'0'..=b'9' => {
                tokens.push_back(scan_number(bytes, &mut index, line)?)
            }
            _ => tokens.push_back(scan_identifier(bytes, &mut index, line)),
        }
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn punctuation_kind(byte: u8) -> TokenKind {
    match byte {
        b'[' => TokenKind::BracketOpen,
        b']' => TokenKind::BracketClose,
        b'{' => TokenKind::BraceOpen,
        b'}' => TokenKind::BraceClose,
        b':' => TokenKind::Colon,
        b',' => TokenKind::Comma,
        _ => unreachable!("not a punctuation byte"),
    }
}

/// Scans a string body. Escapes are skipped, not decoded; a raw newline or
/// end of input before the closing quote is a hard error.
fn scan_string(bytes: &[u8], index: &mut usize, line: u64) -> Result<Token> {
    *index += 1; // opening quote
    let start = *index;
    let mut cursor = start;
    loop {
        let Some(offset) = memchr3(b'"', b'\\', b'\n', &bytes[cursor..]) else {
            return Err(Error::new(ErrorKind::UnterminatedString, line));
        };
        let position = cursor + offset;
        match bytes[position] {
            b'"' => {
                *index = position + 1;
                return Ok(Token {
                    kind: TokenKind::Str,
                    line,
                    span: Span {
                        start,
                        end: position,
                    },
                });
            }
            b'\\' => {
                cursor = position + 2;
                if cursor > bytes.len() {
                    return Err(Error::new(ErrorKind::UnterminatedString, line));
                }
            }
            _ => return Err(Error::new(ErrorKind::UnterminatedString, line)),
        }
    }
}

fn scan_number(bytes: &[u8], index: &mut usize, line: u64) -> Result<Token> {
    let start = *index;
    let mut saw_dot = false;
    if bytes[*index] == b'-' {
        *index += 1;
    }
    while *index < bytes.len() {
        match bytes[*index] {
            b'0'..=b'9' => {}
            b'-' => return Err(Error::new(ErrorKind::MisplacedMinus, line)),
            b'.' => {
                if saw_dot {
                    return Err(Error::new(ErrorKind::MultipleDots, line));
                }
                saw_dot = true;
            }
            _ => break,
        }
        *index += 1;
    }
    let kind = if saw_dot {
        TokenKind::Float
    } else {
        TokenKind::Integer
    };
    Ok(Token {
        kind,
        line,
        span: Span { start, end: *index },
    })
}

fn scan_identifier(bytes: &[u8], index: &mut usize, line: u64) -> Token {
    let start = *index;
    while *index < bytes.len() && bytes[*index].is_ascii_alphabetic() {
        *index += 1;
    }
    if *index == start {
        // Byte that starts no token class; take the whole character so the
        // cursor always advances and the span stays on a char boundary.
        // The parser rejects it.
        *index += 1;
        while *index < bytes.len() && bytes[*index] & 0xC0 == 0x80 {
            *index += 1;
        }
    }
    Token {
        kind: TokenKind::Identifier,
        line,
        span: Span { start, end: *index },
    }
}
