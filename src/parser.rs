use std::borrow::Cow;

use memchr::memchr;
use smol_str::SmolStr;

use crate::containers::{DArray, HashTable};
use crate::document::{DependencyNode, Document, NodeIndex, Resource, ResourceIndex};
use crate::error::{Error, ErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::Result;

/// Recursive-descent parser over a lexed token sequence, single lookahead.
/// The first error aborts the parse; every recursive call threads its
/// `Result` back up, so a stored error state is never needed.
pub struct Parser {
    position: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self { position: 0 }
    }

    pub fn parse_lexed(&mut self, lexer: &Lexer) -> Result<Document> {
        self.position = 0;
        let mut document = Document::with_reserved_null();
        if lexer.tokens().is_empty() {
            return Ok(document);
        }
        self.parse_next(lexer, &mut document)?;
        if let Some(extra) = lexer.tokens().get(self.position) {
            return Err(Error::new(ErrorKind::TrailingTokens, extra.line));
        }
        Ok(document)
    }

    /// Parses one value and returns the index of the node it pushed.
    fn parse_next(&mut self, lexer: &Lexer, document: &mut Document) -> Result<NodeIndex> {
        let Some(token) = self.peek(lexer) else {
            return Err(Error::new(ErrorKind::UnexpectedEof, last_line(lexer)));
        };
        match token.kind {
            TokenKind::Str => {
                let text = unescape(lexer.slice(token.span), token.line)?;
                self.position += 1;
                let resource = document.push_resource(Resource::String(text.into_owned()));
                Ok(document.push_node(DependencyNode::Direct(resource)))
            }
            TokenKind::Integer => {
                let value = lexer
                    .slice(token.span)
                    .parse::<i64>()
                    .map_err(|_| Error::new(ErrorKind::ValueExpected, token.line))?;
                self.position += 1;
                let resource = document.push_resource(Resource::Integer(value));
                Ok(document.push_node(DependencyNode::Direct(resource)))
            }
            TokenKind::Float => {
                let value = lexer
                    .slice(token.span)
                    .parse::<f64>()
                    .map_err(|_| Error::new(ErrorKind::ValueExpected, token.line))?;
                self.position += 1;
                let resource = document.push_resource(Resource::Float(value));
                Ok(document.push_node(DependencyNode::Direct(resource)))
            }
            TokenKind::Identifier => {
                let resource = match lexer.slice(token.span) {
                    "true" => document.push_resource(Resource::Boolean(true)),
                    "false" => document.push_resource(Resource::Boolean(false)),
                    // The reserved null resource is shared, never re-pushed.
                    "null" => ResourceIndex::NULL,
                    _ => return Err(Error::new(ErrorKind::InvalidIdentifier, token.line)),
                };
                self.position += 1;
                Ok(document.push_node(DependencyNode::Direct(resource)))
            }
            TokenKind::BracketOpen => self.parse_array(lexer, document),
            TokenKind::BraceOpen => self.parse_object(lexer, document),
            _ => Err(Error::new(ErrorKind::ValueExpected, token.line)),
        }
    }

    fn parse_array(&mut self, lexer: &Lexer, document: &mut Document) -> Result<NodeIndex> {
        let array = document.push_node(DependencyNode::Array(DArray::new()));
        self.position += 1; // '['
        loop {
            let Some(token) = self.peek(lexer) else {
                return Err(Error::new(ErrorKind::UnclosedArray, last_line(lexer)));
            };
            if token.kind == TokenKind::BracketClose {
                self.position += 1;
                return Ok(array);
            }

            let child = self.parse_next(lexer, document)?;
            document.array_items_mut(array).push_back(child);

            let Some(separator) = self.peek(lexer) else {
                return Err(Error::new(ErrorKind::UnclosedArray, last_line(lexer)));
            };
            match separator.kind {
                TokenKind::BracketClose => {
                    self.position += 1;
                    return Ok(array);
                }
                TokenKind::Comma => self.position += 1,
                _ => return Err(Error::new(ErrorKind::MissingArrayComma, separator.line)),
            }
        }
    }

    fn parse_object(&mut self, lexer: &Lexer, document: &mut Document) -> Result<NodeIndex> {
        let object = document.push_node(DependencyNode::Object(HashTable::new()));
        self.position += 1; // '{'
        loop {
            let Some(key_token) = self.peek(lexer) else {
                return Err(Error::new(ErrorKind::UnclosedObject, last_line(lexer)));
            };
            if key_token.kind == TokenKind::BraceClose {
                self.position += 1;
                return Ok(object);
            }
            if key_token.kind != TokenKind::Str {
                return Err(Error::new(ErrorKind::KeyExpected, key_token.line));
            }
            self.position += 1;

            let Some(colon) = self.peek(lexer) else {
                return Err(Error::new(ErrorKind::UnclosedObject, last_line(lexer)));
            };
            if colon.kind != TokenKind::Colon {
                return Err(Error::new(ErrorKind::MissingColon, colon.line));
            }
            self.position += 1;

            let key = unescape(lexer.slice(key_token.span), key_token.line)?;
            let key = SmolStr::new(key.as_ref());
            let child = self.parse_next(lexer, document)?;
            // Duplicate keys: the last occurrence wins.
            document.object_entries_mut(object).insert(key, child);

            let Some(separator) = self.peek(lexer) else {
                return Err(Error::new(ErrorKind::UnclosedObject, last_line(lexer)));
            };
            match separator.kind {
                TokenKind::BraceClose => {
                    self.position += 1;
                    return Ok(object);
                }
                TokenKind::Comma => self.position += 1,
                _ => return Err(Error::new(ErrorKind::MissingObjectComma, separator.line)),
            }
        }
    }

    fn peek(&self, lexer: &Lexer) -> Option<Token> {
        lexer.tokens().get(self.position).copied()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn last_line(lexer: &Lexer) -> u64 {
    lexer.tokens().last().map(|token| token.line).unwrap_or(1)
}

/// Decodes the seven supported escapes (`\b \f \n \r \t \" \\`); anything
/// else is a hard error. Borrows the input when there is nothing to decode.
fn unescape(raw: &str, line: u64) -> Result<Cow<'_, str>> {
    let bytes = raw.as_bytes();
    let Some(first) = memchr(b'\\', bytes) else {
        return Ok(Cow::Borrowed(raw));
    };
    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..first]);
    let mut index = first;
    while index < bytes.len() {
        if bytes[index] != b'\\' {
            let next = memchr(b'\\', &bytes[index..])
                .map(|offset| index + offset)
                .unwrap_or(bytes.len());
            out.push_str(&raw[index..next]);
            index = next;
            continue;
        }
        let escape = bytes
            .get(index + 1)
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::BadEscape, line))?;
        out.push(match escape {
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'"' => '"',
            b'\\' => '\\',
            _ => return Err(Error::new(ErrorKind::BadEscape, line)),
        });
        index += 2;
    }
    Ok(Cow::Owned(out))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn parse(input: &str) -> Result<Document> {
        let mut lexer = Lexer::new(input);
        lexer.lex()?;
        Parser::new().parse_lexed(&lexer)
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse("42").unwrap().root().int64(), 42);
        assert_eq!(parse("-7").unwrap().root().int64(), -7);
        assert_eq!(parse("2.5").unwrap().root().float64(), 2.5);
        assert!(parse("true").unwrap().root().boolean());
        assert!(!parse("false").unwrap().root().boolean());
        assert_eq!(parse("\"hi\"").unwrap().root().string(), "hi");
        assert!(parse("null").unwrap().root().is_null());
    }

    #[test]
    fn null_literal_reuses_the_reserved_resource() {
        let document = parse("null").unwrap();
        // One node for the root, none added to the resource arena.
        assert_eq!(document.node_count(), 2);
        assert_eq!(document.resource_count(), 1);
    }

    #[test]
    fn empty_input_parses_to_the_null_document() {
        let document = parse("").unwrap();
        assert!(document.root().is_null());
    }

    #[test]
    fn duplicate_object_keys_keep_the_last_value() {
        let document = parse(r#"{"k": 1, "k": 2}"#).unwrap();
        assert_eq!(document.root().member("k").int64(), 2);
        assert_eq!(document.root().object().len(), 1);
    }

    #[test]
    fn unescapes_string_values_and_keys() {
        let document = parse(r#"{"tab\there": "a\nb\\c\""}"#).unwrap();
        let root = document.root();
        assert_eq!(root.member("tab\there").string(), "a\nb\\c\"");
    }

    #[rstest]
    #[case::invalid_identifier("flase", ErrorKind::InvalidIdentifier, 1)]
    #[case::multibyte_identifier("é", ErrorKind::InvalidIdentifier, 1)]
    #[case::multibyte_in_array("[1, ✓]", ErrorKind::InvalidIdentifier, 1)]
    #[case::array_missing_comma("[1\n2]", ErrorKind::MissingArrayComma, 2)]
    #[case::object_missing_comma("{\"a\": 1\n\"b\": 2}", ErrorKind::MissingObjectComma, 2)]
    #[case::key_expected("{1: 2}", ErrorKind::KeyExpected, 1)]
    #[case::missing_colon("{\"a\"\n1}", ErrorKind::MissingColon, 2)]
    #[case::value_expected("[,]", ErrorKind::ValueExpected, 1)]
    #[case::lone_colon(":", ErrorKind::ValueExpected, 1)]
    #[case::value_after_colon_missing("{\"a\":}", ErrorKind::ValueExpected, 1)]
    #[case::unclosed_array("[1, 2", ErrorKind::UnclosedArray, 1)]
    #[case::unclosed_array_after_comma("[1,\n", ErrorKind::UnclosedArray, 1)]
    #[case::eof_after_colon("{\"a\":", ErrorKind::UnexpectedEof, 1)]
    #[case::unclosed_object("{\"a\": 1,", ErrorKind::UnclosedObject, 1)]
    #[case::unclosed_object_no_key("{", ErrorKind::UnclosedObject, 1)]
    #[case::trailing_tokens("1 2", ErrorKind::TrailingTokens, 1)]
    #[case::trailing_brace("{} }", ErrorKind::TrailingTokens, 1)]
    #[case::bad_escape(r#""a\qb""#, ErrorKind::BadEscape, 1)]
    #[case::bad_escape_in_key("{\n\"a\\qb\": 1}", ErrorKind::BadEscape, 2)]
    #[case::lone_minus("-", ErrorKind::ValueExpected, 1)]
    #[case::lone_dot(".", ErrorKind::ValueExpected, 1)]
    #[case::integer_overflow("99999999999999999999", ErrorKind::ValueExpected, 1)]
    fn error_cases(#[case] input: &str, #[case] kind: ErrorKind, #[case] line: u64) {
        let err = parse(input).expect_err("parse unexpectedly succeeded");
        assert_eq!(err.kind(), kind, "input: {input:?}");
        assert_eq!(err.line(), line, "input: {input:?}");
    }

    #[test]
    fn first_error_wins() {
        // The identifier error on line 2 must mask the missing comma after it.
        let err = parse("[\ntruu\n1]").expect_err("parse unexpectedly succeeded");
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
        assert_eq!(err.line(), 2);
    }

    #[rstest]
    #[case("", "")]
    #[case("plain", "plain")]
    #[case(r"a\nb", "a\nb")]
    #[case(r"\t\r\n", "\t\r\n")]
    #[case(r#"\"quoted\""#, "\"quoted\"")]
    #[case(r"back\\slash", "back\\slash")]
    #[case(r"\b\f", "\u{0008}\u{000C}")]
    fn unescape_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(unescape(raw, 1).unwrap().as_ref(), expected);
    }

    #[test]
    fn unescape_borrows_when_clean() {
        assert!(matches!(unescape("clean", 1).unwrap(), Cow::Borrowed(_)));
        assert!(matches!(unescape(r"a\nb", 1).unwrap(), Cow::Owned(_)));
    }
}
