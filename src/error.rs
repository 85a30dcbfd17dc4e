use thiserror::Error;

/// Everything that can go wrong while turning text into a [`Document`].
///
/// [`Document`]: crate::Document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    // Lex-time errors.
    #[error("string was never closed")]
    UnterminatedString,
    #[error("'-' can only be used at the start of a number")]
    MisplacedMinus,
    #[error("'.' can only be used once in a number")]
    MultipleDots,

    // Parse-time errors.
    #[error("an identifier can only be true, false or null")]
    InvalidIdentifier,
    #[error("elements in an array must be separated by commas")]
    MissingArrayComma,
    #[error("key/value pairs in an object must be separated by commas")]
    MissingObjectComma,
    #[error("expected a string key")]
    KeyExpected,
    #[error("keys and values must be separated by a colon")]
    MissingColon,
    #[error("expected a value")]
    ValueExpected,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("object was never closed with '}}'")]
    UnclosedObject,
    #[error("array was never closed with ']'")]
    UnclosedArray,
    #[error("expected end of input after the root value")]
    TrailingTokens,
    #[error("unsupported escape sequence")]
    BadEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct Error {
    kind: ErrorKind,
    line: u64,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, line: u64) -> Self {
        Self { kind, line }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 1-based source line the error was detected on.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn stage(&self) -> Stage {
        match self.kind {
            ErrorKind::UnterminatedString
            | ErrorKind::MisplacedMinus
            | ErrorKind::MultipleDots => Stage::Lex,
            _ => Stage::Parse,
        }
    }
}
