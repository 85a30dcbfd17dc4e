//! Embedded JSON engine with an index-arena document model.
//!
//! Text goes through a [`Lexer`] into a flat token sequence, then a
//! [`Parser`] builds a [`Document`]: a node arena plus a scalar resource
//! arena, both addressed by integer indices so the backing storage can grow
//! without invalidating references. Navigation happens through the borrowing
//! [`Value`], [`Array`] and [`Object`] views.
//!
//! The grammar is a JSON subset: no exponents, no `\uXXXX` escapes, no
//! trailing commas.
//!
//! ```
//! let document = arena_json::parse_document(r#"{"frames": [3, 5]}"#).unwrap();
//! let root = document.root();
//! assert_eq!(root.member("frames").at(1).int64(), 5);
//! assert!(root.member("missing").is_null());
//! ```

pub mod containers;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;

pub use containers::{DArray, HashTable};
pub use document::{
    Array, DependencyNode, Document, NodeIndex, Object, Resource, ResourceIndex, Value, ValueKind,
};
pub use error::{Error, ErrorKind, Stage};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::Parser;

pub type Result<T> = std::result::Result<T, Error>;

/// Parses JSON text into a [`Document`]. The first lex or parse error aborts
/// and is returned with its source line.
pub fn parse_document(text: impl Into<String>) -> Result<Document> {
    let mut lexer = Lexer::new(text);
    lexer.lex()?;
    let mut parser = Parser::new();
    parser.parse_lexed(&lexer)
}
