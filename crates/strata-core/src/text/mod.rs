//! Canonical tagged-tree text shared by mementos and diffs.
//!
//! An XML-like form: elements with quoted attributes, character data with
//! the five predefined entities plus numeric references, comments and
//! `<?...?>` prologs. Tokenizing is done with `logos` in two modes (between
//! tags and inside a tag); the reader switches mode per token.

mod lexer;
mod reader;
mod writer;

pub(crate) use reader::{parse_document, Element};
pub(crate) use writer::Writer;
