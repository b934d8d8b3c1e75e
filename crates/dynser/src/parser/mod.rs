//! Pattern parser.
//!
//! Patterns are the templates of linear rules: regex-shaped text whose capture
//! groups and `{name}` placeholders are filled with field values. The parser
//! produces an AST that the interpreter renders, rewrites and translates into
//! matching regexes.

pub mod ast;
pub mod error;
mod pattern;

pub use ast::*;
pub use error::ParseError;
pub use pattern::parse_pattern;
