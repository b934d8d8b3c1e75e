//! Parse error types for patterns.

use thiserror::Error;

/// An error that occurred while parsing a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A syntax error at a character offset (1-based column).
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },
}
