//! Miette diagnostic wrapper for schema syntax errors.
//!
//! Note: This module has an exception for `unused_assignments` because miette
//! derive macros read struct fields in generated code that rustc cannot track.
#![allow(unused_assignments)]

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A miette-compatible diagnostic pointing into a schema file.
#[derive(Debug, Error, Diagnostic)]
#[error("schema error: {message}")]
#[diagnostic(code(dynser::schema))]
pub struct SchemaDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    message: String,
}

impl SchemaDiagnostic {
    /// Create a diagnostic for a 1-based line and column in `content`.
    pub fn new(path: &Path, content: &str, line: usize, column: usize, message: String) -> Self {
        SchemaDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: (byte_offset(content, line, column), 1).into(),
            message,
        }
    }
}

/// Convert a 1-based line and column to a byte offset, clamped to the content.
fn byte_offset(content: &str, line: usize, column: usize) -> usize {
    let offset = content
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>()
        + column.saturating_sub(1);
    offset.min(content.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_counts_previous_lines() {
        let content = "tags:\n  a: 1\n";
        assert_eq!(byte_offset(content, 2, 3), 8);
        assert_eq!(byte_offset(content, 1, 1), 0);
    }

    #[test]
    fn offset_is_clamped() {
        assert_eq!(byte_offset("ab", 9, 9), 2);
    }
}
