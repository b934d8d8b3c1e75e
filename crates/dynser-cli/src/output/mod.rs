//! Output formatting for CLI commands.

mod diagnostic;
mod table;

pub use diagnostic::SchemaDiagnostic;
pub use table::format_issue_table;
