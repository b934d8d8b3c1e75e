//! Table formatting utilities for CLI output.

use comfy_table::{ContentArrangement, Table, presets};
use dynser::ConfigIssue;

/// Format schema issues as a table.
pub fn format_issue_table(issues: &[ConfigIssue]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Tag", "Rule", "Problem"]);

    for issue in issues {
        table.add_row(vec![
            issue.tag.clone(),
            issue.rule.map_or_else(|| "-".to_string(), |rule| format!("{rule}")),
            issue.message.clone(),
        ]);
    }

    table
}
