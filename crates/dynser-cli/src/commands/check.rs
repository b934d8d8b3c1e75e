//! Implementation of the `dynser check` command.

use std::path::PathBuf;

use owo_colors::OwoColorize;

use super::load_schemas;
use crate::output::format_issue_table;

/// Arguments for the check command.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Schema files to check (.yaml)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> miette::Result<i32> {
    let config = load_schemas(&args.files)?;
    let issues = config.validate();

    if args.json {
        let output = serde_json::to_string_pretty(&issues)
            .map_err(|e| miette::miette!("Cannot encode issues: {}", e))?;
        println!("{output}");
    } else if issues.is_empty() {
        println!("{} {} tags checked", "ok:".green(), config.len());
    } else {
        println!("{}", format_issue_table(&issues));
        eprintln!("{} {} issue(s) found", "error:".red(), issues.len());
    }

    if issues.is_empty() {
        Ok(exitcode::OK)
    } else {
        Ok(exitcode::DATAERR)
    }
}
