//! CLI command implementations.

mod check;
mod convert;
mod convert_back;

use std::fs::read_to_string;
use std::path::PathBuf;

use dynser::{Config, LoadError};

use crate::output::SchemaDiagnostic;

pub use check::{CheckArgs, run_check};
pub use convert::{ConvertArgs, run_convert};
pub use convert_back::{ConvertBackArgs, run_convert_back};

/// Read and merge schema files in order; later files win on tag conflicts.
pub(crate) fn load_schemas(paths: &[PathBuf]) -> miette::Result<Config> {
    let mut config = Config::new();
    for path in paths {
        let content = read_to_string(path)
            .map_err(|e| miette::miette!("Cannot read schema file {}: {}", path.display(), e))?;
        match Config::from_yaml_str(&content) {
            Ok(loaded) => config.merge(loaded),
            Err(LoadError::Parse {
                line,
                column,
                message,
                ..
            }) => {
                return Err(
                    SchemaDiagnostic::new(path, &content, line, column, message).into(),
                );
            }
            Err(e) => return Err(miette::miette!("{}: {}", path.display(), e)),
        }
    }
    Ok(config)
}
