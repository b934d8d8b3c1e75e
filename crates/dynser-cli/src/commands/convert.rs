//! Implementation of the `dynser convert` command.

use std::fs::read_to_string;
use std::path::PathBuf;

use dynser::{Converter, Properties, PropertyValue};
use serde::Serialize;

use super::load_schemas;

/// Arguments for the convert command.
#[derive(Debug, clap::Args)]
pub struct ConvertArgs {
    /// Schema files (.yaml), merged in order
    #[arg(long = "schema", required = true)]
    pub schemas: Vec<PathBuf>,

    /// Tag to convert with
    #[arg(long, required = true)]
    pub tag: String,

    /// JSON file with the properties to convert
    #[arg(long)]
    pub props: Option<PathBuf>,

    /// String properties in key=value format (repeatable)
    #[arg(short = 'p', long = "prop", value_parser = parse_key_val)]
    pub values: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for convert results.
#[derive(Serialize)]
pub struct ConvertResult {
    pub result: String,
}

/// Parse a key=value property string.
pub(crate) fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid property format '{s}': expected key=value"))?;
    Ok((key.to_string(), value.to_string()))
}

fn read_props(args: &ConvertArgs) -> miette::Result<Properties> {
    let mut props = match &args.props {
        Some(path) => {
            let content = read_to_string(path).map_err(|e| {
                miette::miette!("Cannot read properties file {}: {}", path.display(), e)
            })?;
            serde_json::from_str::<Properties>(&content).map_err(|e| {
                miette::miette!("Invalid properties file {}: {}", path.display(), e)
            })?
        }
        None => Properties::new(),
    };
    for (key, value) in &args.values {
        props.insert(key.clone(), PropertyValue::from(value.as_str()));
    }
    Ok(props)
}

/// Run the convert command.
pub fn run_convert(args: ConvertArgs) -> miette::Result<i32> {
    let config = load_schemas(&args.schemas)?;
    let props = read_props(&args)?;
    let mut converter = Converter::builder().config(config).build();

    match converter.convert(&args.tag, &props) {
        Ok(result) => {
            if args.json {
                let output = serde_json::to_string_pretty(&ConvertResult { result })
                    .map_err(|e| miette::miette!("Cannot encode result: {}", e))?;
                println!("{output}");
            } else {
                println!("{result}");
            }
            Ok(exitcode::OK)
        }
        Err(e) => {
            if args.json {
                let output = serde_json::json!({
                    "error": e.to_string(),
                    "scope": e.scope,
                });
                eprintln!("{output:#}");
            } else {
                eprintln!("Conversion error: {e}");
            }
            Ok(exitcode::DATAERR)
        }
    }
}
