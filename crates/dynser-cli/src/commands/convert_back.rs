//! Implementation of the `dynser convert-back` command.

use std::path::PathBuf;

use dynser::Converter;

use super::load_schemas;

/// Arguments for the convert-back command.
#[derive(Debug, clap::Args)]
pub struct ConvertBackArgs {
    /// Schema files (.yaml), merged in order
    #[arg(long = "schema", required = true)]
    pub schemas: Vec<PathBuf>,

    /// Tag the text was produced with
    #[arg(long, required = true)]
    pub tag: String,

    /// Text to match
    #[arg(long, required = true)]
    pub text: String,
}

/// Run the convert-back command. Recovered properties are printed as JSON.
pub fn run_convert_back(args: ConvertBackArgs) -> miette::Result<i32> {
    let config = load_schemas(&args.schemas)?;
    let mut converter = Converter::builder().config(config).build();

    match converter.convert_back(&args.tag, &args.text) {
        Ok(props) => {
            let output = serde_json::to_string_pretty(&props)
                .map_err(|e| miette::miette!("Cannot encode properties: {}", e))?;
            println!("{output}");
            Ok(exitcode::OK)
        }
        Err(e) => {
            eprintln!("Conversion error: {e}");
            Ok(exitcode::DATAERR)
        }
    }
}
