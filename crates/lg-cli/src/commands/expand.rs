//! Implementation of the `lg expand` command.

use std::path::PathBuf;

use lg::Expander;
use miette::{IntoDiagnostic, miette};

use crate::commands::load_templates;
use crate::commands::scope::{ScopeArgs, print_value};

/// Arguments for the expand command.
#[derive(Debug, clap::Args)]
pub struct ExpandArgs {
    /// Template file (.lg)
    pub file: PathBuf,

    /// Name of the template to expand
    pub template: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output as a JSON array
    #[arg(long)]
    pub json: bool,
}

/// Run the expand command.
pub fn run_expand(args: ExpandArgs) -> miette::Result<i32> {
    let Some(templates) = load_templates(&args.file)? else {
        return Ok(exitcode::DATAERR);
    };
    let scope = args.scope.scope()?;

    let mut expander =
        Expander::new(&templates, args.scope.options()).map_err(|e| miette!("{e}"))?;
    let values = match expander.expand(&args.template, &scope) {
        Ok(values) => values,
        Err(e) => {
            eprintln!("Expansion error: {e}");
            return Ok(exitcode::DATAERR);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&values).into_diagnostic()?);
    } else {
        for value in &values {
            print_value(value)?;
        }
    }
    Ok(exitcode::OK)
}
