//! Implementation of the `lg analyze` command.

use std::path::PathBuf;

use lg::Analyzer;
use miette::{IntoDiagnostic, miette};

use crate::commands::load_templates;
use crate::output::table::format_analysis_table;

/// Arguments for the analyze command.
#[derive(Debug, clap::Args)]
pub struct AnalyzeArgs {
    /// Template file (.lg)
    pub file: PathBuf,

    /// Name of the template to analyze
    pub template: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the analyze command.
pub fn run_analyze(args: AnalyzeArgs) -> miette::Result<i32> {
    let Some(templates) = load_templates(&args.file)? else {
        return Ok(exitcode::DATAERR);
    };

    let mut analyzer = Analyzer::new(&templates).map_err(|e| miette!("{e}"))?;
    let result = match analyzer.analyze(&args.template) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Analysis error: {e}");
            return Ok(exitcode::DATAERR);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else {
        println!("{}", format_analysis_table(&result));
    }
    Ok(exitcode::OK)
}
