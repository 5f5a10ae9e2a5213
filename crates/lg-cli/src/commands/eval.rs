//! Implementation of the `lg eval` command.

use std::path::PathBuf;

use lg::Evaluator;
use lg::parser::parse_text;
use miette::{IntoDiagnostic, miette};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::commands::load_templates;
use crate::commands::scope::{ScopeArgs, print_value};

/// Arguments for the eval command.
#[derive(Debug, clap::Args)]
pub struct EvalArgs {
    /// Template file (.lg)
    pub file: PathBuf,

    /// Name of the template to evaluate
    pub template: String,

    /// Treat TEMPLATE as LG text such as "${greet()} there"
    #[arg(long)]
    pub text: bool,

    /// Seed for choosing among alternatives
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for eval results.
#[derive(Serialize)]
pub struct EvalResult {
    pub result: Value,
}

/// Run the eval command.
pub fn run_eval(args: EvalArgs) -> miette::Result<i32> {
    let Some(templates) = load_templates(&args.file)? else {
        return Ok(exitcode::DATAERR);
    };
    let scope = args.scope.scope()?;

    let mut evaluator = Evaluator::new(&templates, args.scope.options())
        .map_err(|e| miette!("{e}"))?;
    if let Some(seed) = args.seed {
        evaluator = evaluator.with_seed(seed);
    }
    debug!(options = ?evaluator.options(), "evaluating");

    let result = if args.text {
        let text = parse_text(&args.template).map_err(|e| miette!("invalid text: {e}"))?;
        evaluator.evaluate_text(&text, &scope)
    } else {
        evaluator.evaluate(&args.template, &scope)
    };

    match result {
        Ok(value) => {
            if args.json {
                let output = EvalResult { result: value };
                println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
            } else {
                print_value(&value)?;
            }
            Ok(exitcode::OK)
        }
        Err(e) => {
            if args.json {
                let output = serde_json::json!({
                    "error": e.to_string()
                });
                eprintln!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
            } else {
                eprintln!("Evaluation error: {e}");
            }
            Ok(exitcode::DATAERR)
        }
    }
}
