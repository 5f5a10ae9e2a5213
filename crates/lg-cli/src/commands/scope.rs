//! Evaluation data and options shared by `eval` and `expand`.

use std::fs::read_to_string;
use std::path::PathBuf;

use lg::{EvaluationOptions, LineBreakStyle, Scope};
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use serde_json::{Map, Value};

/// Arguments describing the data a template is evaluated against.
#[derive(Debug, clap::Args)]
pub struct ScopeArgs {
    /// Scope data as a JSON object
    #[arg(long, conflicts_with = "scope_file")]
    pub scope: Option<String>,

    /// File containing the scope data as a JSON object
    #[arg(long)]
    pub scope_file: Option<PathBuf>,

    /// Scope values in name=value format (repeatable); values are parsed as
    /// JSON when possible
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Fail on null or failing expressions
    #[arg(long)]
    pub strict: bool,

    /// Double line breaks for markdown output
    #[arg(long)]
    pub markdown: bool,
}

impl ScopeArgs {
    /// Build the scope: the JSON object first, then each parameter.
    pub fn scope(&self) -> Result<Scope> {
        let text = match (&self.scope, &self.scope_file) {
            (Some(text), _) => Some(text.clone()),
            (None, Some(path)) => Some(
                read_to_string(path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("cannot read scope file {}", path.display()))?,
            ),
            (None, None) => None,
        };

        let mut data = match text {
            Some(text) => match serde_json::from_str::<Value>(&text).into_diagnostic()? {
                Value::Object(map) => map,
                other => return Err(miette!("scope must be a JSON object, got {other}")),
            },
            None => Map::new(),
        };

        for (key, value) in &self.params {
            let value = serde_json::from_str::<Value>(value)
                .unwrap_or_else(|_| Value::String(value.clone()));
            data.insert(key.clone(), value);
        }
        Ok(Scope::new(Value::Object(data)))
    }

    /// Options that override those declared in the file.
    pub fn options(&self) -> EvaluationOptions {
        EvaluationOptions {
            strict: self.strict.then_some(true),
            null_substitution: None,
            line_break_style: self.markdown.then_some(LineBreakStyle::Markdown),
        }
    }
}

/// Parse a key=value parameter string.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter format '{s}': expected name=value"))?;
    Ok((key.to_string(), value.to_string()))
}

/// Print a value: strings as-is, anything else as pretty JSON.
pub fn print_value(value: &Value) -> Result<()> {
    match value {
        Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(other).into_diagnostic()?),
    }
    Ok(())
}
