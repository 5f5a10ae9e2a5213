//! Implementation of the `lg check` command.

use std::path::{Path, PathBuf};

use lg::{Diagnostic, Templates};
use miette::IntoDiagnostic;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tracing::debug;

use crate::output::report_diagnostics;

/// Arguments for the check command.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Files to check (.lg)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for one checked file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    /// Set when the file itself could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    load_error: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    fn errors(&self) -> usize {
        usize::from(self.load_error.is_some())
            + self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    fn warnings(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_error()).count()
    }
}

fn check_file(path: &Path) -> FileReport {
    let file = path.display().to_string();
    match Templates::parse_file(path) {
        Ok(templates) => {
            debug!(file, templates = templates.len(), "checked");
            FileReport {
                file,
                load_error: None,
                diagnostics: templates.all_diagnostics(),
            }
        }
        Err(e) => FileReport {
            file,
            load_error: Some(e.to_string()),
            diagnostics: Vec::new(),
        },
    }
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> miette::Result<i32> {
    let reports: Vec<FileReport> = args.files.iter().map(|path| check_file(path)).collect();
    let errors: usize = reports.iter().map(FileReport::errors).sum();
    let warnings: usize = reports.iter().map(FileReport::warnings).sum();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports).into_diagnostic()?);
    } else {
        for report in &reports {
            if let Some(load_error) = &report.load_error {
                let label = "error"
                    .if_supports_color(Stream::Stderr, |t| t.red().bold().to_string());
                eprintln!("{label}: {load_error}");
            }
            report_diagnostics(&report.diagnostics);
        }

        let summary = format!(
            "{errors} error(s), {warnings} warning(s) in {} file(s)",
            reports.len()
        );
        let summary = summary.if_supports_color(Stream::Stdout, |t| {
            if errors > 0 {
                t.red().to_string()
            } else if warnings > 0 {
                t.yellow().to_string()
            } else {
                t.green().to_string()
            }
        });
        println!("{summary}");
    }

    if errors > 0 {
        Ok(exitcode::DATAERR)
    } else {
        Ok(exitcode::OK)
    }
}
