//! Miette diagnostic wrapper for LG file diagnostics.
//!
//! Note: This module has an exception for `unused_assignments` because miette
//! derive macros read struct fields in generated code that rustc cannot track.
#![allow(unused_assignments)]

use std::fs::read_to_string;

use lg::{Diagnostic as LgFinding, Severity};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

/// A miette-compatible diagnostic for one finding in a .lg file.
///
/// Note: Fields are read by miette derive macros, not directly by code.
#[derive(Debug, Error, Diagnostic)]
#[error("{severity}: {message}")]
#[diagnostic(code(lg::check))]
pub struct LgDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    severity: Severity,

    message: String,
}

impl LgDiagnostic {
    /// Create a diagnostic, highlighting the first line of its range.
    ///
    /// The source text is read from the diagnostic's file; when that fails
    /// the diagnostic is shown without a snippet.
    pub fn from_finding(finding: &LgFinding) -> Self {
        let content = read_to_string(&finding.source).unwrap_or_default();

        let line = finding.range.start_line.max(1);
        let offset = content
            .lines()
            .take(line - 1)
            .map(|l| l.len() + 1)
            .sum::<usize>()
            .min(content.len());
        let length = content
            .lines()
            .nth(line - 1)
            .map_or(0, str::len);

        LgDiagnostic {
            src: NamedSource::new(finding.source.clone(), content),
            span: (offset, length).into(),
            severity: finding.severity,
            message: finding.message.clone(),
        }
    }
}

/// Print every finding to stderr.
pub fn report_diagnostics<'a>(findings: impl IntoIterator<Item = &'a LgFinding>) {
    for finding in findings {
        eprintln!("{:?}", Report::new(LgDiagnostic::from_finding(finding)));
    }
}
