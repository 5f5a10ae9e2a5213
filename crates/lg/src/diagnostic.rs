//! Diagnostics produced while parsing and checking templates.

use std::fmt;

use serde::Serialize;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A 1-based, inclusive line range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Range {
    pub start_line: usize,
    pub end_line: usize,
}

impl Range {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// A range covering a single line.
    pub fn line(line: usize) -> Self {
        Self::new(line, line)
    }
}

/// A parse or validation finding attached to a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    /// Identifier of the file the diagnostic belongs to.
    pub source: String,
}

impl Diagnostic {
    pub fn error(range: Range, message: impl Into<String>, source: &str) -> Self {
        Self {
            severity: Severity::Error,
            range,
            message: message.into(),
            source: source.to_string(),
        }
    }

    pub fn warning(range: Range, message: impl Into<String>, source: &str) -> Self {
        Self {
            severity: Severity::Warning,
            range,
            message: message.into(),
            source: source.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.source.is_empty() {
            "<inline>"
        } else {
            &self.source
        };
        write!(
            f,
            "{source}:{}: {}: {}",
            self.range.start_line, self.severity, self.message
        )
    }
}
