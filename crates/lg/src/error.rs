//! Error types for loading and evaluating templates.

use std::io;
use std::path::PathBuf;

use lg_expression::ExpressionError;
use strsim::levenshtein;
use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::resolver::ResolveError;

/// Errors that occur while loading a root template file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error when reading the root file.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The resolver could not produce the root resource.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// An error that occurred during evaluation, expansion, analysis or editing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// Template not found by name.
    #[error("template not found: '{name}'{}", suggestion_hint(.suggestions))]
    TemplateNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    /// A template was invoked while already on the call stack.
    #[error("loop detected: {}", .chain.join(" => "))]
    LoopDetected { chain: Vec<String> },

    /// Wrong number of arguments passed to a template call.
    #[error("template '{template}' expects {expected} arguments, got {got}")]
    ArgumentCount {
        template: String,
        expected: usize,
        got: usize,
    },

    /// An embedded expression failed, or yielded null in strict mode.
    #[error("{}{message}", context_prefix(.context))]
    Expression { context: String, message: String },

    /// The collection has error diagnostics and cannot be evaluated.
    #[error("{} error(s) found in templates:\n{}", .diagnostics.len(), join_lines(.diagnostics))]
    Diagnostics { diagnostics: Vec<Diagnostic> },

    /// `add_template` with a name that already exists.
    #[error("template '{name}' already exists")]
    DuplicateTemplate { name: String },

    /// A file read by `fromFile` could not be read.
    #[error("failed to read '{}': {message}", .path.display())]
    File { path: PathBuf, message: String },
}

impl TemplateError {
    /// Attach a context prefix to an expression error that has none yet.
    ///
    /// Errors raised by nested templates already carry the innermost
    /// context and are left untouched.
    pub(crate) fn with_context(self, context: impl FnOnce() -> String) -> Self {
        match self {
            TemplateError::Expression {
                context: existing,
                message,
            } if existing.is_empty() => TemplateError::Expression {
                context: context(),
                message,
            },
            other => other,
        }
    }

    pub(crate) fn not_found(name: &str, available: &[String]) -> Self {
        TemplateError::TemplateNotFound {
            name: name.to_string(),
            suggestions: compute_suggestions(name, available),
        }
    }
}

impl From<ExpressionError> for TemplateError {
    fn from(error: ExpressionError) -> Self {
        TemplateError::Expression {
            context: String::new(),
            message: error.to_string(),
        }
    }
}

/// Errors from locale-aware resource selection and generation.
#[derive(Debug, Error)]
pub enum LocaleError {
    /// No resource matches the name in any locale of the fallback chain.
    #[error("no resource '{name}' for locale '{locale}' or its fallbacks")]
    NoResource { name: String, locale: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Templates(#[from] TemplateError),
}

/// Names from `available` within a small edit distance of `target`.
///
/// At most three suggestions are returned, closest first.
pub fn compute_suggestions(target: &str, available: &[String]) -> Vec<String> {
    let max_distance = if target.chars().count() <= 3 { 1 } else { 2 };
    let mut candidates: Vec<(usize, &String)> = available
        .iter()
        .map(|name| (levenshtein(target, name), name))
        .filter(|(distance, name)| *distance <= max_distance && name.as_str() != target)
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .take(3)
        .map(|(_, name)| name.clone())
        .collect()
}

fn suggestion_hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}?", suggestions.join(", "))
    }
}

fn context_prefix(context: &str) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!("{context}: ")
    }
}

fn join_lines(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
