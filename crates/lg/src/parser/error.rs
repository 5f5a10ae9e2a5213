//! Parse error types for LG text.

use lg_expression::ExpressionError;
use thiserror::Error;

/// An error found while parsing a single piece of template text.
///
/// File-level parsing never fails: these errors are converted into
/// diagnostics attached to the offending line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A syntax error with location information.
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    /// A `${` with no matching `}`.
    #[error("unterminated expression starting at column {column}")]
    UnterminatedExpression { column: usize },

    /// An embedded expression that the expression parser rejected.
    #[error("invalid expression '{source_text}': {error}")]
    Expression {
        source_text: String,
        #[source]
        error: ExpressionError,
    },
}
