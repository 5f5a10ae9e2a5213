//! Error types for expression parsing and evaluation.

use thiserror::Error;

/// An error raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// The expression text is not valid syntax.
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    /// No host, custom or built-in function has this name.
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    /// A function was called with the wrong number of arguments.
    #[error("function '{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// An operator or function received a value of the wrong type.
    #[error("{message}")]
    Type { message: String },

    /// A function failed while running.
    #[error("{name}: {message}")]
    Function { name: String, message: String },
}

impl ExpressionError {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        ExpressionError::Type {
            message: message.into(),
        }
    }
}
