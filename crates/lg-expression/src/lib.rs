//! The expression language embedded in LG templates through `${...}`.
//!
//! This crate is deliberately independent of templates: the template engine
//! parses expression substrings with [`parse_expression`], evaluates them
//! with [`evaluate`], and injects its template-aware functions through the
//! [`FunctionHost`] trait.
//!
//! # Example
//!
//! ```
//! use lg_expression::{NoHost, Scope, evaluate, parse_expression};
//! use serde_json::json;
//!
//! let expr = parse_expression("concat(user.name, '!')").unwrap();
//! let scope = Scope::new(json!({"user": {"name": "Ana"}}));
//! assert_eq!(evaluate(&expr, &scope, &mut NoHost).unwrap(), json!("Ana!"));
//! ```

pub mod ast;
mod error;
mod eval;
mod functions;
mod parser;
mod scope;
mod value;

pub use ast::{BinaryOp, Expression, UnaryOp};
pub use error::ExpressionError;
pub use eval::{FunctionHost, NoHost, evaluate};
pub use functions::{
    BuiltinFn, CustomFunction, builtin, is_builtin, lookup_function, register_function,
    unregister_function,
};
pub use parser::parse_expression;
pub use scope::Scope;
pub use value::{compare, is_truthy, loose_equals, to_text};

pub use serde_json::Value;
