//! Language Generation (LG) templates.
//!
//! A `.lg` file defines named templates whose bodies are alternative texts,
//! conditionals, switches or structured objects, with `${...}` expressions
//! evaluated against a data scope. [`Templates`] parses a file and its
//! imports; evaluation, expansion and analysis run on the parsed collection.
//!
//! # Example
//!
//! ```
//! use lg::Templates;
//! use serde_json::json;
//!
//! let templates = Templates::parse_str(
//!     "# weather(temp)\n- IF: ${temp > 25}\n  - Hot\n- ELSE:\n  - Mild",
//! );
//! assert_eq!(templates.evaluate("weather", json!({"temp": 30})).unwrap(), json!("Hot"));
//! ```

mod checker;
mod diagnostic;
mod error;
mod exports;
mod interpreter;
mod loader;
mod locale;
mod options;
pub mod parser;
mod resolver;
mod templates;

pub use diagnostic::{Diagnostic, Range, Severity};
pub use error::{LoadError, LocaleError, TemplateError, compute_suggestions};
pub use interpreter::{Analyzer, AnalyzerResult, Evaluator, Expander};
pub use locale::{
    LanguageGenerator, ResourceId, fallback_chain, group_by_locale, is_locale, select,
};
pub use options::{EvaluationOptions, LineBreakStyle};
pub use parser::{ParseError, Template, TemplateBody};
pub use resolver::{FileResolver, ImportResolver, MemoryResolver, ResolveError, Resource};
pub use templates::Templates;

pub use lg_expression::{Scope, Value};
