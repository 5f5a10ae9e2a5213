//! Template interpreter.
//!
//! The [`Evaluator`] produces one value for a template, the [`Expander`]
//! produces every possible value, and the [`Analyzer`] reports the
//! variables and templates a template depends on. All three resolve names
//! through a [`TemplateRegistry`] built from the collection's merged view.

mod analyzer;
mod context;
mod evaluator;
mod expander;
mod functions;
mod registry;

pub use analyzer::{Analyzer, AnalyzerResult};
pub use evaluator::Evaluator;
pub use expander::Expander;
pub(crate) use functions::split_rerun;
pub(crate) use registry::TemplateRegistry;
