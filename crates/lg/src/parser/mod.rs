//! LG file and text parser.
//!
//! [`parse_file`] turns a whole `.lg` file into templates, imports, option
//! lines and diagnostics. [`parse_text`] parses a single line of template
//! text and is shared with `fromFile` and inline evaluation.

pub mod ast;
pub mod error;
mod file;
mod text;

pub use ast::*;
pub use error::ParseError;
pub use file::{ParsedFile, parse_file};
pub use text::{parse_condition, parse_text};
