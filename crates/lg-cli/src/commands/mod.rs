//! CLI command implementations.

mod analyze;
mod check;
mod coverage;
mod eval;
mod expand;
mod scope;

pub use analyze::{AnalyzeArgs, run_analyze};
pub use check::{CheckArgs, run_check};
pub use coverage::{CoverageArgs, run_coverage};
pub use eval::{EvalArgs, run_eval};
pub use expand::{ExpandArgs, run_expand};

use std::path::Path;

use lg::{Diagnostic, Templates};
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::output::report_diagnostics;

/// Parse `path` and its imports.
///
/// Returns `None` after reporting them if the collection has errors.
fn load_templates(path: &Path) -> Result<Option<Templates>> {
    let templates = Templates::parse_file(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to load {}", path.display()))?;
    let diagnostics = templates.all_diagnostics();
    if diagnostics.iter().any(Diagnostic::is_error) {
        report_diagnostics(&diagnostics);
        return Ok(None);
    }
    Ok(Some(templates))
}
