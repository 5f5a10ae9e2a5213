//! Table formatting utilities for CLI output.

use comfy_table::{ContentArrangement, Table, presets};
use lg::AnalyzerResult;

/// Coverage of one localized variant of a resource.
pub struct LocaleCoverage {
    /// Resource name without locale or extension (e.g. "greet").
    pub resource: String,
    /// Locale tag (e.g. "fr-ca").
    pub locale: String,
    /// Number of language-neutral templates also defined here.
    pub translated: usize,
    /// Number of templates in the language-neutral file.
    pub total: usize,
    /// Names of templates missing from this locale.
    pub missing: Vec<String>,
}

/// Format coverage data as an ASCII table.
pub fn format_coverage_table(coverage: &[LocaleCoverage]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Resource", "Locale", "Coverage", "Missing"]);

    for row in coverage {
        table.add_row(vec![
            row.resource.clone(),
            row.locale.clone(),
            format!("{}/{}", row.translated, row.total),
            row.missing.len().to_string(),
        ]);
    }

    table
}

/// Format an analysis result as a two-column table.
pub fn format_analysis_table(result: &AnalyzerResult) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Variables", "Templates"]);

    let rows = result.variables.len().max(result.template_references.len());
    for i in 0..rows {
        table.add_row(vec![
            result.variables.get(i).cloned().unwrap_or_default(),
            result.template_references.get(i).cloned().unwrap_or_default(),
        ]);
    }

    table
}
