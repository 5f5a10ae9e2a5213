//! Coverage command implementation.
//!
//! Files in a directory are grouped by resource name using the
//! `<name>[.<locale>].lg` convention. Each localized file is compared
//! against the language-neutral file of the same resource.

use std::collections::BTreeSet;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

use clap::Args;
use lg::{ResourceId, Templates, group_by_locale};
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use serde::Serialize;
use tracing::{debug, warn};

use crate::output::table::{LocaleCoverage, format_coverage_table};

/// Arguments for the coverage command.
#[derive(Debug, Args)]
pub struct CoverageArgs {
    /// Directory containing .lg files, searched recursively.
    pub dir: PathBuf,

    /// Exit with non-zero code if any localized file is incomplete.
    #[arg(long)]
    pub strict: bool,

    /// Output results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// JSON output format for coverage data.
#[derive(Debug, Serialize)]
struct CoverageJson {
    resource: String,
    locale: String,
    translated: usize,
    total: usize,
    missing: Vec<String>,
}

/// Every `.lg` file under `dir`, as ids relative to `dir`.
fn collect_resources(dir: &Path, prefix: &str, found: &mut Vec<ResourceId>) -> Result<()> {
    let entries = read_dir(dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry.into_diagnostic()?.path();
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let id = format!("{prefix}{file_name}");
        if path.is_dir() {
            collect_resources(&path, &format!("{id}/"), found)?;
        } else if file_name.to_lowercase().ends_with(".lg") {
            found.push(ResourceId::parse(&id));
        }
    }
    Ok(())
}

/// Names of the templates a file defines itself.
fn template_names(dir: &Path, resource: &ResourceId) -> Result<BTreeSet<String>> {
    let templates = Templates::parse_file(dir.join(&resource.id))
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to load {}", resource.id))?;
    if templates.diagnostics().iter().any(|d| d.is_error()) {
        warn!(resource = %resource.id, "file has errors; coverage may be incomplete");
    }
    Ok(templates.names().into_iter().map(str::to_string).collect())
}

/// Run the coverage command.
pub fn run_coverage(args: CoverageArgs) -> Result<i32> {
    if !args.dir.is_dir() {
        return Err(miette!("{} is not a directory", args.dir.display()));
    }

    let mut resources = Vec::new();
    collect_resources(&args.dir, "", &mut resources)?;
    debug!(count = resources.len(), "found resources");

    let mut coverage_data: Vec<LocaleCoverage> = Vec::new();
    for (name, locales) in group_by_locale(&resources) {
        let Some(neutral) = locales.get("").and_then(|ids| ids.first()) else {
            warn!(resource = %name, "no language-neutral file; skipped");
            continue;
        };
        let source_names = template_names(&args.dir, neutral)?;

        for (locale, ids) in &locales {
            if locale.is_empty() {
                continue;
            }
            for id in ids {
                let translated = template_names(&args.dir, id)?;
                let missing: Vec<String> =
                    source_names.difference(&translated).cloned().collect();
                coverage_data.push(LocaleCoverage {
                    resource: name.clone(),
                    locale: locale.clone(),
                    translated: source_names.len() - missing.len(),
                    total: source_names.len(),
                    missing,
                });
            }
        }
    }

    // Check if any localized file is incomplete
    let any_incomplete = coverage_data.iter().any(|c| !c.missing.is_empty());

    if args.json {
        let json_data: Vec<CoverageJson> = coverage_data
            .iter()
            .map(|c| CoverageJson {
                resource: c.resource.clone(),
                locale: c.locale.clone(),
                translated: c.translated,
                total: c.total,
                missing: c.missing.clone(),
            })
            .collect();

        let json_output = serde_json::to_string_pretty(&json_data).into_diagnostic()?;
        println!("{json_output}");
    } else {
        println!("{}", format_coverage_table(&coverage_data));

        for row in &coverage_data {
            if !row.missing.is_empty() {
                println!("\nMissing in {} ({}):", row.resource, row.locale);
                for name in &row.missing {
                    println!("  - {name}");
                }
            }
        }
    }

    if args.strict && any_incomplete {
        Ok(exitcode::DATAERR)
    } else {
        Ok(exitcode::OK)
    }
}
