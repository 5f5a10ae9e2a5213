//! The `Templates` collection: a parsed file plus everything it imports.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};

use lg_expression::{Scope, Value};

use crate::diagnostic::Diagnostic;
use crate::error::{LoadError, TemplateError};
use crate::interpreter::{Analyzer, AnalyzerResult, Evaluator, Expander};
use crate::loader::Loader;
use crate::options::{EvaluationOptions, parse_option};
use crate::parser::{Import, Template, parse_text};
use crate::resolver::{FileResolver, ImportResolver};

/// A parsed template file together with its imports.
///
/// Collections are immutable: edits such as [`Templates::add_template`]
/// return a new collection and leave the original untouched. Imported
/// files are shared between importers. An import of a file that was still
/// loading (an import cycle) is linked weakly and stays resolvable while
/// the root collection is alive.
///
/// # Example
///
/// ```
/// use lg::Templates;
/// use serde_json::json;
///
/// let templates = Templates::parse_str("# greet(name)\n- Hello, ${name}!");
/// let value = templates.evaluate("greet", json!({"name": "Ana"})).unwrap();
/// assert_eq!(value, json!("Hello, Ana!"));
/// ```
#[derive(Clone)]
pub struct Templates {
    pub(crate) items: Vec<Arc<Template>>,
    pub(crate) imports: Vec<Import>,
    /// Set once the whole import graph is loaded and checked.
    pub(crate) diagnostics: OnceLock<Vec<Diagnostic>>,
    /// Unaliased imports, merged into this collection's namespace.
    pub(crate) references: Vec<Arc<Templates>>,
    /// Aliased imports, reachable as `alias.name`.
    pub(crate) named_references: Vec<(String, Arc<Templates>)>,
    /// Imports closing a cycle back to a file that was still loading.
    pub(crate) cycle_references: Vec<(Option<String>, Weak<Templates>)>,
    /// Keeps the shared copy of a root collection alive for cycle links.
    pub(crate) anchor: Option<Arc<Templates>>,
    pub(crate) content: String,
    pub(crate) id: String,
    pub(crate) options: Vec<String>,
    pub(crate) resolver: Arc<dyn ImportResolver>,
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates")
            .field("id", &self.id)
            .field("templates", &self.names())
            .field("imports", &self.imports)
            .field("diagnostics", &self.diagnostics())
            .finish_non_exhaustive()
    }
}

impl Templates {
    // =========================================================================
    // Loading
    // =========================================================================

    /// Parse `content` identified by `id`, resolving imports with `resolver`.
    pub fn parse_text(content: &str, id: &str, resolver: Arc<dyn ImportResolver>) -> Templates {
        Loader::new(resolver).load_root(content, id)
    }

    /// Parse inline content. Imports resolve against the working directory.
    pub fn parse_str(content: &str) -> Templates {
        Self::parse_text(content, "", Arc::new(FileResolver))
    }

    /// Read and parse a file; imports resolve relative to it.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Templates, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let id = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(Self::parse_text(
            &content,
            &id.to_string_lossy(),
            Arc::new(FileResolver),
        ))
    }

    /// Fetch the root resource through `resolver` and parse it.
    pub fn parse_resource(
        id: &str,
        resolver: Arc<dyn ImportResolver>,
    ) -> Result<Templates, LoadError> {
        let resource = resolver.resolve("", id)?;
        Ok(Self::parse_text(&resource.content, &resource.id, resolver))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// A template defined in this file (imports are not searched).
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.items.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Names of the templates defined in this file, in source order.
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Diagnostics of this file only.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw `> !#` option lines.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn resolver(&self) -> &Arc<dyn ImportResolver> {
        &self.resolver
    }

    /// Collections imported without an alias, cycle links excluded.
    pub fn references(&self) -> &[Arc<Templates>] {
        &self.references
    }

    /// Collections imported with an alias, cycle links excluded.
    pub fn named_references(&self) -> &[(String, Arc<Templates>)] {
        &self.named_references
    }

    /// Unaliased imports followed by live unaliased cycle links.
    fn linked(&self) -> Vec<Arc<Templates>> {
        let mut linked = self.references.clone();
        linked.extend(
            self.cycle_references
                .iter()
                .filter(|(alias, _)| alias.is_none())
                .filter_map(|(_, link)| link.upgrade()),
        );
        linked
    }

    /// Aliased imports followed by live aliased cycle links.
    fn linked_named(&self) -> Vec<(String, Arc<Templates>)> {
        let mut linked = self.named_references.clone();
        linked.extend(
            self.cycle_references
                .iter()
                .filter_map(|(alias, link)| Some((alias.clone()?, link.upgrade()?))),
        );
        linked
    }

    /// Own templates followed by those of transitive unaliased imports.
    ///
    /// Names are unique: the first definition reached wins.
    pub fn all_templates(&self) -> Vec<Arc<Template>> {
        let mut visited = HashSet::new();
        let mut names = HashSet::new();
        let mut found = Vec::new();
        self.collect_templates(&mut visited, &mut names, &mut found);
        found
    }

    fn collect_templates(
        &self,
        visited: &mut HashSet<String>,
        names: &mut HashSet<String>,
        found: &mut Vec<Arc<Template>>,
    ) {
        if !visited.insert(self.id.clone()) {
            return;
        }
        for template in &self.items {
            if names.insert(template.name.clone()) {
                found.push(Arc::clone(template));
            }
        }
        for reference in self.linked() {
            reference.collect_templates(visited, names, found);
        }
    }

    /// Aliased imports reachable from this collection, including those
    /// declared by unaliased imports. The first alias reached wins.
    pub fn all_named_references(&self) -> Vec<(String, Arc<Templates>)> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        self.collect_named(&mut visited, &mut found);
        found
    }

    fn collect_named(
        &self,
        visited: &mut HashSet<String>,
        found: &mut Vec<(String, Arc<Templates>)>,
    ) {
        if !visited.insert(self.id.clone()) {
            return;
        }
        for (alias, reference) in self.linked_named() {
            if !found.iter().any(|(existing, _)| *existing == alias) {
                found.push((alias, reference));
            }
        }
        for reference in self.linked() {
            reference.collect_named(visited, found);
        }
    }

    /// Diagnostics of this file and of every file it imports.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        self.collect_diagnostics(&mut visited, &mut found);
        found
    }

    fn collect_diagnostics(&self, visited: &mut HashSet<String>, found: &mut Vec<Diagnostic>) {
        if !visited.insert(self.id.clone()) {
            return;
        }
        found.extend_from_slice(self.diagnostics());
        let named = self.linked_named().into_iter().map(|(_, reference)| reference);
        for reference in self.linked().into_iter().chain(named) {
            reference.collect_diagnostics(visited, found);
        }
    }

    /// Fails with every transitive error diagnostic, if there are any.
    pub fn check_errors(&self) -> Result<(), TemplateError> {
        let diagnostics: Vec<Diagnostic> = self
            .all_diagnostics()
            .into_iter()
            .filter(Diagnostic::is_error)
            .collect();
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::Diagnostics { diagnostics })
        }
    }

    /// The last value of option `key` (case-insensitive, without `@`).
    pub fn option(&self, key: &str) -> Option<String> {
        let key = key.trim_start_matches('@').to_lowercase();
        self.options
            .iter()
            .filter_map(|line| parse_option(line))
            .filter(|(name, _)| *name == key)
            .map(|(_, value)| value)
            .last()
    }

    /// Evaluation options declared in this file.
    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions::from_file_options(&self.options)
    }

    /// `@namespace`, or the file stem when the id is an absolute path.
    pub fn namespace(&self) -> Option<String> {
        if let Some(namespace) = self.option("namespace").filter(|n| !n.is_empty()) {
            return Some(namespace);
        }
        let path = Path::new(&self.id);
        if !path.is_absolute() {
            return None;
        }
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Template names listed in `@exports`.
    pub fn exports(&self) -> Vec<String> {
        self.option("exports")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate a template with the file's own options.
    pub fn evaluate(&self, name: &str, scope: impl Into<Scope>) -> Result<Value, TemplateError> {
        self.evaluate_with_options(name, scope, &EvaluationOptions::default())
    }

    /// Evaluate a template; set fields of `options` override file options.
    pub fn evaluate_with_options(
        &self,
        name: &str,
        scope: impl Into<Scope>,
        options: &EvaluationOptions,
    ) -> Result<Value, TemplateError> {
        Evaluator::new(self, options.clone())?.evaluate(name, &scope.into())
    }

    /// Evaluate a line of LG text (e.g. `"${greet()} and more"`) against
    /// this collection.
    pub fn evaluate_text(&self, text: &str, scope: impl Into<Scope>) -> Result<Value, TemplateError> {
        let parsed = parse_text(text).map_err(|error| TemplateError::Expression {
            context: "[inline]".to_string(),
            message: error.to_string(),
        })?;
        Evaluator::new(self, EvaluationOptions::default())?.evaluate_text(&parsed, &scope.into())
    }

    /// Every possible output of a template.
    pub fn expand(&self, name: &str, scope: impl Into<Scope>) -> Result<Vec<Value>, TemplateError> {
        self.expand_with_options(name, scope, &EvaluationOptions::default())
    }

    pub fn expand_with_options(
        &self,
        name: &str,
        scope: impl Into<Scope>,
        options: &EvaluationOptions,
    ) -> Result<Vec<Value>, TemplateError> {
        Expander::new(self, options.clone())?.expand(name, &scope.into())
    }

    /// Variables and templates a template depends on.
    pub fn analyze(&self, name: &str) -> Result<AnalyzerResult, TemplateError> {
        Analyzer::new(self)?.analyze(name)
    }

    /// Evaluate an exported template called through the global function
    /// table, binding `args` to its parameters.
    pub(crate) fn call_exported(
        &self,
        name: &str,
        args: Vec<Value>,
        scope: &Scope,
    ) -> Result<Value, TemplateError> {
        Evaluator::new(self, EvaluationOptions::default())?.call(name, args, scope)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// A new collection with `name` appended.
    ///
    /// `body` holds the body lines, e.g. `"- hi\n- hello"`.
    pub fn add_template(
        &self,
        name: &str,
        parameters: &[&str],
        body: &str,
    ) -> Result<Templates, TemplateError> {
        if self.get(name).is_some() {
            return Err(TemplateError::DuplicateTemplate {
                name: name.to_string(),
            });
        }
        let newline = line_ending(&self.content);
        let mut content = self.content.trim_end().to_string();
        if !content.is_empty() {
            content.push_str(newline);
            content.push_str(newline);
        }
        content.push_str(&format_template(name, parameters, body, newline));
        content.push_str(newline);
        Ok(self.reparse(&content))
    }

    /// A new collection with `name` replaced. Unchanged when `name` is not
    /// defined in this file.
    pub fn update_template(
        &self,
        name: &str,
        new_name: &str,
        parameters: &[&str],
        body: &str,
    ) -> Templates {
        let Some(template) = self.get(name) else {
            return self.clone();
        };
        let newline = line_ending(&self.content);
        let replacement = format_template(new_name, parameters, body, newline);
        let content = splice_lines(
            &self.content,
            template.range.start_line,
            template.range.end_line,
            Some(&replacement),
        );
        self.reparse(&content)
    }

    /// A new collection without `name`. Unchanged when `name` is not
    /// defined in this file.
    pub fn delete_template(&self, name: &str) -> Templates {
        let Some(template) = self.get(name) else {
            return self.clone();
        };
        let content = splice_lines(
            &self.content,
            template.range.start_line,
            template.range.end_line,
            None,
        );
        self.reparse(&content)
    }

    fn reparse(&self, content: &str) -> Templates {
        Loader::new(Arc::clone(&self.resolver)).load_root(content, &self.id)
    }
}

fn format_template(name: &str, parameters: &[&str], body: &str, newline: &str) -> String {
    let header = if parameters.is_empty() {
        format!("# {name}")
    } else {
        format!("# {name}({})", parameters.join(", "))
    };
    let mut text = header;
    for line in body.trim_end().lines() {
        text.push_str(newline);
        text.push_str(line);
    }
    text
}

/// The line ending used by `content`, `\n` unless it has `\r\n` lines.
fn line_ending(content: &str) -> &'static str {
    if content.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Replace (or remove) the 1-based inclusive line range `start..=end`.
///
/// Untouched lines keep their original endings. A removal also drops the
/// blank separator lines it would otherwise leave at either end of the file
/// or doubled up between templates.
fn splice_lines(content: &str, start: usize, end: usize, replacement: Option<&str>) -> String {
    let newline = line_ending(content);
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let is_blank = |line: &str| line.trim().is_empty();
    let mut start = start.saturating_sub(1).min(lines.len());
    let mut end = end.min(lines.len()).max(start);

    if replacement.is_none() {
        if start == 0 || is_blank(lines[start - 1]) {
            while end < lines.len() && is_blank(lines[end]) {
                end += 1;
            }
        }
        if end == lines.len() {
            while start > 0 && is_blank(lines[start - 1]) {
                start -= 1;
            }
        }
    }

    let mut result = lines[..start].concat();
    if let Some(replacement) = replacement {
        for line in replacement.lines() {
            result.push_str(line);
            result.push_str(newline);
        }
        if end == lines.len() && !content.ends_with('\n') {
            result.truncate(result.len() - newline.len());
        }
    }
    result.push_str(&lines[end..].concat());
    result
}
