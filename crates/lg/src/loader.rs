//! Recursive import resolution with a per-load cache.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use tracing::{debug, warn};

use crate::checker;
use crate::diagnostic::Diagnostic;
use crate::exports;
use crate::parser::parse_file;
use crate::resolver::{ImportResolver, Resource};
use crate::templates::Templates;

/// Loads a root file and everything it imports.
///
/// Each resolved id is parsed once per load and shared between importers.
/// An import of a file that is still being loaded (an import cycle) becomes
/// a weak link to that file's collection. Static checks and export
/// registration wait until the whole graph is built, so every link
/// resolves when they run.
pub(crate) struct Loader {
    resolver: Arc<dyn ImportResolver>,
    cache: HashMap<String, Arc<Templates>>,
    in_progress: Vec<(String, Weak<Templates>)>,
    /// Parse and import diagnostics by id, until the static checks run.
    pending: HashMap<String, Vec<Diagnostic>>,
    /// Every collection built so far, imports before their importers.
    loaded: Vec<Arc<Templates>>,
}

impl Loader {
    pub(crate) fn new(resolver: Arc<dyn ImportResolver>) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
            in_progress: Vec::new(),
            pending: HashMap::new(),
            loaded: Vec::new(),
        }
    }

    pub(crate) fn load_root(mut self, content: &str, id: &str) -> Templates {
        let root = Arc::new_cyclic(|link| self.load(content, id, link));
        self.loaded.push(Arc::clone(&root));
        self.finish();

        let mut templates = (*root).clone();
        if Arc::weak_count(&root) > 0 {
            debug!(id, "root collection is the target of an import cycle");
            templates.anchor = Some(root);
        }
        templates
    }

    fn load(&mut self, content: &str, id: &str, link: &Weak<Templates>) -> Templates {
        debug!(id, "parsing templates");
        self.in_progress.push((id.to_string(), Weak::clone(link)));

        let parsed = parse_file(content, id);
        let mut diagnostics = parsed.diagnostics;
        let mut references = Vec::new();
        let mut named_references = Vec::new();
        let mut cycle_references = Vec::new();
        for import in &parsed.imports {
            let resource = match self.resolver.resolve(id, &import.target) {
                Ok(resource) => resource,
                Err(error) => {
                    warn!(%error, source = id, "failed to resolve import");
                    diagnostics.push(Diagnostic::error(
                        import.range,
                        format!("failed to import '{}': {error}", import.target),
                        id,
                    ));
                    continue;
                }
            };
            let loading = self
                .in_progress
                .iter()
                .find(|(loading, _)| *loading == resource.id);
            if let Some((_, target)) = loading {
                debug!(resource = %resource.id, "linking import cycle");
                cycle_references.push((import.alias.clone(), Weak::clone(target)));
                continue;
            }
            let child = self.child(resource);
            match &import.alias {
                Some(alias) => named_references.push((alias.clone(), child)),
                None => references.push(child),
            }
        }
        self.in_progress.pop();
        self.pending.insert(id.to_string(), diagnostics);

        Templates {
            items: parsed.templates.into_iter().map(Arc::new).collect(),
            imports: parsed.imports,
            diagnostics: OnceLock::new(),
            references,
            named_references,
            cycle_references,
            anchor: None,
            content: content.to_string(),
            id: id.to_string(),
            options: parsed.options,
            resolver: Arc::clone(&self.resolver),
        }
    }

    fn child(&mut self, resource: Resource) -> Arc<Templates> {
        if let Some(cached) = self.cache.get(&resource.id) {
            debug!(resource = %resource.id, "import cache hit");
            return Arc::clone(cached);
        }
        let templates = Arc::new_cyclic(|link| self.load(&resource.content, &resource.id, link));
        self.loaded.push(Arc::clone(&templates));
        self.cache.insert(resource.id, Arc::clone(&templates));
        templates
    }

    /// Settle the diagnostics of every loaded collection and publish its
    /// exports.
    fn finish(&mut self) {
        for templates in &self.loaded {
            let mut diagnostics = self.pending.remove(&templates.id).unwrap_or_default();
            diagnostics.extend(exports::check(templates));
            diagnostics.extend(checker::check(templates));
            templates.diagnostics.get_or_init(|| diagnostics);
            exports::register(templates);
        }
    }
}
