//! Name lookup over a collection's merged view.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::parser::Template;
use crate::templates::Templates;

/// Every template callable from a collection.
///
/// Unqualified names come from the collection and its unaliased imports;
/// aliased imports contribute `alias.name` entries.
#[derive(Debug, Default)]
pub(crate) struct TemplateRegistry {
    templates: BTreeMap<String, Arc<Template>>,
}

impl TemplateRegistry {
    pub(crate) fn new(templates: &Templates) -> Self {
        let mut registry = BTreeMap::new();
        for template in templates.all_templates() {
            registry.entry(template.name.clone()).or_insert(template);
        }
        for (alias, reference) in templates.all_named_references() {
            for template in reference.all_templates() {
                registry
                    .entry(format!("{alias}.{}", template.name))
                    .or_insert(template);
            }
        }
        Self {
            templates: registry,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Template>> {
        self.templates.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All callable names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}
