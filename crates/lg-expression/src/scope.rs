//! Layered data scope visible to expressions.

use std::sync::Arc;

use serde_json::{Map, Value};

/// A layered key/value view of runtime data.
///
/// Lookups consult the local layer first and fall back to the global layer.
/// Binding template parameters creates a new local layer over the *global*
/// layer only, so a parameterized template never sees its caller's locals.
///
/// Both layers are reference counted: cloning a scope is cheap.
///
/// # Example
///
/// ```
/// use lg_expression::Scope;
/// use serde_json::{json, Map};
///
/// let scope = Scope::new(json!({"user": "Ana", "city": "Lisbon"}));
/// let mut params = Map::new();
/// params.insert("user".to_string(), json!("Bo"));
/// let child = scope.with_locals(params);
///
/// assert_eq!(child.get("user"), Some(&json!("Bo")));
/// assert_eq!(child.get("city"), Some(&json!("Lisbon")));
/// ```
#[derive(Debug, Clone)]
pub struct Scope {
    global: Arc<Value>,
    local: Option<Arc<Value>>,
}

impl Default for Scope {
    fn default() -> Self {
        Scope::empty()
    }
}

impl From<Value> for Scope {
    fn from(value: Value) -> Self {
        Scope::new(value)
    }
}

impl Scope {
    /// Create a scope whose global layer is `data`.
    pub fn new(data: Value) -> Self {
        Self {
            global: Arc::new(data),
            local: None,
        }
    }

    /// Create a scope with no data.
    pub fn empty() -> Self {
        Scope::new(Value::Object(Map::new()))
    }

    /// Create a child scope binding `locals` over this scope's global layer.
    pub fn with_locals(&self, locals: Map<String, Value>) -> Self {
        Self {
            global: Arc::clone(&self.global),
            local: Some(Arc::new(Value::Object(locals))),
        }
    }

    /// Look up a root identifier, local layer first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.local
            .as_deref()
            .and_then(|local| local.get(name))
            .or_else(|| self.global.get(name))
    }

    /// Look up a dotted path such as `user.address.city`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// The global (inherited) layer.
    pub fn global(&self) -> &Value {
        &self.global
    }

    /// The local layer, if parameters are bound.
    pub fn local(&self) -> Option<&Value> {
        self.local.as_deref()
    }

    /// A stable string identifying this scope's bindings.
    ///
    /// Two scopes with the same local bindings over the same global layer
    /// produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let global = Arc::as_ptr(&self.global) as usize;
        match &self.local {
            Some(local) => format!("{global:x}:{local}"),
            None => format!("{global:x}"),
        }
    }
}
