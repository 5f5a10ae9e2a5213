//! Import resolution: turning an import target into template text.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Raw template text together with its canonical identifier.
///
/// The identifier keys the per-load cache and is used to resolve the
/// resource's own relative imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub content: String,
}

impl Resource {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Errors produced by an [`ImportResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("resource '{target}' not found (imported from '{source_id}')")]
    NotFound { source_id: String, target: String },

    #[error("failed to read '{path}': {message}")]
    Io { path: PathBuf, message: String },
}

/// Resolves an import target relative to the importing resource.
pub trait ImportResolver: Send + Sync {
    /// Resolve `target` as imported from the resource identified by
    /// `source_id` (empty for the root of an inline collection).
    fn resolve(&self, source_id: &str, target: &str) -> Result<Resource, ResolveError>;
}

impl<F> ImportResolver for F
where
    F: Fn(&str, &str) -> Result<Resource, ResolveError> + Send + Sync,
{
    fn resolve(&self, source_id: &str, target: &str) -> Result<Resource, ResolveError> {
        self(source_id, target)
    }
}

/// Resolves imports from the file system, relative to the importing file.
///
/// Resource ids are canonical paths, so the same file reached through
/// different relative paths is parsed once.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResolver;

impl ImportResolver for FileResolver {
    fn resolve(&self, source_id: &str, target: &str) -> Result<Resource, ResolveError> {
        let path = resolve_path(source_id, target);
        let content = fs::read_to_string(&path).map_err(|error| match error.kind() {
            ErrorKind::NotFound => ResolveError::NotFound {
                source_id: source_id.to_string(),
                target: target.to_string(),
            },
            _ => ResolveError::Io {
                path: path.clone(),
                message: error.to_string(),
            },
        })?;
        let id = fs::canonicalize(&path).unwrap_or(path);
        Ok(Resource {
            id: id.to_string_lossy().into_owned(),
            content,
        })
    }
}

/// `target` joined onto the directory of `source_id`, unless absolute.
pub(crate) fn resolve_path(source_id: &str, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match Path::new(source_id).parent() {
        Some(directory) => directory.join(target),
        None => target.to_path_buf(),
    }
}

/// Resolves imports from an in-memory map of id to content.
///
/// Ids are `/`-separated; relative targets are tried against the importing
/// resource's directory first and then as given.
///
/// # Example
///
/// ```
/// use lg::{ImportResolver, MemoryResolver};
///
/// let resolver = MemoryResolver::new().with("shared/common.lg", "# hi\n- hello");
/// let resource = resolver.resolve("shared/root.lg", "common.lg").unwrap();
/// assert_eq!(resource.id, "shared/common.lg");
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    resources: BTreeMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, returning the resolver for chaining.
    pub fn with(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(id, content);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, content: impl Into<String>) {
        self.resources.insert(id.into(), content.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.resources.get(id).map(String::as_str)
    }

    /// All resource ids, in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

impl ImportResolver for MemoryResolver {
    fn resolve(&self, source_id: &str, target: &str) -> Result<Resource, ResolveError> {
        let relative = match source_id.rsplit_once('/') {
            Some((directory, _)) => normalize(&format!("{directory}/{target}")),
            None => normalize(target),
        };
        [relative, normalize(target)]
            .into_iter()
            .find_map(|id| {
                self.resources
                    .get(&id)
                    .map(|content| Resource::new(id.clone(), content.clone()))
            })
            .ok_or_else(|| ResolveError::NotFound {
                source_id: source_id.to_string(),
                target: target.to_string(),
            })
    }
}

/// Collapse `.` and `..` segments of a `/`-separated id.
fn normalize(id: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in id.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
