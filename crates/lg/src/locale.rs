//! Locale-aware resource selection.
//!
//! Resource ids follow `<name>[.<locale>].lg`. Resources are grouped by name
//! and, for a requested locale, the first non-empty entry of the fallback
//! chain (full tag, language subtag, language-neutral) is selected.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bon::Builder;
use icu_locale_core::Locale;
use lg_expression::{Scope, Value};
use tracing::debug;

use crate::error::LocaleError;
use crate::resolver::ImportResolver;
use crate::templates::Templates;

/// A resource id split into its base name and locale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceId {
    /// The id as given, e.g. `greet.en-us.lg`.
    pub id: String,
    /// The id without extension and locale, e.g. `greet`.
    pub name: String,
    /// Lower-cased locale tag, or empty for a language-neutral resource.
    pub locale: String,
}

impl ResourceId {
    /// Split `id` into name and locale.
    ///
    /// A trailing `.lg` is ignored. The last dotted suffix counts as a
    /// locale only if it is a well-formed locale tag with a two or three
    /// letter language.
    ///
    /// ```
    /// use lg::ResourceId;
    ///
    /// let id = ResourceId::parse("greet.en-US.lg");
    /// assert_eq!(id.name, "greet");
    /// assert_eq!(id.locale, "en-us");
    ///
    /// assert_eq!(ResourceId::parse("greet.lg").locale, "");
    /// ```
    pub fn parse(id: &str) -> ResourceId {
        let stem = strip_extension(id);
        let (name, locale) = match stem.rsplit_once('.') {
            Some((name, suffix)) if !name.is_empty() && is_locale(suffix) => {
                (name, suffix.replace('_', "-").to_lowercase())
            }
            _ => (stem, String::new()),
        };
        ResourceId {
            id: id.to_string(),
            name: name.to_string(),
            locale,
        }
    }
}

fn strip_extension(id: &str) -> &str {
    let split = id.len().saturating_sub(3);
    match (id.get(..split), id.get(split..)) {
        (Some(stem), Some(extension)) if extension.eq_ignore_ascii_case(".lg") => stem,
        _ => id,
    }
}

/// Whether `tag` names a locale, such as `en`, `en-US` or `zh_Hant`.
pub fn is_locale(tag: &str) -> bool {
    let Ok(locale) = tag.replace('_', "-").parse::<Locale>() else {
        return false;
    };
    let language = locale.id.language.as_str();
    (2..=3).contains(&language.len()) && language != "und"
}

/// Group resources by name, then by locale.
pub fn group_by_locale<'a>(
    ids: impl IntoIterator<Item = &'a ResourceId>,
) -> BTreeMap<String, BTreeMap<String, Vec<ResourceId>>> {
    let mut groups: BTreeMap<String, BTreeMap<String, Vec<ResourceId>>> = BTreeMap::new();
    for id in ids {
        groups
            .entry(id.name.clone())
            .or_default()
            .entry(id.locale.clone())
            .or_default()
            .push(id.clone());
    }
    groups
}

/// Locales to try for `locale`, most specific first, ending with the
/// language-neutral `""`.
///
/// ```
/// use lg::fallback_chain;
///
/// assert_eq!(fallback_chain("en-US"), ["en-us", "en", ""]);
/// assert_eq!(fallback_chain(""), [""]);
/// ```
pub fn fallback_chain(locale: &str) -> Vec<String> {
    let locale = locale.trim().replace('_', "-").to_lowercase();
    let mut chain = Vec::new();
    if !locale.is_empty() {
        chain.push(locale.clone());
        if let Some((language, _)) = locale.split_once('-') {
            chain.push(language.to_string());
        }
    }
    chain.push(String::new());
    chain
}

/// The resources of the first locale in the fallback chain of `locale`
/// that has any.
pub fn select<'a>(
    locales: &'a BTreeMap<String, Vec<ResourceId>>,
    name: &str,
    locale: &str,
) -> Result<&'a [ResourceId], LocaleError> {
    fallback_chain(locale)
        .iter()
        .find_map(|candidate| {
            locales
                .get(candidate)
                .filter(|resources| !resources.is_empty())
        })
        .map(Vec::as_slice)
        .ok_or_else(|| LocaleError::NoResource {
            name: name.to_string(),
            locale: locale.to_string(),
        })
}

/// Generates text from a set of localized template files.
///
/// Each selected file is parsed on first use and cached.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use lg::{LanguageGenerator, MemoryResolver, ResourceId};
/// use serde_json::json;
///
/// let resolver = MemoryResolver::new()
///     .with("greet.lg", "# hi\n- Hello")
///     .with("greet.fr.lg", "# hi\n- Bonjour");
/// let generator = LanguageGenerator::builder()
///     .default_locale("fr-FR")
///     .resolver(Arc::new(resolver))
///     .resources(vec![ResourceId::parse("greet.lg"), ResourceId::parse("greet.fr.lg")])
///     .build();
///
/// let value = generator.generate("greet", "hi", None, json!({})).unwrap();
/// assert_eq!(value, json!("Bonjour"));
/// ```
#[derive(Builder)]
#[builder(on(String, into))]
pub struct LanguageGenerator {
    /// Locale used when `generate` is called without one.
    #[builder(default)]
    default_locale: String,

    resolver: Arc<dyn ImportResolver>,

    #[builder(default)]
    resources: Vec<ResourceId>,

    /// Parsed collections keyed by resource id.
    #[builder(skip)]
    cache: RefCell<HashMap<String, Arc<Templates>>>,
}

impl LanguageGenerator {
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    /// Register a resource by id, e.g. `greet.en.lg`.
    pub fn add_resource(&mut self, id: &str) {
        self.resources.push(ResourceId::parse(id));
    }

    /// The resource used for `name` in `locale` (or the default locale).
    pub fn resolve(&self, name: &str, locale: Option<&str>) -> Result<ResourceId, LocaleError> {
        let locale = locale.unwrap_or(&self.default_locale);
        let groups = group_by_locale(&self.resources);
        let empty = BTreeMap::new();
        let locales = groups.get(name).unwrap_or(&empty);
        let selected = select(locales, name, locale)?;
        selected
            .first()
            .cloned()
            .ok_or_else(|| LocaleError::NoResource {
                name: name.to_string(),
                locale: locale.to_string(),
            })
    }

    /// The parsed collection for `resource`.
    pub fn templates_for(&self, resource: &ResourceId) -> Result<Arc<Templates>, LocaleError> {
        if let Some(templates) = self.cache.borrow().get(&resource.id) {
            debug!(resource = %resource.id, "template cache hit");
            return Ok(Arc::clone(templates));
        }
        let templates = Arc::new(Templates::parse_resource(
            &resource.id,
            Arc::clone(&self.resolver),
        )?);
        self.cache
            .borrow_mut()
            .insert(resource.id.clone(), Arc::clone(&templates));
        Ok(templates)
    }

    /// Evaluate `template` from the resource `name` selected for `locale`.
    pub fn generate(
        &self,
        name: &str,
        template: &str,
        locale: Option<&str>,
        scope: impl Into<Scope>,
    ) -> Result<Value, LocaleError> {
        let resource = self.resolve(name, locale)?;
        debug!(resource = %resource.id, template, "generating");
        let templates = self.templates_for(&resource)?;
        Ok(templates.evaluate(template, scope)?)
    }
}
