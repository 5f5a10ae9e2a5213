//! Integration tests for locale-aware resource selection

use std::collections::BTreeMap;
use std::sync::Arc;

use lg::{
    LanguageGenerator, LocaleError, MemoryResolver, ResourceId, TemplateError, fallback_chain,
    group_by_locale, is_locale, select,
};
use serde_json::json;

fn ids(names: &[&str]) -> Vec<ResourceId> {
    names.iter().map(|name| ResourceId::parse(name)).collect()
}

// =============================================================================
// Resource Ids
// =============================================================================

#[test]
fn test_parse_resource_ids() {
    let id = ResourceId::parse("dialogs/greet.en-US.lg");
    assert_eq!(id.id, "dialogs/greet.en-US.lg");
    assert_eq!(id.name, "dialogs/greet");
    assert_eq!(id.locale, "en-us");

    assert_eq!(ResourceId::parse("greet.fr.LG").locale, "fr");
    assert_eq!(ResourceId::parse("greet.zh_Hant.lg").locale, "zh-hant");
    assert_eq!(ResourceId::parse("greet").name, "greet");
}

#[test]
fn test_non_locale_suffix_stays_in_name() {
    let id = ResourceId::parse("greet.v2.lg");
    assert_eq!(id.name, "greet.v2");
    assert_eq!(id.locale, "");
}

#[test]
fn test_is_locale() {
    assert!(is_locale("en"));
    assert!(is_locale("en-US"));
    assert!(is_locale("pt_BR"));
    assert!(!is_locale("v2"));
    assert!(!is_locale("und"));
    assert!(!is_locale(""));
    assert!(!is_locale("toolongname"));
}

#[test]
fn test_fallback_chain() {
    assert_eq!(fallback_chain("en-US"), vec!["en-us", "en", ""]);
    assert_eq!(fallback_chain("fr"), vec!["fr", ""]);
    assert_eq!(fallback_chain("zh_Hant_TW"), vec!["zh-hant-tw", "zh", ""]);
    assert_eq!(fallback_chain(""), vec![""]);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_group_by_locale() {
    let resources = ids(&["greet.lg", "greet.en.lg", "farewell.fr.lg"]);
    let groups = group_by_locale(&resources);
    let names: Vec<&String> = groups.keys().collect();
    assert_eq!(names, vec!["farewell", "greet"]);
    let locales: Vec<&String> = groups["greet"].keys().collect();
    assert_eq!(locales, vec!["", "en"]);
}

#[test]
fn test_select_follows_fallback_chain() {
    let resources = ids(&["greet.lg", "greet.en.lg", "greet.en-us.lg"]);
    let groups = group_by_locale(&resources);
    let locales = &groups["greet"];

    let pick = |locale: &str| select(locales, "greet", locale).unwrap()[0].id.clone();
    assert_eq!(pick("en-US"), "greet.en-us.lg");
    assert_eq!(pick("en-GB"), "greet.en.lg");
    assert_eq!(pick("fr"), "greet.lg");
    assert_eq!(pick(""), "greet.lg");
}

#[test]
fn test_select_without_match() {
    let resources = ids(&["greet.en.lg"]);
    let groups = group_by_locale(&resources);
    let error = select(&groups["greet"], "greet", "fr").unwrap_err();
    assert!(matches!(error, LocaleError::NoResource { .. }));
    assert!(select(&BTreeMap::new(), "greet", "en").is_err());
}

// =============================================================================
// Language Generator
// =============================================================================

fn generator() -> LanguageGenerator {
    let resolver = MemoryResolver::new()
        .with("greet.lg", "# hi(name)\n- Hello ${name}")
        .with("greet.fr.lg", "# hi(name)\n- Bonjour ${name}")
        .with("greet.fr-ca.lg", "# hi(name)\n- Allô ${name}");
    LanguageGenerator::builder()
        .default_locale("en-US")
        .resolver(Arc::new(resolver))
        .resources(ids(&["greet.lg", "greet.fr.lg", "greet.fr-ca.lg"]))
        .build()
}

#[test]
fn test_generate_by_locale() {
    let generator = generator();
    let scope = json!({"name": "Ana"});
    assert_eq!(
        generator.generate("greet", "hi", None, scope.clone()).unwrap(),
        json!("Hello Ana")
    );
    assert_eq!(
        generator.generate("greet", "hi", Some("fr-FR"), scope.clone()).unwrap(),
        json!("Bonjour Ana")
    );
    assert_eq!(
        generator.generate("greet", "hi", Some("fr-CA"), scope).unwrap(),
        json!("Allô Ana")
    );
}

#[test]
fn test_templates_are_cached() {
    let generator = generator();
    let resource = generator.resolve("greet", Some("fr")).unwrap();
    let first = generator.templates_for(&resource).unwrap();
    let second = generator.templates_for(&resource).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_add_resource() {
    let resolver = MemoryResolver::new().with("bye.de.lg", "# t\n- Tschüss");
    let mut generator = LanguageGenerator::builder()
        .resolver(Arc::new(resolver))
        .build();
    assert!(generator.resolve("bye", Some("de")).is_err());
    generator.add_resource("bye.de.lg");
    assert_eq!(generator.resources().len(), 1);
    assert_eq!(
        generator.generate("bye", "t", Some("de-AT"), json!({})).unwrap(),
        json!("Tschüss")
    );
}

#[test]
fn test_generate_errors() {
    let generator = generator();
    assert!(matches!(
        generator.generate("missing", "hi", None, json!({})),
        Err(LocaleError::NoResource { .. })
    ));
    assert!(matches!(
        generator.generate("greet", "nope", None, json!({})),
        Err(LocaleError::Templates(TemplateError::TemplateNotFound { .. }))
    ));
}
