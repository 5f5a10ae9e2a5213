//! Template-aware expression functions and argument binding.

use std::fs;

use lg_expression::{ExpressionError, Scope, Value};
use serde_json::Map;

use crate::error::TemplateError;
use crate::parser::Template;
use crate::resolver::resolve_path;

/// Reserved key naming a structured value's type.
pub(crate) const LG_TYPE: &str = "lgType";

const TEMPLATE_FUNCTIONS: [&str; 4] = ["template", "isTemplate", "fromFile", "ActivityAttachment"];

pub(crate) fn is_template_function(name: &str) -> bool {
    TEMPLATE_FUNCTIONS.contains(&name)
}

/// Strip a trailing `!`, which forces re-evaluation.
pub(crate) fn split_rerun(name: &str) -> (&str, bool) {
    match name.strip_suffix('!') {
        Some(base) => (base, true),
        None => (name, false),
    }
}

/// Split `template(name, args...)` arguments into the name and the rest.
pub(crate) fn template_target(args: &[Value]) -> Result<(&str, &[Value]), TemplateError> {
    match args.split_first() {
        Some((Value::String(name), rest)) => Ok((name, rest)),
        Some((other, _)) => Err(ExpressionError::Type {
            message: format!("template() expects a template name, got {other}"),
        }
        .into()),
        None => Err(ExpressionError::Arity {
            name: "template".to_string(),
            expected: "at least 1".to_string(),
            got: 0,
        }
        .into()),
    }
}

/// `ActivityAttachment(content, type)`.
pub(crate) fn activity_attachment(args: &[Value]) -> Result<Value, TemplateError> {
    let [content, Value::String(content_type)] = args else {
        return Err(ExpressionError::Arity {
            name: "ActivityAttachment".to_string(),
            expected: "2 (content, type)".to_string(),
            got: args.len(),
        }
        .into());
    };
    let mut attachment = Map::new();
    attachment.insert(LG_TYPE.to_string(), Value::from("attachment"));
    attachment.insert("contenttype".to_string(), Value::from(content_type.as_str()));
    attachment.insert("content".to_string(), content.clone());
    Ok(Value::Object(attachment))
}

/// Read a file named relative to the directory of `source`.
pub(crate) fn read_file(path: &str, source: &str) -> Result<String, TemplateError> {
    let resolved = resolve_path(source, path);
    fs::read_to_string(&resolved).map_err(|error| TemplateError::File {
        path: resolved,
        message: error.to_string(),
    })
}

/// The scope a call to `template` runs in.
///
/// With no arguments the callee sees the caller's scope unchanged.
/// Otherwise each parameter is bound over the caller's global layer.
pub(crate) fn bind_arguments(
    template: &Template,
    args: Vec<Value>,
    scope: &Scope,
) -> Result<Scope, TemplateError> {
    if args.is_empty() {
        return Ok(scope.clone());
    }
    if args.len() != template.parameters.len() {
        return Err(TemplateError::ArgumentCount {
            template: template.name.clone(),
            expected: template.parameters.len(),
            got: args.len(),
        });
    }
    let locals: Map<String, Value> = template.parameters.iter().cloned().zip(args).collect();
    Ok(scope.with_locals(locals))
}

/// Merge a `${expr}` result into a structured value.
///
/// Only objects of the same type (case-insensitive) contribute, arrays are
/// merged element by element, and existing keys are never overwritten.
pub(crate) fn merge_structure(object: &mut Map<String, Value>, type_name: &str, value: Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                merge_structure(object, type_name, item);
            }
        }
        Value::Object(other) => {
            let same_type = other
                .get(LG_TYPE)
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case(type_name));
            if !same_type {
                return;
            }
            for (key, value) in other {
                if key != LG_TYPE {
                    object.entry(key).or_insert(value);
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

/// Collapse a property's values: one value stays scalar, more become an array.
pub(crate) fn property_value(values: Vec<Value>) -> Value {
    match <[Value; 1]>::try_from(values) {
        Ok([single]) => single,
        Err(values) => Value::Array(values),
    }
}
