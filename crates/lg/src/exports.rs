//! `@exports`: publishing templates as global expression functions.

use std::sync::Arc;

use lg_expression::{ExpressionError, Scope, Value, register_function};
use tracing::debug;

use crate::diagnostic::{Diagnostic, Range};
use crate::templates::Templates;

/// Diagnostics for a file's `@exports` option.
pub(crate) fn check(templates: &Templates) -> Vec<Diagnostic> {
    let exports = templates.exports();
    if exports.is_empty() {
        return Vec::new();
    }

    let mut diagnostics = Vec::new();
    if templates.namespace().is_none() {
        diagnostics.push(Diagnostic::error(
            Range::line(1),
            "@exports requires a namespace: add '> !# @namespace = name'",
            templates.id(),
        ));
    }
    for name in exports {
        if templates.get(&name).is_none() {
            diagnostics.push(Diagnostic::error(
                Range::line(1),
                format!("exported template '{name}' is not defined in this file"),
                templates.id(),
            ));
        }
    }
    diagnostics
}

/// Register every exported template as `namespace.name`.
///
/// Registration replaces earlier functions with the same name, so loading
/// a file twice is harmless.
pub(crate) fn register(templates: &Arc<Templates>) {
    let Some(namespace) = templates.namespace() else {
        return;
    };
    for name in templates.exports() {
        if templates.get(&name).is_none() {
            continue;
        }
        let qualified = format!("{namespace}.{name}");
        debug!(function = %qualified, "registering exported template");

        let owner = Arc::clone(templates);
        let function_name = qualified.clone();
        register_function(
            qualified,
            Arc::new(move |args: &[Value], scope: &Scope| {
                owner
                    .call_exported(&name, args.to_vec(), scope)
                    .map_err(|error| ExpressionError::Function {
                        name: function_name.clone(),
                        message: error.to_string(),
                    })
            }),
        );
    }
}
