//! Static checks over parsed templates.
//!
//! Runs on the merged view of a collection after its imports are resolved,
//! without evaluating anything: calls to known templates must pass either
//! no arguments or exactly one per parameter, and `template('name', ...)`
//! with a literal name must name an existing template.

use lg_expression::{Expression, Value};

use crate::diagnostic::Diagnostic;
use crate::interpreter::{TemplateRegistry, split_rerun};
use crate::parser::Template;
use crate::templates::Templates;

/// Check every template defined in `templates` (not its imports).
pub(crate) fn check(templates: &Templates) -> Vec<Diagnostic> {
    let registry = TemplateRegistry::new(templates);
    let mut diagnostics = Vec::new();
    for template in &templates.items {
        for embedded in template.expressions() {
            embedded.expression.walk(&mut |expression| {
                let Expression::Call { name, args } = expression else {
                    return;
                };
                if let Some(message) = check_call(&registry, name, args) {
                    diagnostics.push(Diagnostic::error(
                        template.range,
                        format!("in template '{}': {message}", template.name),
                        &template.source,
                    ));
                }
            });
        }
    }
    diagnostics
}

fn check_call(registry: &TemplateRegistry, name: &str, args: &[Expression]) -> Option<String> {
    let (base, _) = split_rerun(name);
    if base == "template" {
        let (first, rest) = args.split_first()?;
        let Expression::Literal(Value::String(target)) = first else {
            return None;
        };
        return match registry.get(target) {
            None => Some(format!("template('{target}') refers to an unknown template")),
            Some(template) => argument_mismatch(template, rest.len()),
        };
    }
    argument_mismatch(registry.get(base)?, args.len())
}

fn argument_mismatch(template: &Template, count: usize) -> Option<String> {
    (count != 0 && count != template.parameters.len()).then(|| {
        format!(
            "template '{}' expects {} arguments, got {count}",
            template.name,
            template.parameters.len()
        )
    })
}
