//! Static dependency analysis of templates.

use lg_expression::{Expression, Value};
use serde::Serialize;

use crate::error::TemplateError;
use crate::interpreter::TemplateRegistry;
use crate::interpreter::functions::split_rerun;
use crate::parser::Template;
use crate::templates::Templates;

/// What a template depends on, in first-seen order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzerResult {
    /// Data paths such as `user.name`.
    pub variables: Vec<String>,
    /// Templates called directly or transitively.
    pub template_references: Vec<String>,
}

impl AnalyzerResult {
    fn add_variable(&mut self, path: String) {
        if !self.variables.contains(&path) {
            self.variables.push(path);
        }
    }

    fn add_reference(&mut self, name: &str) {
        if !self.template_references.iter().any(|n| n == name) {
            self.template_references.push(name.to_string());
        }
    }

    fn union(&mut self, other: AnalyzerResult) {
        for path in other.variables {
            self.add_variable(path);
        }
        for name in &other.template_references {
            self.add_reference(name);
        }
    }
}

/// Reports the variables and templates a template depends on.
///
/// Variables bound to the analyzed template's own parameters are not
/// reported. Called templates are analyzed recursively; a template already
/// being analyzed contributes nothing.
///
/// # Example
///
/// ```
/// use lg::{Analyzer, Templates};
///
/// let templates = Templates::parse_str(
///     "# greet(name)\n- Hi ${name}, ${place()}\n\n# place\n- ${user.city}",
/// );
/// let result = Analyzer::new(&templates).unwrap().analyze("greet").unwrap();
/// assert_eq!(result.variables, ["user.city"]);
/// assert_eq!(result.template_references, ["place"]);
/// ```
pub struct Analyzer {
    registry: TemplateRegistry,
    stack: Vec<String>,
}

impl Analyzer {
    pub fn new(templates: &Templates) -> Result<Self, TemplateError> {
        templates.check_errors()?;
        Ok(Self {
            registry: TemplateRegistry::new(templates),
            stack: Vec::new(),
        })
    }

    pub fn analyze(&mut self, name: &str) -> Result<AnalyzerResult, TemplateError> {
        let (base, _) = split_rerun(name);
        let template = self
            .registry
            .get(base)
            .cloned()
            .ok_or_else(|| TemplateError::not_found(base, &self.registry.names()))?;
        if self.stack.iter().any(|n| n == base) {
            return Ok(AnalyzerResult::default());
        }

        self.stack.push(base.to_string());
        let result = self.template(&template);
        self.stack.pop();
        result
    }

    fn template(&mut self, template: &Template) -> Result<AnalyzerResult, TemplateError> {
        let mut result = AnalyzerResult::default();
        let mut callees = Vec::new();
        for embedded in template.expressions() {
            self.visit(&embedded.expression, &mut result, &mut callees);
        }
        result
            .variables
            .retain(|path| !template.parameters.iter().any(|p| p == root(path)));

        for callee in callees {
            let nested = self.analyze(&callee)?;
            result.union(nested);
        }
        Ok(result)
    }

    fn visit(
        &self,
        expression: &Expression,
        result: &mut AnalyzerResult,
        callees: &mut Vec<String>,
    ) {
        if let Some(path) = expression.static_path() {
            result.add_variable(path);
            return;
        }
        match expression {
            Expression::Call { name, args } => {
                let (base, _) = split_rerun(name);
                let target = match (base, args.first()) {
                    ("template", Some(Expression::Literal(Value::String(target)))) => {
                        Some(target.as_str())
                    }
                    ("template", _) => None,
                    (base, _) => Some(base),
                };
                if let Some(target) = target.filter(|t| self.registry.contains(t)) {
                    result.add_reference(target);
                    if !callees.iter().any(|c| c == target) {
                        callees.push(target.to_string());
                    }
                }
                for arg in args {
                    self.visit(arg, result, callees);
                }
            }
            Expression::Member { target, .. } => self.visit(target, result, callees),
            Expression::Index { target, index } => {
                self.visit(target, result, callees);
                self.visit(index, result, callees);
            }
            Expression::Array(items) => {
                for item in items {
                    self.visit(item, result, callees);
                }
            }
            Expression::Object(entries) => {
                for (_, value) in entries {
                    self.visit(value, result, callees);
                }
            }
            Expression::Unary { operand, .. } => self.visit(operand, result, callees),
            Expression::Binary { left, right, .. } => {
                self.visit(left, result, callees);
                self.visit(right, result, callees);
            }
            Expression::Literal(_) | Expression::Variable(_) => {}
        }
    }
}

/// The root identifier of a dotted path.
fn root(path: &str) -> &str {
    path.split_once('.').map_or(path, |(root, _)| root)
}
