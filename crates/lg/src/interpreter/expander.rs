//! Template expansion: every value a template can produce.

use lg_expression::{Expression, Scope, Value, to_text};
use serde_json::Map;

use crate::error::TemplateError;
use crate::interpreter::Evaluator;
use crate::interpreter::context::Site;
use crate::interpreter::functions::{
    LG_TYPE, bind_arguments, merge_structure, property_value, split_rerun, template_target,
};
use crate::options::EvaluationOptions;
use crate::parser::{Embedded, Segment, Structure, StructureLine, Template, TemplateBody, Text};
use crate::templates::Templates;

/// Enumerates the outputs of a template.
///
/// Every alternative text is produced, every truthy condition contributes
/// (ELSE only when none did), and every matching CASE contributes (DEFAULT
/// only when none did). Every template call inside a `${...}`, nested in
/// arguments or operators included, stands for each output of the callee
/// in turn; an expression without template calls is evaluated once. Pieces
/// of a line combine as a cartesian product. Calls are never memoized.
///
/// # Example
///
/// ```
/// use lg::{EvaluationOptions, Expander, Scope, Templates};
///
/// let templates = Templates::parse_str("# a\n- x\n- y\n\n# b\n- ${a()}${a()}");
/// let mut expander = Expander::new(&templates, EvaluationOptions::default()).unwrap();
/// let values = expander.expand("b", &Scope::empty()).unwrap();
/// assert_eq!(values, ["xx", "xy", "yx", "yy"]);
/// ```
pub struct Expander<'a> {
    evaluator: Evaluator<'a>,
}

impl<'a> Expander<'a> {
    pub fn new(templates: &'a Templates, options: EvaluationOptions) -> Result<Self, TemplateError> {
        let mut evaluator = Evaluator::new(templates, options)?;
        evaluator.disable_memo();
        Ok(Self { evaluator })
    }

    pub fn expand(&mut self, name: &str, scope: &Scope) -> Result<Vec<Value>, TemplateError> {
        let values = self.expand_template(name, scope)?;
        Ok(values
            .into_iter()
            .map(|value| self.evaluator.apply_line_breaks(value))
            .collect())
    }

    fn expand_template(&mut self, name: &str, scope: &Scope) -> Result<Vec<Value>, TemplateError> {
        let (base, _) = split_rerun(name);
        let template = self.evaluator.lookup(base)?;
        self.evaluator.enter(base)?;
        let result = self.body(&template, scope);
        self.evaluator.leave();
        result
    }

    fn expand_call(
        &mut self,
        name: &str,
        args: Vec<Value>,
        scope: &Scope,
    ) -> Result<Vec<Value>, TemplateError> {
        let template = self.evaluator.lookup(split_rerun(name).0)?;
        let scope = bind_arguments(&template, args, scope)?;
        self.expand_template(name, &scope)
    }

    fn body(&mut self, template: &Template, scope: &Scope) -> Result<Vec<Value>, TemplateError> {
        match &template.body {
            TemplateBody::Normal(candidates) => self.candidates(candidates, scope),
            TemplateBody::Conditional(branches) => {
                let mut values = Vec::new();
                let mut matched = false;
                for branch in branches {
                    match &branch.condition {
                        Some(condition) => {
                            let site = Site::Condition(&condition.source);
                            if self.evaluator.condition(condition, scope, site)? {
                                matched = true;
                                values.extend(self.candidates(&branch.body, scope)?);
                            }
                        }
                        None if !matched => values.extend(self.candidates(&branch.body, scope)?),
                        None => {}
                    }
                }
                Ok(values)
            }
            TemplateBody::Switch(switch) => {
                let expression = &switch.expression;
                let site = Site::Switch(&expression.source);
                let key = to_text(&self.evaluator.expression(expression, scope, site)?);

                let mut values = Vec::new();
                let mut matched = false;
                for case in &switch.cases {
                    match &case.value {
                        Some(value) => {
                            let site = Site::Case(&value.source);
                            if to_text(&self.evaluator.expression(value, scope, site)?) == key {
                                matched = true;
                                values.extend(self.candidates(&case.body, scope)?);
                            }
                        }
                        None if !matched => values.extend(self.candidates(&case.body, scope)?),
                        None => {}
                    }
                }
                Ok(values)
            }
            TemplateBody::Structured(structure) => self.structure(structure, scope),
        }
    }

    fn candidates(&mut self, candidates: &[Text], scope: &Scope) -> Result<Vec<Value>, TemplateError> {
        let mut values = Vec::new();
        for text in candidates {
            values.extend(self.text(text, scope, Site::Text)?);
        }
        Ok(values)
    }

    fn text(&mut self, text: &Text, scope: &Scope, site: Site<'_>) -> Result<Vec<Value>, TemplateError> {
        if let Some(embedded) = text.single_expression() {
            return self.expression(embedded, scope, site);
        }
        let mut outputs = vec![String::new()];
        for segment in &text.segments {
            let pieces: Vec<String> = match segment {
                Segment::Literal(literal) => vec![literal.clone()],
                Segment::Expression(embedded) => self
                    .expression(embedded, scope, site)?
                    .iter()
                    .map(to_text)
                    .collect(),
            };
            outputs = product(&outputs, &pieces, |prefix, piece| format!("{prefix}{piece}"));
        }
        Ok(outputs.into_iter().map(Value::String).collect())
    }

    fn structure(&mut self, structure: &Structure, scope: &Scope) -> Result<Vec<Value>, TemplateError> {
        let mut seed = Map::new();
        seed.insert(LG_TYPE.to_string(), Value::from(structure.type_name.as_str()));
        let mut objects = vec![seed];

        for line in &structure.lines {
            match line {
                StructureLine::Property { key, values } => {
                    let mut combinations: Vec<Vec<Value>> = vec![Vec::new()];
                    for value in values {
                        let alternatives = self.text(value, scope, Site::Property(key))?;
                        combinations = product(&combinations, &alternatives, |prefix, value| {
                            let mut next = prefix.clone();
                            next.push(value.clone());
                            next
                        });
                    }
                    let values: Vec<Value> = combinations.into_iter().map(property_value).collect();
                    objects = product(&objects, &values, |object, value| {
                        let mut next = object.clone();
                        next.entry(key.clone()).or_insert_with(|| value.clone());
                        next
                    });
                }
                StructureLine::Merge(embedded) => {
                    let alternatives = self.expression(embedded, scope, Site::Text)?;
                    objects = product(&objects, &alternatives, |object, value| {
                        let mut next = object.clone();
                        merge_structure(&mut next, &structure.type_name, value.clone());
                        next
                    });
                }
            }
        }
        Ok(objects.into_iter().map(Value::Object).collect())
    }

    /// All values of an embedded expression, one per combination of the
    /// outputs of the template calls it contains.
    fn expression(
        &mut self,
        embedded: &Embedded,
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Vec<Value>, TemplateError> {
        if !self.calls_template(&embedded.expression) {
            return Ok(vec![self.evaluator.expression(embedded, scope, site)?]);
        }
        let variants = self.variants(&embedded.expression, scope, site)?;
        variants
            .into_iter()
            .map(|expression| {
                let variant = Embedded {
                    source: embedded.source.clone(),
                    expression,
                };
                self.evaluator.expression(&variant, scope, site)
            })
            .collect()
    }

    fn is_template_call(&self, name: &str) -> bool {
        split_rerun(name).0 == "template" || self.evaluator.has_template(name)
    }

    fn calls_template(&self, expression: &Expression) -> bool {
        let mut found = false;
        expression.walk(&mut |node| {
            if let Expression::Call { name, .. } = node {
                found |= self.is_template_call(name);
            }
        });
        found
    }

    /// Copies of `expression` with every template call replaced by a literal
    /// output of the callee, one copy per combination of outputs.
    fn variants(
        &mut self,
        expression: &Expression,
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Vec<Expression>, TemplateError> {
        if !self.calls_template(expression) {
            return Ok(vec![expression.clone()]);
        }
        let variants = match expression {
            Expression::Call { name, args } => {
                let combinations = self.combinations(args, scope, site)?;
                if !self.is_template_call(name) {
                    return Ok(combinations
                        .into_iter()
                        .map(|args| Expression::Call {
                            name: name.clone(),
                            args,
                        })
                        .collect());
                }
                let mut outputs = Vec::new();
                for args in combinations {
                    outputs.extend(self.expand_template_call(name, &args, scope, site)?);
                }
                outputs.into_iter().map(Expression::Literal).collect()
            }
            Expression::Member { target, property } => self
                .variants(target, scope, site)?
                .into_iter()
                .map(|target| Expression::Member {
                    target: Box::new(target),
                    property: property.clone(),
                })
                .collect(),
            Expression::Index { target, index } => {
                let targets = self.variants(target, scope, site)?;
                let indexes = self.variants(index, scope, site)?;
                product(&targets, &indexes, |target, index| Expression::Index {
                    target: Box::new(target.clone()),
                    index: Box::new(index.clone()),
                })
            }
            Expression::Array(items) => self
                .combinations(items, scope, site)?
                .into_iter()
                .map(Expression::Array)
                .collect(),
            Expression::Object(entries) => {
                let values: Vec<Expression> =
                    entries.iter().map(|(_, value)| value.clone()).collect();
                self.combinations(&values, scope, site)?
                    .into_iter()
                    .map(|values| {
                        let keys = entries.iter().map(|(key, _)| key.clone());
                        Expression::Object(keys.zip(values).collect())
                    })
                    .collect()
            }
            Expression::Unary { op, operand } => self
                .variants(operand, scope, site)?
                .into_iter()
                .map(|operand| Expression::Unary {
                    op: *op,
                    operand: Box::new(operand),
                })
                .collect(),
            Expression::Binary { op, left, right } => {
                let lefts = self.variants(left, scope, site)?;
                let rights = self.variants(right, scope, site)?;
                product(&lefts, &rights, |left, right| Expression::Binary {
                    op: *op,
                    left: Box::new(left.clone()),
                    right: Box::new(right.clone()),
                })
            }
            Expression::Literal(_) | Expression::Variable(_) => vec![expression.clone()],
        };
        Ok(variants)
    }

    /// Variants of each expression combined in order, left-major.
    fn combinations(
        &mut self,
        expressions: &[Expression],
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Vec<Vec<Expression>>, TemplateError> {
        let mut combinations: Vec<Vec<Expression>> = vec![Vec::new()];
        for expression in expressions {
            let variants = self.variants(expression, scope, site)?;
            combinations = product(&combinations, &variants, |prefix, variant| {
                let mut next = prefix.clone();
                next.push(variant.clone());
                next
            });
        }
        Ok(combinations)
    }

    /// Every output of a template call whose arguments hold no template calls.
    fn expand_template_call(
        &mut self,
        name: &str,
        args: &[Expression],
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Vec<Value>, TemplateError> {
        let values = self.arguments(args, scope, site)?;
        if split_rerun(name).0 == "template" {
            let (target, rest) = template_target(&values)?;
            return self.expand_call(target, rest.to_vec(), scope);
        }
        self.expand_call(name, values, scope)
    }

    fn arguments(
        &mut self,
        args: &[Expression],
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Vec<Value>, TemplateError> {
        args.iter()
            .map(|arg| self.evaluator.argument(arg, scope, site))
            .collect()
    }
}

/// Every `left` element combined with every `right` element, left-major.
fn product<L, R>(left: &[L], right: &[R], combine: impl Fn(&L, &R) -> L) -> Vec<L> {
    let combine = &combine;
    left.iter()
        .flat_map(|l| right.iter().map(move |r| combine(l, r)))
        .collect()
}
