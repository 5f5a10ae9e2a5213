//! Template evaluation.
//!
//! The evaluator walks a template body against a scope and produces one
//! value. It is also the [`FunctionHost`] of every expression it evaluates,
//! so templates are callable as functions from inside `${...}` and calls
//! go back through the same call stack for loop detection and memoization.

use std::sync::Arc;

use lg_expression::{
    Expression, ExpressionError, FunctionHost, Scope, Value, evaluate, is_truthy, to_text,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::Map;
use tracing::trace;

use crate::error::TemplateError;
use crate::interpreter::TemplateRegistry;
use crate::interpreter::context::{CallStack, Site};
use crate::interpreter::functions::{
    LG_TYPE, activity_attachment, bind_arguments, is_template_function, merge_structure,
    property_value, read_file, split_rerun, template_target,
};
use crate::options::{EvaluationOptions, LineBreakStyle};
use crate::parser::{
    Embedded, Segment, Structure, StructureLine, Template, TemplateBody, Text, parse_text,
};
use crate::templates::Templates;

/// Evaluates templates of one collection.
///
/// An evaluator owns its call stack, so it is cheap to create one per
/// evaluation. Use [`Evaluator::with_seed`] for reproducible selection
/// among alternative texts.
///
/// # Example
///
/// ```
/// use lg::{EvaluationOptions, Evaluator, Scope, Templates};
///
/// let templates = Templates::parse_str("# coin\n- heads\n- tails");
/// let mut evaluator = Evaluator::new(&templates, EvaluationOptions::default())
///     .unwrap()
///     .with_seed(7);
/// let value = evaluator.evaluate("coin", &Scope::empty()).unwrap();
/// assert!(value == "heads" || value == "tails");
/// ```
pub struct Evaluator<'a> {
    templates: &'a Templates,
    registry: TemplateRegistry,
    stack: CallStack,
    options: EvaluationOptions,
    rng: StdRng,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator. `options` override those declared in the file.
    ///
    /// Fails if the collection (or anything it imports) has error
    /// diagnostics.
    pub fn new(templates: &'a Templates, options: EvaluationOptions) -> Result<Self, TemplateError> {
        templates.check_errors()?;
        Ok(Self {
            templates,
            registry: TemplateRegistry::new(templates),
            stack: CallStack::default(),
            options: options.merge(&templates.evaluation_options()),
            rng: StdRng::from_entropy(),
        })
    }

    /// Use `rng` to pick among alternative texts.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    /// The effective options, file options included.
    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Evaluate template `name` (a trailing `!` skips the memo).
    pub fn evaluate(&mut self, name: &str, scope: &Scope) -> Result<Value, TemplateError> {
        let value = self.evaluate_template(name, scope)?;
        Ok(self.apply_line_breaks(value))
    }

    /// Evaluate a parsed line of text outside any template.
    pub fn evaluate_text(&mut self, text: &Text, scope: &Scope) -> Result<Value, TemplateError> {
        let value = self.text(text, scope, Site::Text)?;
        Ok(self.apply_line_breaks(value))
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    fn evaluate_template(&mut self, name: &str, scope: &Scope) -> Result<Value, TemplateError> {
        let (base, rerun) = split_rerun(name);
        let template = self.lookup(base)?;
        self.stack.check(base)?;

        let key = format!("{base}#{}", scope.fingerprint());
        if !rerun {
            if let Some(cached) = self.stack.cached(&key) {
                return Ok(cached.clone());
            }
        }

        trace!(template = base, depth = self.stack.depth(), "evaluating template");
        self.stack.push(base);
        let result = self.body(&template, scope);
        self.stack.pop();
        let value = result?;

        if !rerun {
            self.stack.store(key, value.clone());
        }
        Ok(value)
    }

    /// Bind `args` to the parameters of `name` and evaluate it.
    pub(crate) fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
        scope: &Scope,
    ) -> Result<Value, TemplateError> {
        let template = self.lookup(split_rerun(name).0)?;
        let scope = bind_arguments(&template, args, scope)?;
        self.evaluate_template(name, &scope)
    }

    /// Push a frame for `name` without evaluating it.
    pub(crate) fn enter(&mut self, name: &str) -> Result<(), TemplateError> {
        self.stack.check(name)?;
        trace!(template = name, depth = self.stack.depth(), "expanding template");
        self.stack.push(name);
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }

    /// Evaluate every call afresh instead of reusing memoized results.
    pub(crate) fn disable_memo(&mut self) {
        self.stack.disable_memo();
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<Arc<Template>, TemplateError> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::not_found(name, &self.registry.names()))
    }

    /// Whether `name` (with or without `!`) is a callable template.
    pub(crate) fn has_template(&self, name: &str) -> bool {
        self.registry.contains(split_rerun(name).0)
    }

    pub(crate) fn apply_line_breaks(&self, value: Value) -> Value {
        match (self.options.line_breaks(), value) {
            (LineBreakStyle::Markdown, Value::String(text)) => {
                Value::String(text.replace('\n', "\n\n"))
            }
            (_, value) => value,
        }
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    fn body(&mut self, template: &Template, scope: &Scope) -> Result<Value, TemplateError> {
        match &template.body {
            TemplateBody::Normal(candidates) => self.candidates(candidates, scope),
            TemplateBody::Conditional(branches) => {
                for branch in branches {
                    let matched = match &branch.condition {
                        Some(condition) => {
                            self.condition(condition, scope, Site::Condition(&condition.source))?
                        }
                        None => true,
                    };
                    if matched {
                        return self.candidates(&branch.body, scope);
                    }
                }
                Ok(Value::Null)
            }
            TemplateBody::Switch(switch) => {
                let expression = &switch.expression;
                let key = to_text(&self.expression(
                    expression,
                    scope,
                    Site::Switch(&expression.source),
                )?);
                for case in &switch.cases {
                    let Some(value) = &case.value else {
                        return self.candidates(&case.body, scope);
                    };
                    if to_text(&self.expression(value, scope, Site::Case(&value.source))?) == key {
                        return self.candidates(&case.body, scope);
                    }
                }
                Ok(Value::Null)
            }
            TemplateBody::Structured(structure) => self.structure(structure, scope),
        }
    }

    /// One of `candidates`, picked at random.
    fn candidates(&mut self, candidates: &[Text], scope: &Scope) -> Result<Value, TemplateError> {
        match candidates.choose(&mut self.rng) {
            Some(text) => self.text(text, scope, Site::Text),
            None => Ok(Value::Null),
        }
    }

    fn structure(&mut self, structure: &Structure, scope: &Scope) -> Result<Value, TemplateError> {
        let mut object = Map::new();
        object.insert(LG_TYPE.to_string(), Value::from(structure.type_name.as_str()));
        for line in &structure.lines {
            match line {
                StructureLine::Property { key, values } => {
                    let mut evaluated = Vec::with_capacity(values.len());
                    for value in values {
                        evaluated.push(self.text(value, scope, Site::Property(key))?);
                    }
                    object
                        .entry(key.clone())
                        .or_insert_with(|| property_value(evaluated));
                }
                StructureLine::Merge(embedded) => {
                    let value = self.expression(embedded, scope, Site::Text)?;
                    merge_structure(&mut object, &structure.type_name, value);
                }
            }
        }
        Ok(Value::Object(object))
    }

    /// A line of text. A lone `${...}` keeps its value's type.
    pub(crate) fn text(
        &mut self,
        text: &Text,
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Value, TemplateError> {
        if let Some(embedded) = text.single_expression() {
            return self.expression(embedded, scope, site);
        }
        let mut output = String::new();
        for segment in &text.segments {
            match segment {
                Segment::Literal(literal) => output.push_str(literal),
                Segment::Expression(embedded) => {
                    output.push_str(&to_text(&self.expression(embedded, scope, site)?));
                }
            }
        }
        Ok(Value::String(output))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Evaluate an embedded expression, applying strict mode and null
    /// substitution.
    pub(crate) fn expression(
        &mut self,
        embedded: &Embedded,
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Value, TemplateError> {
        match evaluate(&embedded.expression, scope, self) {
            Ok(Value::Null) => {
                if self.options.is_strict() {
                    return Err(self.null_error(embedded, site));
                }
                Ok(self.substitute(embedded).unwrap_or(Value::Null))
            }
            Ok(value) => Ok(value),
            Err(error @ TemplateError::Expression { .. }) if !self.options.is_strict() => {
                match self.substitute(embedded) {
                    Some(value) => Ok(value),
                    None => Err(error.with_context(|| self.describe(site))),
                }
            }
            Err(error) => Err(error.with_context(|| self.describe(site))),
        }
    }

    /// Evaluate a condition. In lenient mode a failing condition is false.
    pub(crate) fn condition(
        &mut self,
        embedded: &Embedded,
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<bool, TemplateError> {
        match evaluate(&embedded.expression, scope, self) {
            Ok(Value::Null) if self.options.is_strict() => Err(self.null_error(embedded, site)),
            Ok(value) => Ok(is_truthy(&value)),
            Err(TemplateError::Expression { .. }) if !self.options.is_strict() => Ok(false),
            Err(error) => Err(error.with_context(|| self.describe(site))),
        }
    }

    /// Evaluate a bare expression, such as a template call argument.
    pub(crate) fn argument(
        &mut self,
        expression: &Expression,
        scope: &Scope,
        site: Site<'_>,
    ) -> Result<Value, TemplateError> {
        match evaluate(expression, scope, self) {
            Ok(value) => Ok(value),
            Err(error) => Err(error.with_context(|| self.describe(site))),
        }
    }

    fn null_error(&self, embedded: &Embedded, site: Site<'_>) -> TemplateError {
        TemplateError::Expression {
            context: self.describe(site),
            message: format!("'{}' evaluated to null", embedded.source),
        }
    }

    fn substitute(&self, embedded: &Embedded) -> Option<Value> {
        self.options
            .null_substitution
            .as_ref()
            .map(|placeholder| Value::String(placeholder.replace("${path}", &embedded.source)))
    }

    fn describe(&self, site: Site<'_>) -> String {
        let name = self.stack.current().map_or("inline", |frame| frame.name.as_str());
        site.describe(name)
    }

    // =========================================================================
    // Built-in template functions
    // =========================================================================

    /// `fromFile(path)` evaluates the file as template text;
    /// `fromFile(path, 'raw')` returns it unchanged.
    fn from_file(&mut self, args: &[Value], scope: &Scope) -> Result<Value, TemplateError> {
        let (path, raw) = match args {
            [Value::String(path)] => (path, false),
            [Value::String(path), Value::String(mode)] => (path, mode.eq_ignore_ascii_case("raw")),
            _ => {
                return Err(ExpressionError::Arity {
                    name: "fromFile".to_string(),
                    expected: "1 or 2 (path[, 'raw'])".to_string(),
                    got: args.len(),
                }
                .into());
            }
        };
        let source = self
            .stack
            .current()
            .and_then(|frame| self.registry.get(&frame.name))
            .map_or_else(|| self.templates.id(), |template| template.source.as_str());
        let content = read_file(path, source)?;
        if raw {
            return Ok(Value::String(content));
        }
        let text = parse_text(&content).map_err(|error| TemplateError::Expression {
            context: String::new(),
            message: format!("fromFile('{path}'): {error}"),
        })?;
        self.text(&text, scope, Site::Text)
    }
}

impl FunctionHost for Evaluator<'_> {
    type Error = TemplateError;

    fn has_function(&self, name: &str) -> bool {
        is_template_function(name) || self.has_template(name)
    }

    fn call_function(
        &mut self,
        name: &str,
        args: Vec<Value>,
        scope: &Scope,
    ) -> Result<Value, TemplateError> {
        match name {
            "template" => {
                let (target, rest) = template_target(&args)?;
                self.call(target, rest.to_vec(), scope)
            }
            "isTemplate" => match args.as_slice() {
                [Value::String(target)] => Ok(Value::Bool(self.has_template(target))),
                [_] => Ok(Value::Bool(false)),
                _ => Err(ExpressionError::Arity {
                    name: "isTemplate".to_string(),
                    expected: "1".to_string(),
                    got: args.len(),
                }
                .into()),
            },
            "fromFile" => self.from_file(&args, scope),
            "ActivityAttachment" => activity_attachment(&args),
            _ => self.call(name, args, scope),
        }
    }
}
