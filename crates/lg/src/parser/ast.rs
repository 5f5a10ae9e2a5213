//! AST types for parsed `.lg` files.

use lg_expression::{Expression, Value};

use crate::diagnostic::Range;

/// A named template with parameters and a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: TemplateBody,
    /// Identifier of the file the template was parsed from.
    pub source: String,
    pub range: Range,
}

impl Template {
    /// Every embedded expression in the body, in source order.
    pub fn expressions(&self) -> Vec<&Embedded> {
        fn texts<'a>(body: &'a [Text], found: &mut Vec<&'a Embedded>) {
            for text in body {
                found.extend(text.expressions());
            }
        }

        let mut found = Vec::new();
        match &self.body {
            TemplateBody::Normal(candidates) => texts(candidates, &mut found),
            TemplateBody::Conditional(branches) => {
                for branch in branches {
                    found.extend(&branch.condition);
                    texts(&branch.body, &mut found);
                }
            }
            TemplateBody::Switch(switch) => {
                found.push(&switch.expression);
                for case in &switch.cases {
                    found.extend(&case.value);
                    texts(&case.body, &mut found);
                }
            }
            TemplateBody::Structured(structure) => {
                for line in &structure.lines {
                    match line {
                        StructureLine::Property { values, .. } => texts(values, &mut found),
                        StructureLine::Merge(embedded) => found.push(embedded),
                    }
                }
            }
        }
        found
    }
}

/// The body of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBody {
    /// Alternative texts, one picked at random.
    Normal(Vec<Text>),
    /// IF / ELSE IF / ELSE branches.
    Conditional(Vec<Branch>),
    /// SWITCH with CASE / DEFAULT arms.
    Switch(Switch),
    /// `[TypeName ... ]` object-producing body.
    Structured(Structure),
}

/// A line of template text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    pub segments: Vec<Segment>,
}

impl Text {
    /// A text consisting of one literal.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Literal(text.into())],
        }
    }

    /// The expression, if this text is exactly one `${...}` and nothing else.
    pub fn single_expression(&self) -> Option<&Embedded> {
        match self.segments.as_slice() {
            [Segment::Expression(embedded)] => Some(embedded),
            _ => None,
        }
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Embedded> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Expression(embedded) => Some(embedded),
            Segment::Literal(_) => None,
        })
    }
}

/// A segment of template text.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expression(Embedded),
}

/// An expression embedded in a template, with the source it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub source: String,
    pub expression: Expression,
}

impl Embedded {
    /// Stand-in for an expression that failed to parse.
    ///
    /// Collections containing one always carry an error diagnostic, so it is
    /// never evaluated.
    pub(crate) fn invalid(source: &str) -> Self {
        Self {
            source: source.to_string(),
            expression: Expression::Literal(Value::Null),
        }
    }
}

/// Kind of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    If,
    ElseIf,
    Else,
}

/// One branch of a conditional body.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub kind: BranchKind,
    /// Absent for ELSE.
    pub condition: Option<Embedded>,
    pub body: Vec<Text>,
}

/// A switch body.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub expression: Embedded,
    pub cases: Vec<Case>,
}

/// One arm of a switch. `value` is `None` for DEFAULT.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Embedded>,
    pub body: Vec<Text>,
}

/// A structured body producing an object tagged with `type_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub type_name: String,
    pub lines: Vec<StructureLine>,
}

/// A line inside a structured body.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureLine {
    /// `key = value | value ...`; the key is lower-cased.
    Property { key: String, values: Vec<Text> },
    /// A bare `${expr}` whose object result is merged in.
    Merge(Embedded),
}

/// An import edge: `[description](target)` with an optional `as alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub description: String,
    pub target: String,
    pub alias: Option<String>,
    pub range: Range,
}
