//! Public AST for embedded expressions.
//!
//! The core template engine walks these nodes directly for static analysis,
//! so every variant is public.

use serde_json::Value;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A constant: number, string, boolean or null.
    Literal(Value),
    /// A root identifier resolved against the scope.
    Variable(String),
    /// `target.property`
    Member {
        target: Box<Expression>,
        property: String,
    },
    /// `target[index]`
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    /// A function call. Dotted names (`common.greeting`) and a trailing `!`
    /// (`greeting!`) are kept verbatim in `name`.
    Call { name: String, args: Vec<Expression> },
    /// `[a, b, c]`
    Array(Vec<Expression>),
    /// `{key: value, ...}`
    Object(Vec<(String, Expression)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Expression {
    pub(crate) fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub(crate) fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Returns the static dotted path for a variable/member chain, e.g.
    /// `user.name` for `user.name`, or `None` when the chain contains a call
    /// or computed index.
    pub fn static_path(&self) -> Option<String> {
        match self {
            Expression::Variable(name) => Some(name.clone()),
            Expression::Member { target, property } => target
                .static_path()
                .map(|prefix| format!("{prefix}.{property}")),
            _ => None,
        }
    }

    /// Visits this expression and every nested sub-expression, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Literal(_) | Expression::Variable(_) => {}
            Expression::Member { target, .. } => target.walk(visit),
            Expression::Index { target, index } => {
                target.walk(visit);
                index.walk(visit);
            }
            Expression::Call { args, .. } | Expression::Array(args) => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expression::Object(entries) => {
                for (_, value) in entries {
                    value.walk(visit);
                }
            }
            Expression::Unary { operand, .. } => operand.walk(visit),
            Expression::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
        }
    }
}
