//! Tree-walking expression evaluator.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::error::ExpressionError;
use crate::functions::{builtin, lookup_function};
use crate::scope::Scope;
use crate::value::{compare, is_truthy, loose_equals, to_text};

/// Functions supplied by the embedding application.
///
/// The host is consulted before the process-wide custom table and the
/// built-ins, so it can shadow either. Its error type lets host failures
/// travel through expression evaluation without losing their structure.
pub trait FunctionHost {
    type Error: From<ExpressionError>;

    /// Whether the host handles a call to `name`.
    fn has_function(&self, name: &str) -> bool;

    /// Invoke a host function with evaluated arguments.
    fn call_function(
        &mut self,
        name: &str,
        args: Vec<Value>,
        scope: &Scope,
    ) -> Result<Value, Self::Error>;
}

/// A host with no functions of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl FunctionHost for NoHost {
    type Error = ExpressionError;

    fn has_function(&self, _name: &str) -> bool {
        false
    }

    fn call_function(
        &mut self,
        name: &str,
        _args: Vec<Value>,
        _scope: &Scope,
    ) -> Result<Value, ExpressionError> {
        Err(ExpressionError::UnknownFunction {
            name: name.to_string(),
        })
    }
}

/// Evaluate an expression against a scope.
///
/// Missing variables and members evaluate to `null`.
pub fn evaluate<H: FunctionHost>(
    expr: &Expression,
    scope: &Scope,
    host: &mut H,
) -> Result<Value, H::Error> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Variable(name) => Ok(scope.get(name).cloned().unwrap_or(Value::Null)),
        Expression::Member { target, property } => {
            let target = evaluate(target, scope, host)?;
            Ok(target.get(property).cloned().unwrap_or(Value::Null))
        }
        Expression::Index { target, index } => {
            let target = evaluate(target, scope, host)?;
            let index = evaluate(index, scope, host)?;
            Ok(index_value(&target, &index))
        }
        Expression::Array(items) => items
            .iter()
            .map(|item| evaluate(item, scope, host))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expression::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), evaluate(value, scope, host)?);
            }
            Ok(Value::Object(map))
        }
        Expression::Unary { op, operand } => {
            let value = evaluate(operand, scope, host)?;
            Ok(apply_unary(*op, &value)?)
        }
        Expression::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let left = evaluate(left, scope, host)?;
                if !is_truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&evaluate(right, scope, host)?)))
            }
            BinaryOp::Or => {
                let left = evaluate(left, scope, host)?;
                if is_truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&evaluate(right, scope, host)?)))
            }
            _ => {
                let left = evaluate(left, scope, host)?;
                let right = evaluate(right, scope, host)?;
                Ok(apply_binary(*op, &left, &right)?)
            }
        },
        Expression::Call { name, args } => call(name, args, scope, host),
    }
}

fn call<H: FunctionHost>(
    name: &str,
    args: &[Expression],
    scope: &Scope,
    host: &mut H,
) -> Result<Value, H::Error> {
    if name == "if" && !host.has_function(name) {
        let [condition, then, otherwise] = args else {
            return Err(ExpressionError::Arity {
                name: "if".to_string(),
                expected: "3".to_string(),
                got: args.len(),
            }
            .into());
        };
        let branch = if is_truthy(&evaluate(condition, scope, host)?) {
            then
        } else {
            otherwise
        };
        return evaluate(branch, scope, host);
    }

    let values = args
        .iter()
        .map(|arg| evaluate(arg, scope, host))
        .collect::<Result<Vec<_>, _>>()?;

    if host.has_function(name) {
        return host.call_function(name, values, scope);
    }
    if let Some(custom) = lookup_function(name) {
        return Ok(custom(&values, scope)?);
    }
    if let Some(function) = builtin(name) {
        return Ok(function(&values)?);
    }
    Err(ExpressionError::UnknownFunction {
        name: name.to_string(),
    }
    .into())
}

fn index_value(target: &Value, index: &Value) -> Value {
    let found = match (target, index) {
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i)),
        (Value::Object(map), Value::String(key)) => map.get(key),
        _ => None,
    };
    found.cloned().unwrap_or(Value::Null)
}

fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value, ExpressionError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!is_truthy(value))),
        UnaryOp::Negate => match value {
            Value::Number(n) => Ok(n
                .as_i64()
                .and_then(i64::checked_neg)
                .map(Value::from)
                .or_else(|| n.as_f64().map(|f| Value::from(-f)))
                .unwrap_or(Value::Null)),
            other => Err(ExpressionError::type_error(format!(
                "cannot negate {other}"
            ))),
        },
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
    match op {
        BinaryOp::Equal => Ok(Value::Bool(loose_equals(left, right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!loose_equals(left, right))),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering = compare(left, right).ok_or_else(|| {
                ExpressionError::type_error(format!("cannot compare {left} and {right}"))
            })?;
            Ok(Value::Bool(match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEqual => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add if left.is_string() || right.is_string() => {
            let text = |v: &Value| match v {
                Value::Null => String::new(),
                other => to_text(other),
            };
            Ok(Value::String(format!("{}{}", text(left), text(right))))
        }
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo => arithmetic(op, left, right),
        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(match op {
            BinaryOp::And => is_truthy(left) && is_truthy(right),
            _ => is_truthy(left) || is_truthy(right),
        })),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
    let (Value::Number(l), Value::Number(r)) = (left, right) else {
        return Err(ExpressionError::type_error(format!(
            "operator {op:?} requires numbers, got {left} and {right}"
        )));
    };

    if let (Some(l), Some(r)) = (l.as_i64(), r.as_i64()) {
        let result = match op {
            BinaryOp::Add => l.checked_add(r),
            BinaryOp::Subtract => l.checked_sub(r),
            BinaryOp::Multiply => l.checked_mul(r),
            BinaryOp::Divide => l.checked_div(r),
            _ => l.checked_rem(r),
        };
        return result.map(Value::from).ok_or_else(|| {
            ExpressionError::type_error(format!("arithmetic overflow or division by zero: {l} {op:?} {r}"))
        });
    }

    let (Some(l), Some(r)) = (l.as_f64(), r.as_f64()) else {
        return Err(ExpressionError::type_error("invalid number"));
    };
    if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && r == 0.0 {
        return Err(ExpressionError::type_error("division by zero"));
    }
    Ok(Value::from(match op {
        BinaryOp::Add => l + r,
        BinaryOp::Subtract => l - r,
        BinaryOp::Multiply => l * r,
        BinaryOp::Divide => l / r,
        _ => l % r,
    }))
}
