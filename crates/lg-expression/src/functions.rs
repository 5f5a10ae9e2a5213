//! Built-in functions and the process-wide custom function table.
//!
//! The custom table is shared by every evaluation in the process. Template
//! collections register exported templates here under `namespace.name`, so
//! registration overwrites any previous entry with the same name.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::ExpressionError;
use crate::scope::Scope;
use crate::value::{loose_equals, to_text};

/// A built-in function over already evaluated arguments.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, ExpressionError>;

/// A function registered at runtime.
pub type CustomFunction =
    Arc<dyn Fn(&[Value], &Scope) -> Result<Value, ExpressionError> + Send + Sync>;

static CUSTOM_FUNCTIONS: LazyLock<RwLock<HashMap<String, CustomFunction>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register (or replace) a custom function.
pub fn register_function(name: impl Into<String>, function: CustomFunction) {
    let name = name.into();
    debug!(function = %name, "registering custom function");
    CUSTOM_FUNCTIONS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name, function);
}

/// Remove a custom function. Returns whether it was registered.
pub fn unregister_function(name: &str) -> bool {
    CUSTOM_FUNCTIONS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name)
        .is_some()
}

/// Look up a custom function by name.
pub fn lookup_function(name: &str) -> Option<CustomFunction> {
    CUSTOM_FUNCTIONS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}

/// Whether `name` is a built-in function (including the lazy `if`).
pub fn is_builtin(name: &str) -> bool {
    name == "if" || builtin(name).is_some()
}

/// Look up a built-in function by name.
pub fn builtin(name: &str) -> Option<BuiltinFn> {
    let function: BuiltinFn = match name {
        "concat" => concat,
        "length" | "count" => length,
        "join" => join,
        "toUpper" => to_upper,
        "toLower" => to_lower,
        "trim" => trim,
        "replace" => replace,
        "contains" => contains,
        "exists" => exists,
        "string" => string,
        "int" => int,
        "float" => float,
        "first" => first,
        "last" => last,
        "createArray" => create_array,
        _ => return None,
    };
    Some(function)
}

fn expect_args(name: &str, args: &[Value], expected: usize) -> Result<(), ExpressionError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExpressionError::Arity {
            name: name.to_string(),
            expected: expected.to_string(),
            got: args.len(),
        })
    }
}

fn concat(args: &[Value]) -> Result<Value, ExpressionError> {
    Ok(Value::String(
        args.iter()
            .map(|arg| match arg {
                Value::Null => String::new(),
                other => to_text(other),
            })
            .collect(),
    ))
}

fn length(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("length", args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        other => {
            return Err(ExpressionError::type_error(format!(
                "length: {other} has no length"
            )));
        }
    };
    Ok(Value::from(len))
}

/// `join(array, separator)` or `join(array, separator, lastSeparator)`.
fn join(args: &[Value]) -> Result<Value, ExpressionError> {
    if !(2..=3).contains(&args.len()) {
        return Err(ExpressionError::Arity {
            name: "join".to_string(),
            expected: "2 or 3".to_string(),
            got: args.len(),
        });
    }
    let Value::Array(items) = &args[0] else {
        return Err(ExpressionError::type_error(format!(
            "join: {} is not an array",
            args[0]
        )));
    };
    let separator = to_text(&args[1]);
    let texts: Vec<String> = items.iter().map(to_text).collect();
    let joined = match (args.get(2), texts.split_last()) {
        (Some(last_separator), Some((last, rest))) if !rest.is_empty() => {
            format!("{}{}{last}", rest.join(&separator), to_text(last_separator))
        }
        _ => texts.join(&separator),
    };
    Ok(Value::String(joined))
}

fn to_upper(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("toUpper", args, 1)?;
    Ok(Value::String(to_text(&args[0]).to_uppercase()))
}

fn to_lower(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("toLower", args, 1)?;
    Ok(Value::String(to_text(&args[0]).to_lowercase()))
}

fn trim(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("trim", args, 1)?;
    Ok(Value::String(to_text(&args[0]).trim().to_string()))
}

fn replace(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("replace", args, 3)?;
    Ok(Value::String(
        to_text(&args[0]).replace(&to_text(&args[1]), &to_text(&args[2])),
    ))
}

fn contains(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("contains", args, 2)?;
    let found = match &args[0] {
        Value::String(s) => s.contains(&to_text(&args[1])),
        Value::Array(items) => items.iter().any(|item| loose_equals(item, &args[1])),
        Value::Object(map) => map.contains_key(&to_text(&args[1])),
        _ => false,
    };
    Ok(Value::Bool(found))
}

fn exists(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("exists", args, 1)?;
    Ok(Value::Bool(!args[0].is_null()))
}

fn string(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("string", args, 1)?;
    Ok(Value::String(to_text(&args[0])))
}

fn int(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("int", args, 1)?;
    let parsed = match &args[0] {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.map(Value::from).ok_or_else(|| {
        ExpressionError::type_error(format!("int: cannot convert {} to an integer", args[0]))
    })
}

fn float(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("float", args, 1)?;
    let parsed = match &args[0] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(Value::from).ok_or_else(|| {
        ExpressionError::type_error(format!("float: cannot convert {} to a number", args[0]))
    })
}

fn first(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("first", args, 1)?;
    Ok(match &args[0] {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .next()
            .map_or(Value::Null, |c| Value::String(c.to_string())),
        _ => Value::Null,
    })
}

fn last(args: &[Value]) -> Result<Value, ExpressionError> {
    expect_args("last", args, 1)?;
    Ok(match &args[0] {
        Value::Array(items) => items.last().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .last()
            .map_or(Value::Null, |c| Value::String(c.to_string())),
        _ => Value::Null,
    })
}

fn create_array(args: &[Value]) -> Result<Value, ExpressionError> {
    Ok(Value::Array(args.to_vec()))
}
