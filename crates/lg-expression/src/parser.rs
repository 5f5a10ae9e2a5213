//! Expression parser using winnow.
//!
//! Grammar, lowest precedence first:
//! - `||`, `&&`
//! - `==` `!=`, `<` `<=` `>` `>=`
//! - `+` `-`, `*` `/` `%`
//! - unary `!` `-`
//! - postfix `.member` and `[index]`
//! - literals, arrays, objects, parenthesized expressions, calls, variables

use serde_json::{Number, Value};
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::error::ExpressionError;

/// Parse an expression string into an AST.
///
/// Leading and trailing whitespace is ignored; anything else left over after
/// a complete expression is a syntax error.
pub fn parse_expression(source: &str) -> Result<Expression, ExpressionError> {
    let mut remaining = source;
    let parsed = delimited(ws, expression, ws).parse_next(&mut remaining);
    match parsed {
        Ok(expr) if remaining.is_empty() => Ok(expr),
        Ok(_) => Err(ExpressionError::Syntax {
            column: column(source, remaining),
            message: format!(
                "unexpected character: '{}'",
                remaining.chars().next().unwrap_or('?')
            ),
        }),
        Err(e) => Err(ExpressionError::Syntax {
            column: column(source, remaining),
            message: if source.trim().is_empty() {
                "empty expression".to_string()
            } else {
                format!("parse error: {e}")
            },
        }),
    }
}

/// 1-based column of `remaining` within `original`.
fn column(original: &str, remaining: &str) -> usize {
    let consumed = original.len() - remaining.len();
    original[..consumed].chars().count() + 1
}

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., char::is_whitespace)
        .void()
        .parse_next(input)
}

fn expression(input: &mut &str) -> ModalResult<Expression> {
    or_expression(input)
}

fn or_expression(input: &mut &str) -> ModalResult<Expression> {
    let mut left = and_expression(input)?;
    while opt(preceded(ws, "||")).parse_next(input)?.is_some() {
        ws(input)?;
        let right = and_expression(input)?;
        left = Expression::binary(BinaryOp::Or, left, right);
    }
    Ok(left)
}

fn and_expression(input: &mut &str) -> ModalResult<Expression> {
    let mut left = equality(input)?;
    while opt(preceded(ws, "&&")).parse_next(input)?.is_some() {
        ws(input)?;
        let right = equality(input)?;
        left = Expression::binary(BinaryOp::And, left, right);
    }
    Ok(left)
}

fn equality(input: &mut &str) -> ModalResult<Expression> {
    let mut left = comparison(input)?;
    loop {
        let op = opt(preceded(
            ws,
            alt((
                "==".value(BinaryOp::Equal),
                "!=".value(BinaryOp::NotEqual),
            )),
        ))
        .parse_next(input)?;
        let Some(op) = op else {
            return Ok(left);
        };
        ws(input)?;
        let right = comparison(input)?;
        left = Expression::binary(op, left, right);
    }
}

fn comparison(input: &mut &str) -> ModalResult<Expression> {
    let mut left = additive(input)?;
    loop {
        let op = opt(preceded(
            ws,
            alt((
                "<=".value(BinaryOp::LessEqual),
                ">=".value(BinaryOp::GreaterEqual),
                "<".value(BinaryOp::Less),
                ">".value(BinaryOp::Greater),
            )),
        ))
        .parse_next(input)?;
        let Some(op) = op else {
            return Ok(left);
        };
        ws(input)?;
        let right = additive(input)?;
        left = Expression::binary(op, left, right);
    }
}

fn additive(input: &mut &str) -> ModalResult<Expression> {
    let mut left = multiplicative(input)?;
    loop {
        let op = opt(preceded(
            ws,
            alt(("+".value(BinaryOp::Add), "-".value(BinaryOp::Subtract))),
        ))
        .parse_next(input)?;
        let Some(op) = op else {
            return Ok(left);
        };
        ws(input)?;
        let right = multiplicative(input)?;
        left = Expression::binary(op, left, right);
    }
}

fn multiplicative(input: &mut &str) -> ModalResult<Expression> {
    let mut left = unary(input)?;
    loop {
        let op = opt(preceded(
            ws,
            alt((
                "*".value(BinaryOp::Multiply),
                "/".value(BinaryOp::Divide),
                "%".value(BinaryOp::Modulo),
            )),
        ))
        .parse_next(input)?;
        let Some(op) = op else {
            return Ok(left);
        };
        ws(input)?;
        let right = unary(input)?;
        left = Expression::binary(op, left, right);
    }
}

fn unary(input: &mut &str) -> ModalResult<Expression> {
    let op = opt(alt(('!'.value(UnaryOp::Not), '-'.value(UnaryOp::Negate)))).parse_next(input)?;
    match op {
        Some(op) => {
            ws(input)?;
            let operand = unary(input)?;
            Ok(Expression::unary(op, operand))
        }
        None => postfix(input),
    }
}

/// A postfix operation applied after a primary expression.
enum Postfix {
    Member(String),
    Index(Expression),
}

fn postfix(input: &mut &str) -> ModalResult<Expression> {
    let mut target = primary(input)?;
    loop {
        let next = opt(alt((
            preceded('.', identifier).map(|name: &str| Postfix::Member(name.to_string())),
            delimited(('[', ws), expression, (ws, ']')).map(Postfix::Index),
        )))
        .parse_next(input)?;
        target = match next {
            Some(Postfix::Member(property)) => Expression::Member {
                target: Box::new(target),
                property,
            },
            Some(Postfix::Index(index)) => Expression::Index {
                target: Box::new(target),
                index: Box::new(index),
            },
            None => return Ok(target),
        };
    }
}

fn primary(input: &mut &str) -> ModalResult<Expression> {
    alt((
        number,
        string_literal.map(|s| Expression::Literal(Value::String(s))),
        array,
        object,
        delimited(('(', ws), expression, (ws, ')')),
        reference,
    ))
    .parse_next(input)
}

/// Parse an integer or decimal number literal.
fn number(input: &mut &str) -> ModalResult<Expression> {
    let text: &str = (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .parse_next(input)?;
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Expression::Literal(Value::from(n)));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(|n| Expression::Literal(Value::Number(n)))
        .ok_or_else(|| ErrMode::Cut(ContextError::new()))
}

/// Parse a single- or double-quoted string with backslash escapes.
fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = alt(('\'', '"')).parse_next(input)?;
    let mut out = String::new();
    loop {
        let c = any.parse_next(input)?;
        if c == quote {
            return Ok(out);
        }
        if c == '\\' {
            let escaped = any.parse_next(input)?;
            out.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
        } else {
            out.push(c);
        }
    }
}

fn array(input: &mut &str) -> ModalResult<Expression> {
    delimited(
        ('[', ws),
        separated(0.., expression, (ws, ',', ws)),
        (ws, ']'),
    )
    .map(Expression::Array)
    .parse_next(input)
}

fn object(input: &mut &str) -> ModalResult<Expression> {
    delimited(
        ('{', ws),
        separated(0.., object_entry, (ws, ',', ws)),
        (ws, '}'),
    )
    .map(Expression::Object)
    .parse_next(input)
}

fn object_entry(input: &mut &str) -> ModalResult<(String, Expression)> {
    let key = alt((string_literal, identifier.map(str::to_string))).parse_next(input)?;
    (ws, ':', ws).parse_next(input)?;
    let value = expression(input)?;
    Ok((key, value))
}

/// Parse a variable reference, keyword constant, or function call.
///
/// Calls may use dotted names (`common.greeting(...)`) and a trailing `!`
/// (`greeting!()`); a dotted name not followed by `(` is a member chain.
fn reference(input: &mut &str) -> ModalResult<Expression> {
    let first = identifier(input)?;
    let mut segments = vec![first.to_string()];
    loop {
        let checkpoint = *input;
        match opt(preceded('.', identifier)).parse_next(input)? {
            Some(segment) => segments.push(segment.to_string()),
            None => {
                *input = checkpoint;
                break;
            }
        }
    }

    let dashed = dashed_call_tail(input);

    let rerun = if input.starts_with("!(") {
        let _ = '!'.parse_next(input)?;
        true
    } else {
        false
    };

    if input.starts_with('(') {
        let args: Vec<Expression> = delimited(
            ('(', ws),
            separated(0.., expression, (ws, ',', ws)),
            (ws, ')'),
        )
        .parse_next(input)?;
        let mut name = segments.join(".");
        name.push_str(&dashed);
        if rerun {
            name.push('!');
        }
        return Ok(Expression::Call { name, args });
    }

    let mut segments = segments.into_iter();
    let root = segments.next().unwrap_or_default();
    let base = match root.as_str() {
        "true" => Expression::Literal(Value::Bool(true)),
        "false" => Expression::Literal(Value::Bool(false)),
        "null" => Expression::Literal(Value::Null),
        _ => Expression::Variable(root),
    };
    Ok(segments.fold(base, |target, property| Expression::Member {
        target: Box::new(target),
        property,
    }))
}

/// Consume `-part` runs that continue a call name, as in `my-template()`.
///
/// Only taken when the dashed name is directly followed by `(` or `!(`;
/// anything else leaves the input untouched so `a-b` stays a subtraction.
fn dashed_call_tail(input: &mut &str) -> String {
    let checkpoint = *input;
    let mut tail = String::new();
    while let Some(rest) = input.strip_prefix('-') {
        let length = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        if length == 0 {
            break;
        }
        tail.push('-');
        tail.push_str(&rest[..length]);
        *input = &rest[length..];
    }
    if tail.is_empty() || input.starts_with('(') || input.starts_with("!(") {
        tail
    } else {
        *input = checkpoint;
        String::new()
    }
}

fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}
