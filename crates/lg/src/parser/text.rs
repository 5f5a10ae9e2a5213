//! Template text parser using winnow.
//!
//! Splits a line of template text into literal runs and `${...}`
//! expressions. Handles:
//! - Escapes: `\n`, `\r`, `\t`, `\\`; any other `\c` yields `c`
//! - Expressions whose bodies contain nested `{}` or quoted strings
//! - A lone `$` (or trailing `\`) as literal text

use lg_expression::parse_expression;
use winnow::combinator::{alt, preceded, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, take_till};

use super::ast::{Embedded, Segment, Text};
use super::error::ParseError;

/// A segment before its expression has been parsed.
enum RawSegment<'i> {
    Literal(String),
    Expression(&'i str),
}

/// Parse a piece of template text into segments.
pub fn parse_text(input: &str) -> Result<Text, ParseError> {
    let mut remaining = input;
    let raw = match raw_segments(&mut remaining) {
        Ok(raw) if remaining.is_empty() => raw,
        Ok(_) => {
            return Err(ParseError::Syntax {
                column: calculate_column(input, remaining),
                message: format!(
                    "unexpected character: '{}'",
                    remaining.chars().next().unwrap_or('?')
                ),
            });
        }
        Err(_) => {
            return Err(ParseError::UnterminatedExpression {
                column: calculate_column(input, remaining),
            });
        }
    };

    let segments = raw
        .into_iter()
        .map(|segment| match segment {
            RawSegment::Literal(text) => Ok(Segment::Literal(text)),
            RawSegment::Expression(source) => embed(source).map(Segment::Expression),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Text { segments })
}

/// Parse a condition or switch value, written either as `${expr}` or bare.
pub fn parse_condition(input: &str) -> Result<Embedded, ParseError> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix("${")
        .and_then(|rest| {
            let body = rest.strip_suffix('}')?;
            (closing_brace(rest) == Some(body.len())).then_some(body)
        })
        .unwrap_or(trimmed);
    embed(inner)
}

fn embed(source: &str) -> Result<Embedded, ParseError> {
    let source = source.trim();
    parse_expression(source)
        .map(|expression| Embedded {
            source: source.to_string(),
            expression,
        })
        .map_err(|error| ParseError::Expression {
            source_text: source.to_string(),
            error,
        })
}

/// 1-based character column of `remaining` within `original`.
fn calculate_column(original: &str, remaining: &str) -> usize {
    let consumed = original.len() - remaining.len();
    original[..consumed].chars().count() + 1
}

fn raw_segments<'i>(input: &mut &'i str) -> ModalResult<Vec<RawSegment<'i>>> {
    let segments: Vec<RawSegment<'i>> = repeat(0.., segment).parse_next(input)?;
    Ok(merge_literals(segments))
}

/// Merge adjacent literal segments into single segments.
fn merge_literals(segments: Vec<RawSegment<'_>>) -> Vec<RawSegment<'_>> {
    let mut result = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            RawSegment::Literal(text) => {
                if let Some(RawSegment::Literal(prev)) = result.last_mut() {
                    prev.push_str(&text);
                } else {
                    result.push(RawSegment::Literal(text));
                }
            }
            other => result.push(other),
        }
    }
    result
}

fn segment<'i>(input: &mut &'i str) -> ModalResult<RawSegment<'i>> {
    alt((escape_sequence, expression, literal_run, literal_char)).parse_next(input)
}

fn escape_sequence<'i>(input: &mut &'i str) -> ModalResult<RawSegment<'i>> {
    preceded('\\', any)
        .map(|c: char| {
            RawSegment::Literal(match c {
                'n' => "\n".to_string(),
                'r' => "\r".to_string(),
                't' => "\t".to_string(),
                other => other.to_string(),
            })
        })
        .parse_next(input)
}

/// `${ ... }`; an opening without a matching close is a hard failure.
fn expression<'i>(input: &mut &'i str) -> ModalResult<RawSegment<'i>> {
    let current: &'i str = *input;
    let Some(rest) = current.strip_prefix("${") else {
        return Err(ErrMode::Backtrack(ContextError::new()));
    };
    let Some(end) = closing_brace(rest) else {
        return Err(ErrMode::Cut(ContextError::new()));
    };
    let source = &rest[..end];
    *input = &rest[end + 1..];
    Ok(RawSegment::Expression(source))
}

fn literal_run<'i>(input: &mut &'i str) -> ModalResult<RawSegment<'i>> {
    take_till(1.., ['\\', '$'])
        .map(|text: &str| RawSegment::Literal(text.to_string()))
        .parse_next(input)
}

fn literal_char<'i>(input: &mut &'i str) -> ModalResult<RawSegment<'i>> {
    any.map(|c: char| RawSegment::Literal(c.to_string()))
        .parse_next(input)
}

/// Byte offset of the `}` that closes an expression whose body starts at
/// the beginning of `body`.
///
/// Braces inside quoted strings do not count; quotes may be escaped with a
/// backslash.
pub(crate) fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, c) in body.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(index),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Byte offsets of `separator` outside escapes and `${...}` expressions.
fn separator_positions(text: &str, separator: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == '$' && text[index + 1..].starts_with('{') {
            if let Some(end) = closing_brace(&text[index + 2..]) {
                let close = index + 2 + end;
                while chars.next_if(|&(i, _)| i <= close).is_some() {}
            }
        } else if c == separator {
            positions.push(index);
        }
    }
    positions
}

/// Split on `separator`, ignoring escaped separators and those inside
/// expressions.
pub(crate) fn split_unescaped(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for position in separator_positions(text, separator) {
        parts.push(&text[start..position]);
        start = position + separator.len_utf8();
    }
    parts.push(&text[start..]);
    parts
}

/// Split at the first unescaped `separator` outside expressions.
pub(crate) fn split_once_unescaped(text: &str, separator: char) -> Option<(&str, &str)> {
    let position = *separator_positions(text, separator).first()?;
    Some((&text[..position], &text[position + separator.len_utf8()..]))
}
