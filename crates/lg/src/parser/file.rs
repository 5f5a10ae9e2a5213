//! `.lg` file parser.
//!
//! Files are line oriented. Each line is a comment (`>`), a file option
//! (`> !#`), an import (`[description](target)`), a template name
//! (`# name(params)`), a body line (`- text`), or part of a structured
//! body. Parsing never fails: every problem becomes a diagnostic and
//! parsing continues with the next line.

use std::mem;

use winnow::ascii::space1;
use winnow::combinator::{delimited, opt, preceded, separated, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

use super::ast::{
    Branch, BranchKind, Case, Embedded, Import, Segment, Structure, StructureLine, Switch,
    Template, TemplateBody, Text,
};
use super::text::{parse_condition, parse_text, split_once_unescaped, split_unescaped};
use crate::diagnostic::{Diagnostic, Range};

const FENCE: &str = "```";

/// The result of parsing one file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub templates: Vec<Template>,
    pub imports: Vec<Import>,
    /// Raw option lines, without the `> !#` prefix.
    pub options: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse the content of a `.lg` file.
///
/// `source` identifies the file in templates and diagnostics.
pub fn parse_file(content: &str, source: &str) -> ParsedFile {
    let mut parser = FileParser::new(source);
    for (index, line) in content.lines().enumerate() {
        parser.line(index + 1, line);
    }
    parser.finish()
}

/// A body line with the text after its dash.
struct BodyLine {
    line: usize,
    text: String,
}

struct PendingStructure {
    type_name: String,
    lines: Vec<(usize, String)>,
    closed: bool,
}

struct PendingTemplate {
    name: String,
    parameters: Vec<String>,
    start_line: usize,
    end_line: usize,
    /// False when the name line was malformed; the body is consumed and dropped.
    valid: bool,
    lines: Vec<BodyLine>,
    structure: Option<PendingStructure>,
}

/// An open ``` block.
struct Multiline {
    start_line: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    If,
    ElseIf,
    Else,
    Switch,
    Case,
    Default,
}

struct FileParser<'s> {
    source: &'s str,
    templates: Vec<Template>,
    imports: Vec<Import>,
    options: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    current: Option<PendingTemplate>,
    multiline: Option<Multiline>,
}

impl<'s> FileParser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            templates: Vec::new(),
            imports: Vec::new(),
            options: Vec::new(),
            diagnostics: Vec::new(),
            current: None,
            multiline: None,
        }
    }

    fn error(&mut self, range: Range, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(range, message, self.source));
    }

    fn warning(&mut self, range: Range, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::warning(range, message, self.source));
    }

    fn line(&mut self, number: usize, raw: &str) {
        if self.multiline.is_some() {
            self.multiline_line(number, raw);
            return;
        }

        let trimmed = raw.trim();
        if self.in_open_structure() && self.structure_line(number, trimmed) {
            return;
        }

        if trimmed.is_empty() {
            return;
        }
        if let Some(comment) = trimmed.strip_prefix('>') {
            if let Some(option) = comment.trim_start().strip_prefix("!#") {
                self.options.push(option.trim().to_string());
            }
            return;
        }
        if let Some(header) = trimmed.strip_prefix('#') {
            self.finish_template();
            self.start_template(number, header);
            return;
        }
        if let Some(body) = trimmed.strip_prefix('-') {
            self.body_line(number, body.trim());
            return;
        }
        if trimmed.starts_with('[') {
            if trimmed.contains("](") {
                self.finish_template();
                self.import_line(number, trimmed);
            } else {
                self.start_structure(number, trimmed);
            }
            return;
        }

        if self.current.is_some() {
            self.error(
                Range::line(number),
                format!("template body lines must start with '-': '{trimmed}'"),
            );
        } else {
            self.error(
                Range::line(number),
                format!("unexpected content outside a template: '{trimmed}'"),
            );
        }
    }

    fn finish(mut self) -> ParsedFile {
        self.finish_template();
        ParsedFile {
            templates: self.templates,
            imports: self.imports,
            options: self.options,
            diagnostics: self.diagnostics,
        }
    }

    // =========================================================================
    // Template boundaries
    // =========================================================================

    fn start_template(&mut self, number: usize, header: &str) {
        let mut remaining = header;
        let parsed = template_header(&mut remaining)
            .ok()
            .filter(|_| remaining.trim().is_empty());

        let (name, parameters, valid) = match parsed {
            Some((name, parameters)) => (name.to_string(), parameters, true),
            None => {
                self.error(
                    Range::line(number),
                    format!(
                        "invalid template name line '#{header}': expected '# name' or '# name(param, ...)'"
                    ),
                );
                (String::new(), Vec::new(), false)
            }
        };

        for (index, parameter) in parameters.iter().enumerate() {
            if parameters[..index].contains(parameter) {
                self.error(
                    Range::line(number),
                    format!("duplicate parameter '{parameter}' in template '{name}'"),
                );
            }
        }

        self.current = Some(PendingTemplate {
            name,
            parameters,
            start_line: number,
            end_line: number,
            valid,
            lines: Vec::new(),
            structure: None,
        });
    }

    fn finish_template(&mut self) {
        if let Some(multiline) = self.multiline.take() {
            self.error(
                Range::line(multiline.start_line),
                "unterminated multiline text: missing closing ```",
            );
            self.push_body_line(multiline.start_line, multiline.text);
        }
        let Some(pending) = self.current.take() else {
            return;
        };
        let range = Range::new(pending.start_line, pending.end_line);

        if pending
            .structure
            .as_ref()
            .is_some_and(|structure| !structure.closed)
        {
            self.error(range, format!("structured template '{}' is missing ']'", pending.name));
        }
        if !pending.valid {
            return;
        }

        let body = match pending.structure {
            Some(structure) => TemplateBody::Structured(self.build_structure(structure)),
            None => self.build_body(&pending.name, range, &pending.lines),
        };

        if self.templates.iter().any(|t| t.name == pending.name) {
            self.error(range, format!("duplicate template name '{}'", pending.name));
            return;
        }
        self.templates.push(Template {
            name: pending.name,
            parameters: pending.parameters,
            body,
            source: self.source.to_string(),
            range,
        });
    }

    // =========================================================================
    // Body lines
    // =========================================================================

    fn body_line(&mut self, number: usize, text: &str) {
        let Some(current) = self.current.as_ref() else {
            self.error(
                Range::line(number),
                format!("body line outside of a template: '- {text}'"),
            );
            return;
        };
        if current.structure.is_some() {
            self.error(
                Range::line(number),
                "a structured template cannot also have '-' body lines",
            );
            return;
        }

        let Some(open) = text.find(FENCE) else {
            self.push_body_line(number, text.to_string());
            return;
        };
        let prefix = &text[..open];
        let rest = &text[open + FENCE.len()..];
        match rest.find(FENCE) {
            Some(close) => {
                let joined = format!("{prefix}{}{}", &rest[..close], &rest[close + FENCE.len()..]);
                self.push_body_line(number, joined);
            }
            None => {
                self.multiline = Some(Multiline {
                    start_line: number,
                    text: format!("{prefix}{rest}"),
                });
            }
        }
    }

    fn multiline_line(&mut self, number: usize, raw: &str) {
        let Some(multiline) = self.multiline.as_mut() else {
            return;
        };
        multiline.text.push('\n');
        let Some(close) = raw.find(FENCE) else {
            multiline.text.push_str(raw);
            return;
        };
        multiline.text.push_str(&raw[..close]);
        multiline
            .text
            .push_str(raw[close + FENCE.len()..].trim_end());
        let start_line = multiline.start_line;
        let text = mem::take(&mut multiline.text);
        self.multiline = None;
        self.push_body_line(start_line, text);
        if let Some(current) = self.current.as_mut() {
            current.end_line = number;
        }
    }

    fn push_body_line(&mut self, number: usize, text: String) {
        if let Some(current) = self.current.as_mut() {
            current.lines.push(BodyLine { line: number, text });
            current.end_line = current.end_line.max(number);
        }
    }

    fn build_body(&mut self, name: &str, range: Range, lines: &[BodyLine]) -> TemplateBody {
        let Some(first) = lines.first() else {
            self.warning(range, format!("template '{name}' has no body"));
            return TemplateBody::Normal(Vec::new());
        };

        match keyword(&first.text) {
            None => {
                let mut candidates = Vec::with_capacity(lines.len());
                for line in lines {
                    if keyword(&line.text).is_some() {
                        self.error(
                            Range::line(line.line),
                            format!(
                                "IF/SWITCH keyword lines cannot follow plain candidates in template '{name}'"
                            ),
                        );
                        continue;
                    }
                    candidates.push(self.text(line.line, &line.text));
                }
                TemplateBody::Normal(candidates)
            }
            Some((Keyword::If | Keyword::ElseIf | Keyword::Else, _)) => {
                TemplateBody::Conditional(self.build_conditional(name, lines))
            }
            Some(_) => TemplateBody::Switch(self.build_switch(name, range, lines)),
        }
    }

    fn build_conditional(&mut self, name: &str, lines: &[BodyLine]) -> Vec<Branch> {
        let mut branches: Vec<Branch> = Vec::new();
        let mut starts = Vec::new();
        for line in lines {
            let range = Range::line(line.line);
            let (kind, condition) = match keyword(&line.text) {
                None => {
                    let text = self.text(line.line, &line.text);
                    if let Some(branch) = branches.last_mut() {
                        branch.body.push(text);
                    }
                    continue;
                }
                Some((Keyword::If, condition)) => (BranchKind::If, condition),
                Some((Keyword::ElseIf, condition)) => (BranchKind::ElseIf, condition),
                Some((Keyword::Else, condition)) => (BranchKind::Else, condition),
                Some(_) => {
                    self.error(
                        range,
                        format!("SWITCH/CASE/DEFAULT cannot appear in conditional template '{name}'"),
                    );
                    continue;
                }
            };

            if branches.last().is_some_and(|b| b.kind == BranchKind::Else) {
                self.error(range, "ELSE must be the last branch of a conditional");
            }
            match kind {
                BranchKind::If if !branches.is_empty() => {
                    self.error(range, "only the first branch of a conditional can be IF");
                }
                BranchKind::ElseIf | BranchKind::Else if branches.is_empty() => {
                    self.error(range, "the first branch of a conditional must be IF");
                }
                _ => {}
            }

            let condition = if kind == BranchKind::Else {
                if !condition.is_empty() {
                    self.error(range, "ELSE does not take a condition");
                }
                None
            } else if condition.is_empty() {
                self.error(range, "IF and ELSE IF require a condition");
                Some(Embedded::invalid(condition))
            } else {
                Some(self.condition(line.line, condition))
            };
            branches.push(Branch {
                kind,
                condition,
                body: Vec::new(),
            });
            starts.push(line.line);
        }

        for (branch, line) in branches.iter().zip(starts) {
            if branch.body.is_empty() {
                self.warning(Range::line(line), format!("branch in template '{name}' has no body"));
            }
        }
        branches
    }

    fn build_switch(&mut self, name: &str, range: Range, lines: &[BodyLine]) -> Switch {
        let mut expression: Option<Embedded> = None;
        let mut cases: Vec<Case> = Vec::new();
        let mut starts = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let line_range = Range::line(line.line);
            match keyword(&line.text) {
                Some((Keyword::Switch, value)) => {
                    if index != 0 {
                        self.error(line_range, "SWITCH must be the first line of a switch template");
                        continue;
                    }
                    expression = Some(if value.is_empty() {
                        self.error(line_range, "SWITCH requires an expression");
                        Embedded::invalid(value)
                    } else {
                        self.condition(line.line, value)
                    });
                }
                Some((kind @ (Keyword::Case | Keyword::Default), value)) => {
                    if index == 0 {
                        self.error(line_range, "a switch template must start with SWITCH");
                    }
                    if cases.last().is_some_and(|c| c.value.is_none()) {
                        self.error(line_range, "DEFAULT must be the last case of a switch");
                    }
                    let value = if kind == Keyword::Default {
                        if !value.is_empty() {
                            self.error(line_range, "DEFAULT does not take a value");
                        }
                        None
                    } else if value.is_empty() {
                        self.error(line_range, "CASE requires a value");
                        Some(Embedded::invalid(value))
                    } else {
                        Some(self.condition(line.line, value))
                    };
                    cases.push(Case {
                        value,
                        body: Vec::new(),
                    });
                    starts.push(line.line);
                }
                Some(_) => {
                    self.error(
                        line_range,
                        format!("IF/ELSE cannot appear directly in switch template '{name}'"),
                    );
                }
                None => {
                    let text = self.text(line.line, &line.text);
                    match cases.last_mut() {
                        Some(case) => case.body.push(text),
                        None => self.error(line_range, "SWITCH must be followed by CASE or DEFAULT"),
                    }
                }
            }
        }

        if cases.iter().all(|c| c.value.is_none()) {
            self.error(range, format!("switch template '{name}' needs at least one CASE"));
        }
        for (case, line) in cases.iter().zip(starts) {
            if case.body.is_empty() {
                self.warning(Range::line(line), format!("case in template '{name}' has no body"));
            }
        }

        Switch {
            expression: expression.unwrap_or_else(|| Embedded::invalid("")),
            cases,
        }
    }

    // =========================================================================
    // Structured bodies
    // =========================================================================

    fn in_open_structure(&self) -> bool {
        self.current
            .as_ref()
            .and_then(|c| c.structure.as_ref())
            .is_some_and(|s| !s.closed)
    }

    fn start_structure(&mut self, number: usize, trimmed: &str) {
        let Some(current) = self.current.as_mut() else {
            self.error(
                Range::line(number),
                format!("structured body outside of a template: '{trimmed}'"),
            );
            return;
        };
        if !current.lines.is_empty() || current.structure.is_some() {
            self.error(
                Range::line(number),
                "a structured body must be the only body of its template",
            );
            return;
        }

        let inner = &trimmed[1..];
        let (type_name, closed) = match inner.strip_suffix(']') {
            Some(name) => (name.trim(), true),
            None => (inner.trim(), false),
        };
        current.structure = Some(PendingStructure {
            type_name: type_name.to_string(),
            lines: Vec::new(),
            closed,
        });
        current.end_line = number;

        let valid = type_name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && type_name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if !valid {
            self.error(
                Range::line(number),
                format!("invalid structure type name '{type_name}'"),
            );
        }
    }

    /// Handle a line inside an open `[ ... ]`. Returns false when the line
    /// ends the structure without being consumed by it.
    fn structure_line(&mut self, number: usize, trimmed: &str) -> bool {
        if trimmed.starts_with('#') {
            return false;
        }
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        let Some(structure) = current.structure.as_mut() else {
            return false;
        };
        if trimmed.is_empty() || trimmed.starts_with('>') {
            return true;
        }
        if trimmed == "]" {
            structure.closed = true;
        } else {
            structure.lines.push((number, trimmed.to_string()));
        }
        current.end_line = number;
        true
    }

    fn build_structure(&mut self, pending: PendingStructure) -> Structure {
        let mut lines = Vec::with_capacity(pending.lines.len());
        for (number, text) in &pending.lines {
            let range = Range::line(*number);
            if text.starts_with("${") && split_once_unescaped(text, '=').is_none() {
                lines.push(StructureLine::Merge(self.condition(*number, text)));
                continue;
            }
            let Some((key, value)) = split_once_unescaped(text, '=') else {
                self.error(
                    range,
                    format!("structured lines must be 'key = value' or '${{expression}}': '{text}'"),
                );
                continue;
            };
            let key = key.trim();
            if key.is_empty()
                || !key
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                self.error(range, format!("invalid property name '{key}'"));
                continue;
            }
            let values = split_unescaped(value.trim(), '|')
                .into_iter()
                .map(|value| self.text(*number, value.trim()))
                .collect();
            lines.push(StructureLine::Property {
                key: key.to_lowercase(),
                values,
            });
        }
        Structure {
            type_name: pending.type_name,
            lines,
        }
    }

    // =========================================================================
    // Imports
    // =========================================================================

    fn import_line(&mut self, number: usize, trimmed: &str) {
        let mut remaining = trimmed;
        let parsed = import_link(&mut remaining)
            .ok()
            .filter(|_| remaining.trim().is_empty());
        let Some((description, target, alias)) = parsed else {
            self.error(
                Range::line(number),
                format!("malformed import '{trimmed}': expected '[description](target)' optionally followed by 'as alias'"),
            );
            return;
        };
        let target = target.trim();
        if target.is_empty() {
            self.error(Range::line(number), "import target is empty");
            return;
        }
        self.imports.push(Import {
            description: description.trim().to_string(),
            target: target.to_string(),
            alias: alias.map(str::to_string),
            range: Range::line(number),
        });
    }

    // =========================================================================
    // Text and expressions
    // =========================================================================

    fn text(&mut self, number: usize, raw: &str) -> Text {
        match parse_text(raw) {
            Ok(text) => text,
            Err(error) => {
                self.error(Range::line(number), error.to_string());
                Text {
                    segments: vec![Segment::Literal(raw.to_string())],
                }
            }
        }
    }

    fn condition(&mut self, number: usize, raw: &str) -> Embedded {
        parse_condition(raw).unwrap_or_else(|error| {
            self.error(Range::line(number), error.to_string());
            Embedded::invalid(raw)
        })
    }
}

/// Recognize a keyword line such as `IF: ${x}` or `else if: y`.
fn keyword(text: &str) -> Option<(Keyword, &str)> {
    let (head, rest) = text.split_once(':')?;
    let words: Vec<String> = head.split_whitespace().map(str::to_lowercase).collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    let keyword = match words.as_slice() {
        ["if"] => Keyword::If,
        ["else", "if"] | ["elseif"] => Keyword::ElseIf,
        ["else"] => Keyword::Else,
        ["switch"] => Keyword::Switch,
        ["case"] => Keyword::Case,
        ["default"] => Keyword::Default,
        _ => return None,
    };
    Some((keyword, rest.trim()))
}

/// Parse optional whitespace.
fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., char::is_whitespace)
        .void()
        .parse_next(input)
}

/// `name(param, ...)` after the `#`.
fn template_header<'i>(input: &mut &'i str) -> ModalResult<(&'i str, Vec<String>)> {
    ws(input)?;
    let name = template_name(input)?;
    ws(input)?;
    let parameters: Option<Vec<String>> = opt(delimited(
        ('(', ws),
        separated(0.., terminated(identifier.map(str::to_string), ws), (',', ws)),
        ')',
    ))
    .parse_next(input)?;
    Ok((name, parameters.unwrap_or_default()))
}

fn template_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
        }),
    )
        .take()
        .parse_next(input)
}

fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// `[description](target)` with an optional `as alias`.
fn import_link<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str, Option<&'i str>)> {
    let description = delimited('[', take_till(0.., ']'), ']').parse_next(input)?;
    let target = delimited('(', take_till(0.., ')'), ')').parse_next(input)?;
    let alias = opt(preceded((space1, "as", space1), identifier)).parse_next(input)?;
    Ok((description, target, alias))
}
