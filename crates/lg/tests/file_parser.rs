//! Integration tests for .lg file and text parsing

use lg::parser::{
    BranchKind, ParseError, Segment, StructureLine, TemplateBody, parse_file, parse_text,
};
use lg::{Range, Severity};

fn errors(content: &str) -> Vec<String> {
    parse_file(content, "test.lg")
        .diagnostics
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message)
        .collect()
}

// =============================================================================
// Template Definitions
// =============================================================================

#[test]
fn test_simple_template() {
    let parsed = parse_file("# greet(name)\n- Hello, ${name}!", "test.lg");
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(parsed.templates.len(), 1);

    let template = &parsed.templates[0];
    assert_eq!(template.name, "greet");
    assert_eq!(template.parameters, vec!["name"]);
    assert_eq!(template.source, "test.lg");
    assert_eq!(template.range, Range::new(1, 2));
    match &template.body {
        TemplateBody::Normal(candidates) => {
            assert_eq!(candidates.len(), 1);
            let segments = &candidates[0].segments;
            assert_eq!(segments.len(), 3);
            assert_eq!(segments[0], Segment::Literal("Hello, ".to_string()));
            match &segments[1] {
                Segment::Expression(embedded) => assert_eq!(embedded.source, "name"),
                Segment::Literal(_) => panic!("expected expression"),
            }
            assert_eq!(segments[2], Segment::Literal("!".to_string()));
        }
        _ => panic!("expected normal body"),
    }
}

#[test]
fn test_multiple_templates_and_comments() {
    let content = "> a comment\n# first\n- one\n- two\n\n> another\n# second(a, b)\n- ${a}${b}";
    let parsed = parse_file(content, "test.lg");
    assert!(parsed.diagnostics.is_empty());
    let names: Vec<&str> = parsed.templates.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(parsed.templates[0].range, Range::new(2, 4));
    assert_eq!(parsed.templates[1].parameters, vec!["a", "b"]);
}

#[test]
fn test_dotted_and_dashed_template_names() {
    let parsed = parse_file("# card.title-short\n- x", "test.lg");
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(parsed.templates[0].name, "card.title-short");
}

#[test]
fn test_options_and_imports() {
    let content = "> !# @strict = true\n[common](shared/common.lg)\n[Util](util.lg) as util\n# t\n- x";
    let parsed = parse_file(content, "test.lg");
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(parsed.options, vec!["@strict = true"]);
    assert_eq!(parsed.imports.len(), 2);
    assert_eq!(parsed.imports[0].description, "common");
    assert_eq!(parsed.imports[0].target, "shared/common.lg");
    assert_eq!(parsed.imports[0].alias, None);
    assert_eq!(parsed.imports[1].alias.as_deref(), Some("util"));
    assert_eq!(parsed.imports[1].range, Range::line(3));
}

#[test]
fn test_multiline_text() {
    let parsed = parse_file("# t\n- ```line one\nline ${two}```\n", "test.lg");
    assert!(parsed.diagnostics.is_empty());
    let TemplateBody::Normal(candidates) = &parsed.templates[0].body else {
        panic!("expected normal body");
    };
    let segments = &candidates[0].segments;
    assert_eq!(segments[0], Segment::Literal("line one\nline ".to_string()));
    assert_eq!(parsed.templates[0].range, Range::new(1, 3));
}

// =============================================================================
// Conditional and Switch Bodies
// =============================================================================

#[test]
fn test_conditional_body() {
    let content = "# weather(temp)\n- IF: ${temp > 25}\n  - Hot\n  - Scorching\n- ELSE IF: temp > 10\n  - Mild\n- else:\n  - Cold";
    let parsed = parse_file(content, "test.lg");
    assert!(parsed.diagnostics.is_empty());
    let TemplateBody::Conditional(branches) = &parsed.templates[0].body else {
        panic!("expected conditional body");
    };
    let kinds: Vec<BranchKind> = branches.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BranchKind::If, BranchKind::ElseIf, BranchKind::Else]);
    assert_eq!(branches[0].condition.as_ref().unwrap().source, "temp > 25");
    assert_eq!(branches[1].condition.as_ref().unwrap().source, "temp > 10");
    assert!(branches[2].condition.is_none());
    assert_eq!(branches[0].body.len(), 2);
}

#[test]
fn test_else_must_be_last() {
    let content = "# t\n- IF: ${a}\n  - x\n- ELSE:\n  - y\n- ELSE IF: ${b}\n  - z";
    let errors = errors(content);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ELSE must be the last branch"));
}

#[test]
fn test_conditional_must_start_with_if() {
    let errors = errors("# t\n- ELSE:\n  - y");
    assert!(errors.iter().any(|e| e.contains("first branch of a conditional must be IF")));
}

#[test]
fn test_condition_required() {
    let errors = errors("# t\n- IF:\n  - y");
    assert!(errors.iter().any(|e| e.contains("require a condition")));
}

#[test]
fn test_switch_body() {
    let content = "# color(c)\n- SWITCH: ${c}\n- CASE: ${'red'}\n  - stop\n- CASE: 'green'\n  - go\n- DEFAULT:\n  - wait";
    let parsed = parse_file(content, "test.lg");
    assert!(parsed.diagnostics.is_empty());
    let TemplateBody::Switch(switch) = &parsed.templates[0].body else {
        panic!("expected switch body");
    };
    assert_eq!(switch.expression.source, "c");
    assert_eq!(switch.cases.len(), 3);
    assert_eq!(switch.cases[1].value.as_ref().unwrap().source, "'green'");
    assert!(switch.cases[2].value.is_none());
}

#[test]
fn test_default_must_be_last() {
    let content = "# t\n- SWITCH: ${c}\n- DEFAULT:\n  - x\n- CASE: ${1}\n  - y";
    let errors = errors(content);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("DEFAULT must be the last case"));
}

#[test]
fn test_switch_needs_a_case() {
    let errors = errors("# t\n- SWITCH: ${c}\n- DEFAULT:\n  - x");
    assert!(errors.iter().any(|e| e.contains("needs at least one CASE")));
}

#[test]
fn test_keywords_after_plain_candidates() {
    let errors = errors("# t\n- hello\n- IF: ${x}");
    assert!(errors.iter().any(|e| e.contains("cannot follow plain candidates")));
}

// =============================================================================
// Structured Bodies
// =============================================================================

#[test]
fn test_structured_body() {
    let content = "# card\n[Card\n  Title = Hello\n  tags = a | b\n  ${base()}\n]";
    let parsed = parse_file(content, "test.lg");
    assert!(parsed.diagnostics.is_empty());
    let template = &parsed.templates[0];
    assert_eq!(template.range, Range::new(1, 6));
    let TemplateBody::Structured(structure) = &template.body else {
        panic!("expected structured body");
    };
    assert_eq!(structure.type_name, "Card");
    assert_eq!(structure.lines.len(), 3);
    match &structure.lines[0] {
        StructureLine::Property { key, values } => {
            assert_eq!(key, "title");
            assert_eq!(values.len(), 1);
        }
        StructureLine::Merge(_) => panic!("expected property"),
    }
    match &structure.lines[1] {
        StructureLine::Property { values, .. } => assert_eq!(values.len(), 2),
        StructureLine::Merge(_) => panic!("expected property"),
    }
    match &structure.lines[2] {
        StructureLine::Merge(embedded) => assert_eq!(embedded.source, "base()"),
        StructureLine::Property { .. } => panic!("expected merge line"),
    }
}

#[test]
fn test_unclosed_structure() {
    let errors = errors("# card\n[Card\n  title = x");
    assert!(errors.iter().any(|e| e.contains("missing ']'")));
}

#[test]
fn test_invalid_structure_line() {
    let errors = errors("# card\n[Card\n  just words\n]");
    assert!(errors.iter().any(|e| e.contains("key = value")));
}

// =============================================================================
// Error Policy
// =============================================================================

#[test]
fn test_duplicate_template() {
    let errors = errors("# t\n- a\n# t\n- b");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("duplicate template name 't'"));
}

#[test]
fn test_duplicate_parameter() {
    let errors = errors("# t(a, a)\n- x");
    assert!(errors.iter().any(|e| e.contains("duplicate parameter 'a'")));
}

#[test]
fn test_malformed_header() {
    let errors = errors("# 1abc\n- x");
    assert!(errors.iter().any(|e| e.contains("invalid template name line")));
}

#[test]
fn test_content_outside_template() {
    let errors = errors("hello there\n# t\n- x");
    assert!(errors.iter().any(|e| e.contains("outside a template")));
}

#[test]
fn test_body_without_dash() {
    let errors = errors("# t\nnot a body line");
    assert!(errors.iter().any(|e| e.contains("must start with '-'")));
}

#[test]
fn test_unterminated_expression_is_diagnostic() {
    let parsed = parse_file("# t\n- Hello ${name", "test.lg");
    assert_eq!(parsed.templates.len(), 1);
    assert!(
        parsed
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.range == Range::line(2))
    );
}

#[test]
fn test_empty_template_warns() {
    let parsed = parse_file("# t\n# u\n- x", "test.lg");
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].severity, Severity::Warning);
    assert!(parsed.diagnostics[0].message.contains("no body"));
}

// =============================================================================
// Text Parsing
// =============================================================================

#[test]
fn test_escapes() {
    let text = parse_text(r"a\tb \${x} \\ \q").unwrap();
    assert_eq!(text.segments, vec![Segment::Literal("a\tb ${x} \\ q".to_string())]);
}

#[test]
fn test_lone_dollar_is_literal() {
    let text = parse_text("costs $5").unwrap();
    assert_eq!(text.segments, vec![Segment::Literal("costs $5".to_string())]);
}

#[test]
fn test_braces_inside_strings() {
    let text = parse_text("${concat('}', \"{\")} done").unwrap();
    let embedded = text.expressions().next().unwrap();
    assert_eq!(embedded.source, "concat('}', \"{\")");
    assert_eq!(text.segments[1], Segment::Literal(" done".to_string()));
}

#[test]
fn test_single_expression() {
    assert!(parse_text("${x}").unwrap().single_expression().is_some());
    assert!(parse_text("${x} ").unwrap().single_expression().is_none());
}

#[test]
fn test_unterminated_expression() {
    assert_eq!(
        parse_text("ab ${x").unwrap_err(),
        ParseError::UnterminatedExpression { column: 4 }
    );
}

#[test]
fn test_invalid_expression() {
    let error = parse_text("${1 +}").unwrap_err();
    assert!(matches!(error, ParseError::Expression { .. }));
}
