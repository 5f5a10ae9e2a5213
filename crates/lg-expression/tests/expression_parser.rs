//! Tests for the expression parser.

use lg_expression::{BinaryOp, Expression, ExpressionError, UnaryOp, parse_expression};
use serde_json::json;

fn var(name: &str) -> Expression {
    Expression::Variable(name.to_string())
}

// =============================================================================
// Literals and References
// =============================================================================

#[test]
fn parses_literals() {
    assert_eq!(parse_expression("42").unwrap(), Expression::Literal(json!(42)));
    assert_eq!(parse_expression("1.5").unwrap(), Expression::Literal(json!(1.5)));
    assert_eq!(
        parse_expression("'it\\'s'").unwrap(),
        Expression::Literal(json!("it's"))
    );
    assert_eq!(
        parse_expression("\"double\"").unwrap(),
        Expression::Literal(json!("double"))
    );
    assert_eq!(parse_expression("true").unwrap(), Expression::Literal(json!(true)));
    assert_eq!(parse_expression("null").unwrap(), Expression::Literal(json!(null)));
}

#[test]
fn parses_member_chain() {
    let expr = parse_expression("user.address.city").unwrap();
    assert_eq!(expr.static_path(), Some("user.address.city".to_string()));
}

#[test]
fn parses_index_access() {
    let expr = parse_expression("items[0]").unwrap();
    assert_eq!(
        expr,
        Expression::Index {
            target: Box::new(var("items")),
            index: Box::new(Expression::Literal(json!(0))),
        }
    );
    assert_eq!(expr.static_path(), None);
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert_eq!(parse_expression("  name  ").unwrap(), var("name"));
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn parses_call_with_arguments() {
    let expr = parse_expression("greet(name, 'x')").unwrap();
    assert_eq!(
        expr,
        Expression::Call {
            name: "greet".to_string(),
            args: vec![var("name"), Expression::Literal(json!("x"))],
        }
    );
}

#[test]
fn dotted_call_keeps_full_name() {
    let expr = parse_expression("common.welcome()").unwrap();
    assert_eq!(
        expr,
        Expression::Call {
            name: "common.welcome".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn rerun_marker_is_kept_on_call_name() {
    let expr = parse_expression("greeting!()").unwrap();
    assert_eq!(
        expr,
        Expression::Call {
            name: "greeting!".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn dashed_call_name_is_one_name() {
    assert_eq!(
        parse_expression("my-template()").unwrap(),
        Expression::Call {
            name: "my-template".to_string(),
            args: vec![],
        }
    );
    assert_eq!(
        parse_expression("common.say-hi!(x)").unwrap(),
        Expression::Call {
            name: "common.say-hi!".to_string(),
            args: vec![var("x")],
        }
    );
}

#[test]
fn dashed_name_without_call_is_subtraction() {
    let expr = parse_expression("a-b").unwrap();
    assert_eq!(
        expr,
        Expression::Binary {
            op: BinaryOp::Subtract,
            left: Box::new(var("a")),
            right: Box::new(var("b")),
        }
    );
    let spaced = parse_expression("a - b()").unwrap();
    assert!(matches!(spaced, Expression::Binary { op: BinaryOp::Subtract, .. }));
}

#[test]
fn not_equal_is_not_a_rerun_marker() {
    let expr = parse_expression("a!=b").unwrap();
    assert_eq!(
        expr,
        Expression::Binary {
            op: BinaryOp::NotEqual,
            left: Box::new(var("a")),
            right: Box::new(var("b")),
        }
    );
}

// =============================================================================
// Operators
// =============================================================================

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = parse_expression("1 + 2 * 3").unwrap();
    let Expression::Binary { op, right, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(
        *right,
        Expression::Binary {
            op: BinaryOp::Multiply,
            ..
        }
    ));
}

#[test]
fn parses_unary_not() {
    assert_eq!(
        parse_expression("!done").unwrap(),
        Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(var("done")),
        }
    );
}

#[test]
fn parses_logical_chain() {
    let expr = parse_expression("a > 1 && b == 'x' || c").unwrap();
    let Expression::Binary { op, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(op, BinaryOp::Or);
}

#[test]
fn parses_object_literal_with_nested_braces() {
    let expr = parse_expression("{a: {b: 1}, 'c d': [1, 2]}").unwrap();
    let Expression::Object(entries) = expr else {
        panic!("expected object");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].0, "c d");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn trailing_garbage_is_a_syntax_error() {
    let err = parse_expression("a b").unwrap_err();
    assert!(matches!(err, ExpressionError::Syntax { column: 3, .. }), "{err:?}");
}

#[test]
fn empty_expression_is_a_syntax_error() {
    let err = parse_expression("   ").unwrap_err();
    assert!(err.to_string().contains("empty expression"));
}

#[test]
fn unterminated_call_is_a_syntax_error() {
    assert!(parse_expression("greet(name").is_err());
}
