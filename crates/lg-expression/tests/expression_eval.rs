//! Tests for expression evaluation, scopes, and function lookup.

use std::sync::Arc;

use lg_expression::{
    ExpressionError, FunctionHost, NoHost, Scope, Value, evaluate, parse_expression,
    register_function, unregister_function,
};
use serde_json::{Map, json};

fn eval(source: &str, data: Value) -> Result<Value, ExpressionError> {
    let expr = parse_expression(source).unwrap();
    evaluate(&expr, &Scope::new(data), &mut NoHost)
}

// =============================================================================
// Scope Lookup
// =============================================================================

#[test]
fn missing_variable_is_null() {
    assert_eq!(eval("nobody", json!({})).unwrap(), Value::Null);
    assert_eq!(eval("user.missing.deeper", json!({"user": {}})).unwrap(), Value::Null);
}

#[test]
fn member_and_index_lookup() {
    let data = json!({"user": {"names": ["Ana", "Bo"]}, "key": "names"});
    assert_eq!(eval("user.names[1]", data.clone()).unwrap(), json!("Bo"));
    assert_eq!(eval("user[key][0]", data).unwrap(), json!("Ana"));
}

#[test]
fn locals_shadow_globals_but_keep_global_layer() {
    let scope = Scope::new(json!({"a": 1, "b": 2}));
    let mut locals = Map::new();
    locals.insert("a".to_string(), json!(10));
    let child = scope.with_locals(locals);

    let expr = parse_expression("a + b").unwrap();
    assert_eq!(evaluate(&expr, &child, &mut NoHost).unwrap(), json!(12));
}

#[test]
fn child_of_child_does_not_see_parent_locals() {
    let scope = Scope::new(json!({"g": 1}));
    let mut first = Map::new();
    first.insert("x".to_string(), json!("caller local"));
    let caller = scope.with_locals(first);
    let callee = caller.with_locals(Map::new());

    assert_eq!(callee.get("x"), None);
    assert_eq!(callee.get("g"), Some(&json!(1)));
}

#[test]
fn fingerprint_tracks_local_bindings() {
    let scope = Scope::new(json!({}));
    let mut a = Map::new();
    a.insert("n".to_string(), json!(1));
    let mut b = Map::new();
    b.insert("n".to_string(), json!(2));

    assert_eq!(
        scope.with_locals(a.clone()).fingerprint(),
        scope.with_locals(a).fingerprint()
    );
    assert_ne!(
        scope.with_locals(b).fingerprint(),
        scope.clone().fingerprint()
    );
}

// =============================================================================
// Operators
// =============================================================================

#[test]
fn arithmetic_and_comparison() {
    assert_eq!(eval("1 + 2 * 3", json!({})).unwrap(), json!(7));
    assert_eq!(eval("7 / 2", json!({})).unwrap(), json!(3));
    assert_eq!(eval("7.0 / 2", json!({})).unwrap(), json!(3.5));
    assert_eq!(eval("n >= 3", json!({"n": 3})).unwrap(), json!(true));
    assert_eq!(eval("1 == 1.0", json!({})).unwrap(), json!(true));
}

#[test]
fn string_concatenation_with_plus() {
    assert_eq!(eval("'n=' + n", json!({"n": 4})).unwrap(), json!("n=4"));
}

#[test]
fn logical_operators_short_circuit() {
    // `boom()` is unknown; short-circuiting must avoid calling it.
    assert_eq!(eval("false && boom()", json!({})).unwrap(), json!(false));
    assert_eq!(eval("true || boom()", json!({})).unwrap(), json!(true));
}

#[test]
fn division_by_zero_is_an_error() {
    assert!(matches!(
        eval("1 / 0", json!({})),
        Err(ExpressionError::Type { .. })
    ));
}

// =============================================================================
// Functions
// =============================================================================

#[test]
fn builtin_functions() {
    assert_eq!(eval("concat('a', 1, null)", json!({})).unwrap(), json!("a1"));
    assert_eq!(eval("length(items)", json!({"items": [1, 2]})).unwrap(), json!(2));
    assert_eq!(
        eval("join(items, ', ', ' and ')", json!({"items": ["a", "b", "c"]})).unwrap(),
        json!("a, b and c")
    );
    assert_eq!(eval("toUpper('hi')", json!({})).unwrap(), json!("HI"));
    assert_eq!(eval("exists(x)", json!({})).unwrap(), json!(false));
}

#[test]
fn lazy_if() {
    assert_eq!(eval("if(n > 1, 'many', boom())", json!({"n": 2})).unwrap(), json!("many"));
}

#[test]
fn unknown_function_is_reported() {
    let err = eval("nope(1)", json!({})).unwrap_err();
    assert_eq!(
        err,
        ExpressionError::UnknownFunction {
            name: "nope".to_string()
        }
    );
}

#[test]
fn builtin_arity_is_checked() {
    assert!(matches!(
        eval("toUpper('a', 'b')", json!({})),
        Err(ExpressionError::Arity { .. })
    ));
}

#[test]
fn registered_functions_are_callable_and_replaceable() {
    register_function(
        "tests.twice",
        Arc::new(|args: &[Value], _: &Scope| Ok(json!(args[0].as_i64().unwrap_or(0) * 2))),
    );
    assert_eq!(eval("tests.twice(4)", json!({})).unwrap(), json!(8));

    register_function(
        "tests.twice",
        Arc::new(|_: &[Value], _: &Scope| Ok(json!("replaced"))),
    );
    assert_eq!(eval("tests.twice(4)", json!({})).unwrap(), json!("replaced"));

    assert!(unregister_function("tests.twice"));
    assert!(eval("tests.twice(4)", json!({})).is_err());
}

/// A host that answers `shout(x)` and counts calls.
struct ShoutHost {
    calls: usize,
}

impl FunctionHost for ShoutHost {
    type Error = ExpressionError;

    fn has_function(&self, name: &str) -> bool {
        name == "shout"
    }

    fn call_function(
        &mut self,
        _name: &str,
        args: Vec<Value>,
        _scope: &Scope,
    ) -> Result<Value, ExpressionError> {
        self.calls += 1;
        Ok(json!(format!("{}!", args[0].as_str().unwrap_or_default())))
    }
}

#[test]
fn host_functions_take_precedence() {
    let expr = parse_expression("concat(shout(a), shout('b'))").unwrap();
    let mut host = ShoutHost { calls: 0 };
    let result = evaluate(&expr, &Scope::new(json!({"a": "x"})), &mut host).unwrap();
    assert_eq!(result, json!("x!b!"));
    assert_eq!(host.calls, 2);
}
