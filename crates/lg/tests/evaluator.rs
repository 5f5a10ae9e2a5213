//! Integration tests for template evaluation

use std::collections::BTreeSet;
use std::fs;

use lg::{
    EvaluationOptions, Evaluator, LineBreakStyle, Scope, TemplateError, Templates,
    compute_suggestions,
};
use serde_json::{Value, json};

fn eval(content: &str, name: &str, scope: Value) -> Result<Value, TemplateError> {
    Templates::parse_str(content).evaluate(name, scope)
}

fn eval_with(
    content: &str,
    name: &str,
    scope: Value,
    options: EvaluationOptions,
) -> Result<Value, TemplateError> {
    Templates::parse_str(content).evaluate_with_options(name, scope, &options)
}

fn strict() -> EvaluationOptions {
    EvaluationOptions::builder().strict(true).build()
}

// =============================================================================
// Normal Templates
// =============================================================================

#[test]
fn test_greet() {
    let value = eval("# greet(name)\n- Hello, ${name}!", "greet", json!({"name": "Ana"}));
    assert_eq!(value.unwrap(), json!("Hello, Ana!"));
}

#[test]
fn test_every_candidate_is_reachable() {
    let templates = Templates::parse_str("# pick\n- a\n- b\n- ${'c'}");
    let mut evaluator = Evaluator::new(&templates, EvaluationOptions::default())
        .unwrap()
        .with_seed(42);
    let mut seen = BTreeSet::new();
    for _ in 0..100 {
        let value = evaluator.evaluate("pick", &Scope::empty()).unwrap();
        seen.insert(value.as_str().unwrap().to_string());
    }
    let expected: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_seeded_evaluation_is_reproducible() {
    let templates = Templates::parse_str("# pick\n- a\n- b\n- c\n- d");
    let run = |seed| {
        let mut evaluator = Evaluator::new(&templates, EvaluationOptions::default())
            .unwrap()
            .with_seed(seed);
        (0..10)
            .map(|_| evaluator.evaluate("pick", &Scope::empty()).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn test_single_expression_keeps_type() {
    assert_eq!(eval("# n\n- ${1 + 2}", "n", json!({})).unwrap(), json!(3));
    assert_eq!(eval("# n\n- ${1 + 2} items", "n", json!({})).unwrap(), json!("3 items"));
    assert_eq!(
        eval("# o\n- ${user}", "o", json!({"user": {"a": 1}})).unwrap(),
        json!({"a": 1})
    );
}

#[test]
fn test_non_string_values_render_as_json() {
    let value = eval("# t\n- list: ${items}", "t", json!({"items": [1, 2]}));
    assert_eq!(value.unwrap(), json!("list: [1,2]"));
}

#[test]
fn test_empty_template_is_null() {
    assert_eq!(eval("# t", "t", json!({})).unwrap(), Value::Null);
}

// =============================================================================
// Conditionals and Switches
// =============================================================================

const WEATHER: &str = "# weather(temp)\n- IF: ${temp > 25}\n  - Hot\n- ELSE IF: ${temp > 10}\n  - Mild\n- ELSE:\n  - Cold";

#[test]
fn test_conditional_first_truthy_branch() {
    assert_eq!(eval(WEATHER, "weather", json!({"temp": 30})).unwrap(), json!("Hot"));
    assert_eq!(eval(WEATHER, "weather", json!({"temp": 20})).unwrap(), json!("Mild"));
    assert_eq!(eval(WEATHER, "weather", json!({"temp": 0})).unwrap(), json!("Cold"));
}

#[test]
fn test_conditional_without_match_is_null() {
    let content = "# t\n- IF: ${flag}\n  - yes";
    assert_eq!(eval(content, "t", json!({"flag": false})).unwrap(), Value::Null);
    assert_eq!(eval(content, "t", json!({"flag": "on"})).unwrap(), json!("yes"));
}

const COLOR: &str = "# color(c)\n- SWITCH: ${c}\n- CASE: ${'red'}\n  - stop\n- CASE: ${'green'}\n  - go\n- DEFAULT:\n  - wait";

#[test]
fn test_switch() {
    assert_eq!(eval(COLOR, "color", json!({"c": "red"})).unwrap(), json!("stop"));
    assert_eq!(eval(COLOR, "color", json!({"c": "green"})).unwrap(), json!("go"));
    assert_eq!(eval(COLOR, "color", json!({"c": "blue"})).unwrap(), json!("wait"));
}

#[test]
fn test_switch_compares_as_text() {
    let content = "# n(v)\n- SWITCH: ${v}\n- CASE: ${1}\n  - one\n- CASE: ${'2'}\n  - two";
    assert_eq!(eval(content, "n", json!({"v": 1})).unwrap(), json!("one"));
    assert_eq!(eval(content, "n", json!({"v": 2})).unwrap(), json!("two"));
    assert_eq!(eval(content, "n", json!({"v": 3})).unwrap(), Value::Null);
}

#[test]
fn test_default_not_last_fails_evaluation() {
    let content = "# t\n- SWITCH: ${c}\n- DEFAULT:\n  - x\n- CASE: ${1}\n  - y";
    match eval(content, "t", json!({})).unwrap_err() {
        TemplateError::Diagnostics { diagnostics } => {
            assert!(diagnostics[0].message.contains("DEFAULT must be the last case"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Structured Templates
// =============================================================================

#[test]
fn test_structured_template() {
    let content = "# card(name)\n[Card\n  Title = Hi ${name}\n  tags = a | b\n  count = ${2}\n]";
    let value = eval(content, "card", json!({"name": "Ana"})).unwrap();
    assert_eq!(
        value,
        json!({"lgType": "Card", "title": "Hi Ana", "tags": ["a", "b"], "count": 2})
    );
}

#[test]
fn test_structured_merge_never_overwrites() {
    let content = "# base\n[card\n  title = Base title\n  footer = Base footer\n]\n\n# other\n[Other\n  extra = nope\n]\n\n# card\n[Card\n  title = Own title\n  ${base()}\n  ${other()}\n]";
    let value = eval(content, "card", json!({})).unwrap();
    assert_eq!(
        value,
        json!({"lgType": "Card", "title": "Own title", "footer": "Base footer"})
    );
}

#[test]
fn test_structured_first_property_wins() {
    let content = "# card\n[Card\n  title = first\n  title = second\n]";
    let value = eval(content, "card", json!({})).unwrap();
    assert_eq!(value, json!({"lgType": "Card", "title": "first"}));
}

// =============================================================================
// Calls, Scope and Memoization
// =============================================================================

#[test]
fn test_zero_argument_call_inherits_scope() {
    let content = "# outer\n- ${inner()}\n# inner\n- ${who}";
    assert_eq!(eval(content, "outer", json!({"who": "me"})).unwrap(), json!("me"));
}

#[test]
fn test_callee_does_not_see_caller_locals() {
    let content = "# a\n- ${b('local')}\n# b(x)\n- ${c(1)}\n# c(y)\n- ${x}";
    assert_eq!(eval(content, "a", json!({"x": "global"})).unwrap(), json!("global"));
}

#[test]
fn test_template_function() {
    let content = "# greet(name)\n- Hello, ${name}!\n# t\n- ${template('greet', 'Bo')}";
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("Hello, Bo!"));
}

#[test]
fn test_call_dashed_template_name() {
    let content = "# my-t\n- hi\n\n# say-to(name)\n- to ${name}\n\n# b\n- ${my-t()} ${say-to(n)}";
    assert_eq!(eval(content, "b", json!({"n": "Al"})).unwrap(), json!("hi to Al"));
    assert!(Templates::parse_str(content).diagnostics().is_empty());
}

#[test]
fn test_is_template() {
    let content = "# a\n- x\n# t\n- ${isTemplate('a')} ${isTemplate('b')}";
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("true false"));
}

#[test]
fn test_dynamic_argument_count_mismatch() {
    let content = "# greet(name)\n- Hi ${name}\n# t\n- ${template(target, 'a', 'b')}";
    assert_eq!(
        eval(content, "t", json!({"target": "greet"})).unwrap_err(),
        TemplateError::ArgumentCount {
            template: "greet".to_string(),
            expected: 1,
            got: 2,
        }
    );
}

#[test]
fn test_memoized_within_caller() {
    let templates = Templates::parse_str("# pair\n- ${coin()}-${coin()}\n\n# coin\n- x\n- y");
    let mut evaluator = Evaluator::new(&templates, EvaluationOptions::default())
        .unwrap()
        .with_seed(3);
    for _ in 0..20 {
        let value = evaluator.evaluate("pair", &Scope::empty()).unwrap();
        let (left, right) = value.as_str().unwrap().split_once('-').unwrap();
        assert_eq!(left, right);
    }
}

#[test]
fn test_rerun_skips_memo() {
    let templates = Templates::parse_str("# pair\n- ${coin!()}-${coin!()}\n\n# coin\n- x\n- y");
    let mut evaluator = Evaluator::new(&templates, EvaluationOptions::default())
        .unwrap()
        .with_seed(3);
    let differing = (0..50)
        .map(|_| evaluator.evaluate("pair", &Scope::empty()).unwrap())
        .filter(|value| {
            let (left, right) = value.as_str().unwrap().split_once('-').unwrap();
            left != right
        })
        .count();
    assert!(differing > 0);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_template_not_found_suggests() {
    let error = eval("# greet\n- hi", "gret", json!({})).unwrap_err();
    assert_eq!(
        error,
        TemplateError::TemplateNotFound {
            name: "gret".to_string(),
            suggestions: vec!["greet".to_string()],
        }
    );
    assert!(error.to_string().contains("did you mean: greet?"));
}

#[test]
fn test_compute_suggestions() {
    let available = vec!["greet".to_string(), "great".to_string(), "other".to_string()];
    assert_eq!(compute_suggestions("gret", &available), vec!["great", "greet"]);
    assert!(compute_suggestions("greet", &available).iter().all(|s| s != "greet"));
    assert!(compute_suggestions("xyz", &available).is_empty());
}

#[test]
fn test_loop_detected_with_chain() {
    let templates = Templates::parse_str("# a\n- ${b()}\n# b\n- x ${a()}");
    let mut evaluator = Evaluator::new(&templates, EvaluationOptions::default()).unwrap();
    let expected = TemplateError::LoopDetected {
        chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
    };
    assert_eq!(evaluator.evaluate("a", &Scope::empty()).unwrap_err(), expected);
    // The stack is unwound, so the second run reports the same chain.
    assert_eq!(evaluator.evaluate("a", &Scope::empty()).unwrap_err(), expected);
    assert_eq!(expected.to_string(), "loop detected: a => b => a");
}

#[test]
fn test_self_loop() {
    let error = eval("# a\n- ${a!()}", "a", json!({})).unwrap_err();
    assert_eq!(
        error,
        TemplateError::LoopDetected {
            chain: vec!["a".to_string(), "a".to_string()],
        }
    );
}

#[test]
fn test_errors_in_nested_templates_keep_inner_context() {
    let content = "# outer\n- ${inner()}\n# inner\n- ${missing}";
    let error = eval_with(content, "outer", json!({}), strict()).unwrap_err();
    assert_eq!(error.to_string(), "[inner]: 'missing' evaluated to null");
}

// =============================================================================
// Strict and Lenient Modes
// =============================================================================

#[test]
fn test_lenient_null_renders_as_null() {
    let value = eval("# t\n- Hi ${user.name}", "t", json!({})).unwrap();
    assert_eq!(value, json!("Hi null"));
}

#[test]
fn test_strict_null_fails_with_context() {
    let error = eval_with("# t\n- Hi ${user.name}", "t", json!({}), strict()).unwrap_err();
    match &error {
        TemplateError::Expression { context, message } => {
            assert_eq!(context, "[t]");
            assert!(message.contains("user.name"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_strict_from_file_option() {
    let content = "> !# @strict = true\n# t\n- ${missing}";
    assert!(eval(content, "t", json!({})).is_err());
    let lenient = EvaluationOptions::builder().strict(false).build();
    assert_eq!(eval_with(content, "t", json!({}), lenient).unwrap(), Value::Null);
}

#[test]
fn test_null_substitution() {
    let options = EvaluationOptions::builder()
        .null_substitution("<${path}>")
        .build();
    let value = eval_with("# t\n- Hi ${user.name}", "t", json!({}), options).unwrap();
    assert_eq!(value, json!("Hi <user.name>"));
}

#[test]
fn test_null_substitution_from_file() {
    let content = "> !# @replaceNull = ?\n# t\n- Hi ${user.name}";
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("Hi ?"));
}

#[test]
fn test_lenient_failure_substituted() {
    let content = "> !# @replaceNull = [${path}]\n# t\n- value ${nope(1)}";
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("value [nope(1)]"));
}

#[test]
fn test_lenient_failure_without_substitution_raises() {
    let error = eval("# t\n- value ${nope(1)}", "t", json!({})).unwrap_err();
    match error {
        TemplateError::Expression { context, message } => {
            assert_eq!(context, "[t]");
            assert!(message.contains("nope"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_condition_context() {
    let content = "# t\n- IF: ${x}\n  - yes\n- ELSE:\n  - no";
    let error = eval_with(content, "t", json!({}), strict()).unwrap_err();
    assert_eq!(error.to_string(), "[t] Condition 'x': 'x' evaluated to null");
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("no"));
}

#[test]
fn test_lenient_failing_condition_is_false() {
    let content = "# t\n- IF: ${nope(1)}\n  - yes\n- ELSE:\n  - no";
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("no"));
    assert!(eval_with(content, "t", json!({}), strict()).is_err());
}

#[test]
fn test_property_context() {
    let content = "# card\n[Card\n  title = ${missing}\n]";
    let error = eval_with(content, "card", json!({}), strict()).unwrap_err();
    assert!(error.to_string().starts_with("[card] Property 'title'"));
}

// =============================================================================
// Line Breaks
// =============================================================================

#[test]
fn test_markdown_line_breaks() {
    let content = "# t\n- ```a\nb```";
    let options = EvaluationOptions::builder()
        .line_break_style(LineBreakStyle::Markdown)
        .build();
    assert_eq!(eval_with(content, "t", json!({}), options).unwrap(), json!("a\n\nb"));
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("a\nb"));
}

#[test]
fn test_markdown_from_file_option() {
    let content = "> !# @lineBreakStyle = markdown\n# t\n- a\\nb";
    assert_eq!(eval(content, "t", json!({})).unwrap(), json!("a\n\nb"));
}

// =============================================================================
// Inline Text and Built-in Functions
// =============================================================================

#[test]
fn test_evaluate_text() {
    let templates = Templates::parse_str("# greet(name)\n- Hello, ${name}!");
    let value = templates
        .evaluate_text("${greet('Ana')} How are you?", json!({}))
        .unwrap();
    assert_eq!(value, json!("Hello, Ana! How are you?"));
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("body.txt"), "Hi ${name}").unwrap();
    fs::write(
        dir.path().join("root.lg"),
        "# t\n- ${fromFile('body.txt')}\n# raw\n- ${fromFile('body.txt', 'raw')}",
    )
    .unwrap();

    let templates = Templates::parse_file(dir.path().join("root.lg")).unwrap();
    let scope = json!({"name": "Ana"});
    assert_eq!(templates.evaluate("t", scope.clone()).unwrap(), json!("Hi Ana"));
    assert_eq!(templates.evaluate("raw", scope).unwrap(), json!("Hi ${name}"));
}

#[test]
fn test_from_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("root.lg"), "# t\n- ${fromFile('none.txt')}").unwrap();
    let templates = Templates::parse_file(dir.path().join("root.lg")).unwrap();
    assert!(matches!(
        templates.evaluate("t", json!({})),
        Err(TemplateError::File { .. })
    ));
}

#[test]
fn test_activity_attachment() {
    let content = "# t\n- ${ActivityAttachment('body', 'text/plain')}";
    assert_eq!(
        eval(content, "t", json!({})).unwrap(),
        json!({"lgType": "attachment", "contenttype": "text/plain", "content": "body"})
    );
}
