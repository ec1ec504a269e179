use serde_json::json;

use jaffa_path::{Options, Value};

fn search(expr: &str, document: serde_json::Value) -> Value {
    let expr = jaffa_path::compile(expr).expect("expected a successful compile");
    expr.search(Value::from(document), &Options::default())
        .expect("expected a successful evaluation")
}

#[test]
fn let_binding_is_visible_in_its_body() {
    let doc = json!([10, 20, 30]);
    assert_eq!(
        search("let $n = length(@) in [0, $n]", doc),
        Value::Array(vec![Value::Int(0), Value::Int(3)])
    );
}

#[test]
fn later_bindings_see_earlier_ones_but_not_the_reverse() {
    let doc = json!(null);
    assert_eq!(
        search("let $a = `1`, $b = $a in $b", doc),
        Value::Int(1)
    );
}

#[test]
fn let_binding_shadows_an_outer_binding_inside_nested_let() {
    let doc = json!(null);
    let result = search("let $x = `1` in let $x = `2` in $x", doc);
    assert_eq!(result, Value::Int(2));
}

#[test]
fn let_binding_does_not_leak_outside_its_body() {
    let doc = json!(null);
    // `$x` outside the `let` body resolves to null rather than the bound value.
    assert_eq!(search("[let $x = `1` in $x, $x]", doc), Value::Array(vec![Value::Int(1), Value::Null]));
}

#[test]
fn root_anchor_is_unaffected_by_let() {
    let doc = json!({"a": 1});
    assert_eq!(search("let $a = `99` in $.a", doc), Value::Int(1));
}
