use serde_json::json;

use jaffa_path::{Options, Value};

fn search(expr: &str, document: serde_json::Value) -> Value {
    let expr = jaffa_path::compile(expr).expect("expected a successful compile");
    expr.search(Value::from(document), &Options::default())
        .expect("expected a successful evaluation")
}

#[test]
fn literal_equality_compares_across_quoting_styles() {
    assert_eq!(search("`\"a\"` == 'a'", json!(null)), Value::Bool(true));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(search("1 + 2 * 3", json!(null)), Value::Int(7));
}

#[test]
fn floor_division_truncates_toward_negative_infinity() {
    assert_eq!(search("10 // 3", json!(null)), Value::Int(3));
}

#[test]
fn modulo_follows_the_divisor_sign() {
    assert_eq!(search("10 % -3", json!(null)), Value::Int(-2));
}

#[test]
fn division_by_zero_is_null_not_an_error() {
    let expr = jaffa_path::compile("1 / `0`").unwrap();
    let result = expr.search(Value::from(json!(null)), &Options::default()).unwrap();
    assert_eq!(result, Value::Null);
}

#[test]
fn ternary_picks_a_branch_by_truthiness() {
    assert_eq!(search("`true` ? 'yes' : 'no'", json!(null)), Value::String("yes".into()));
    assert_eq!(search("`false` ? 'yes' : 'no'", json!(null)), Value::String("no".into()));
}

#[test]
fn and_or_short_circuit_and_return_the_deciding_operand() {
    assert_eq!(search("`0` || 'fallback'", json!(null)), Value::String("fallback".into()));
    assert_eq!(search("'x' && `42`", json!(null)), Value::Int(42));
}

#[test]
fn numeric_equality_holds_across_int_and_float() {
    assert_eq!(search("`1` == `1.0`", json!(null)), Value::Bool(true));
    assert_eq!(search("contains(`[1, 2]`, `1.0`)", json!(null)), Value::Bool(true));
}

#[test]
fn nested_ternary_is_right_associative() {
    assert_eq!(search("`false` ? 'a' : `true` ? 'b' : 'c'", json!(null)), Value::String("b".into()));
}
