use serde_json::json;

use jaffa_path::{Options, Value};

fn search(expr: &str, document: serde_json::Value) -> Value {
    let expr = jaffa_path::compile(expr).expect("expected a successful compile");
    expr.search(Value::from(document), &Options::default())
        .expect("expected a successful evaluation")
}

#[test]
fn length_counts_chars_not_bytes() {
    assert_eq!(search("length(@)", json!("héllo")), Value::Int(5));
    assert_eq!(search("length(@)", json!([1, 2, 3])), Value::Int(3));
    assert_eq!(search("length(@)", json!({"a": 1, "b": 2})), Value::Int(2));
}

#[test]
fn map_applies_expref_to_each_element() {
    let doc = json!([{"a": 1}, {"a": 2}, {"a": 3}]);
    assert_eq!(
        search("map(&a, @)", doc),
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn sort_by_orders_by_expref_key() {
    let doc = json!([{"age": 30}, {"age": 10}, {"age": 20}]);
    let result = search("sort_by(@, &age)", doc);
    let ages: Vec<i64> = result
        .as_array()
        .unwrap()
        .iter()
        .map(|v| match v.as_object().unwrap().get("age").unwrap() {
            Value::Int(n) => *n,
            other => panic!("expected an int, got {other:?}"),
        })
        .collect();
    assert_eq!(ages, vec![10, 20, 30]);
}

#[test]
fn group_by_buckets_on_string_key() {
    let doc = json!([{"kind": "a", "v": 1}, {"kind": "b", "v": 2}, {"kind": "a", "v": 3}]);
    let result = search("group_by(@, &kind)", doc);
    let map = result.as_object().unwrap();
    assert_eq!(map.get("a").unwrap().as_array().unwrap().len(), 2);
    assert_eq!(map.get("b").unwrap().as_array().unwrap().len(), 1);
}

#[test]
fn find_first_takes_optional_start_and_end() {
    assert_eq!(
        search("find_first(@, 'a')", json!("banana")),
        Value::Int(1)
    );
    assert_eq!(
        search("find_first(@, 'a', `2`)", json!("banana")),
        Value::Int(3)
    );
}

#[test]
fn merge_overlays_objects_left_to_right() {
    let doc = json!(null);
    let result = search("merge(`{\"a\":1,\"b\":1}`, `{\"b\":2,\"c\":3}`)", doc);
    let map = result.as_object().unwrap();
    assert_eq!(map.get("a"), Some(&Value::Int(1)));
    assert_eq!(map.get("b"), Some(&Value::Int(2)));
    assert_eq!(map.get("c"), Some(&Value::Int(3)));
}

#[test]
fn not_null_returns_the_first_non_null_argument() {
    let doc = json!(null);
    assert_eq!(search("not_null(@, `false`, `1`)", doc), Value::Bool(false));
}

#[test]
fn to_string_json_encodes_non_string_values() {
    let doc = json!(null);
    assert_eq!(search("to_string(`1.0`)", doc.clone()), Value::String("1.0".into()));
    assert_eq!(search("to_string(`[1, 2]`)", doc.clone()), Value::String("[1,2]".into()));
    assert_eq!(search("to_string(`true`)", doc), Value::String("true".into()));
}

#[test]
fn custom_function_overlays_a_built_in_name() {
    use jaffa_path::registry::{CallCtx, FunctionDef, ParamSpec, ParamType, Registry};
    use std::collections::HashMap;
    use std::rc::Rc;

    let mut functions = HashMap::new();
    functions.insert(
        "length".to_owned(),
        FunctionDef {
            params: vec![ParamSpec::one(ParamType::Any)],
            variadic: None,
            call: Rc::new(|_args: &[Value], _ctx: &CallCtx| Ok(Value::Int(-1))),
        },
    );
    let options = Options::new().with_custom_functions(Registry::from_map(functions));
    let expr = jaffa_path::compile("length(@)").unwrap();
    let result = expr.search(Value::from(json!([1, 2, 3])), &options).unwrap();
    assert_eq!(result, Value::Int(-1));
}
