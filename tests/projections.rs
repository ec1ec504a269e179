use serde_json::json;

use jaffa_path::{Options, Value};

fn search(expr: &str, document: serde_json::Value) -> Value {
    let expr = jaffa_path::compile(expr).expect("expected a successful compile");
    expr.search(Value::from(document), &Options::default())
        .expect("expected a successful evaluation")
}

#[test]
fn field_chain_short_circuits_through_null() {
    let doc = json!({"foo": {"bar": {"baz": 42}}});
    assert_eq!(search("foo.bar.baz", doc), Value::Int(42));

    let doc = json!({"foo": {"bar": null}});
    assert_eq!(search("foo.bar.baz", doc), Value::Null);
}

#[test]
fn list_projection_drops_null_continuation_results() {
    let doc = json!({"a": [{"b": 1}, {"b": 2}, {"b": null}, {"b": 3}]});
    assert_eq!(search("a[*].b | [0]", doc), Value::Int(1));
}

#[test]
fn filter_projection_keeps_matching_elements() {
    let doc = json!([{"name": "x", "price": 5}, {"name": "y", "price": 20}]);
    assert_eq!(
        search("[?price > `10`].name", doc),
        Value::Array(vec![Value::String("y".into())])
    );
}

#[test]
fn flatten_splices_one_level_of_nested_arrays() {
    let doc = json!([[1, 2], [3], 4]);
    assert_eq!(
        search("[]", doc),
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)])
    );
}

#[test]
fn value_projection_iterates_object_values() {
    let doc = json!({"a": {"x": 1}, "b": {"x": 2}, "c": {"x": 3}});
    assert_eq!(
        search("*.x", doc),
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn slice_with_negative_step_reverses() {
    let doc = json!([0, 1, 2, 3, 4]);
    assert_eq!(
        search("[::-1]", doc),
        Value::Array(vec![
            Value::Int(4),
            Value::Int(3),
            Value::Int(2),
            Value::Int(1),
            Value::Int(0),
        ])
    );
}

#[test]
fn multi_select_list_and_dict_preserve_declared_order() {
    let doc = json!({"a": 1, "b": 2});
    assert_eq!(
        search("[a, b]", doc.clone()),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
    let result = search("{second: b, first: a}", doc);
    match result {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().collect();
            assert_eq!(keys, vec!["second", "first"]);
        }
        other => panic!("expected an object, got {other:?}"),
    }
}
