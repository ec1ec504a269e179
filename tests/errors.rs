use serde_json::json;

use jaffa_path::{CompileError, EvalError, Options, Value};

#[test]
fn empty_expression_is_rejected_before_lexing() {
    let err = jaffa_path::compile("");
    assert!(matches!(err, Err(CompileError::EmptyExpression)));
}

#[test]
fn an_unexpected_character_is_a_syntax_error() {
    let err = jaffa_path::compile("foo[0^]");
    assert!(matches!(err, Err(CompileError::Lexer(_)) | Err(CompileError::Parser(_))));
}

#[test]
fn calling_a_function_on_the_wrong_type_is_invalid_type() {
    let expr = jaffa_path::compile("length(`1`)").unwrap();
    let err = expr.search(Value::from(json!(null)), &Options::default());
    assert!(matches!(err, Err(EvalError::InvalidType { .. })));
}

#[test]
fn calling_an_unknown_function_is_unknown_function() {
    let expr = jaffa_path::compile("nope(@)").unwrap();
    let err = expr.search(Value::from(json!(null)), &Options::default());
    assert!(matches!(err, Err(EvalError::UnknownFunction { .. })));
}

#[test]
fn calling_with_the_wrong_arity_is_invalid_arity() {
    let expr = jaffa_path::compile("length(@, @)").unwrap();
    let err = expr.search(Value::from(json!(null)), &Options::default());
    assert!(matches!(err, Err(EvalError::InvalidArity { .. })));
}

#[test]
fn a_zero_slice_step_is_invalid_value() {
    let expr = jaffa_path::compile("[::0]").unwrap();
    let err = expr.search(Value::from(json!([1, 2, 3])), &Options::default());
    assert!(matches!(err, Err(EvalError::InvalidValue { .. })));
}

#[test]
fn syntax_errors_carry_an_offset() {
    match jaffa_path::compile("foo.") {
        Err(CompileError::Parser(parse_err)) => assert!(parse_err.offset > 0),
        other => panic!("expected a parse error, got {other:?}"),
    }
}
