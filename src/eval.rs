//! The tree-walking evaluator (§4.3).
//!
//! Grounded on the teacher's `run_expression`/`run_binary_operation` (match on AST node kind,
//! recursing on children, threading an environment down), generalized from the teacher's single
//! flat variable environment to a lexical [`Scopes`] chain and a projection-aware dispatch table.
use std::collections::HashMap;

use crate::ast::{ArithmeticOp, Ast, Comparator, UnaryOp};
use crate::error::EvalError;
use crate::options::Options;
use crate::registry::{self, Registry};
use crate::scope::Scopes;
use crate::value::{ExprRef, Value};

/// Evaluate a compiled AST against `document`, building a fresh scope chain rooted at it.
pub fn search(ast: &Ast, document: Value, options: &Options) -> Result<Value, EvalError> {
    let scopes = Scopes::new(document);
    let builtins = Registry::builtins();
    let root = scopes.root().clone();
    eval(ast, &root, &scopes, options, &builtins)
}

/// Evaluate `node` with `current` in focus under `scopes`. `builtins` is rebuilt once per
/// top-level `search` call and threaded down rather than looked up globally, since [`Registry`]
/// holds `Rc` internals and cannot live behind a process-wide `Sync` static.
pub fn eval(
    node: &Ast,
    current: &Value,
    scopes: &Scopes,
    options: &Options,
    builtins: &Registry,
) -> Result<Value, EvalError> {
    match node {
        Ast::Current | Ast::Identity => Ok(current.clone()),
        Ast::Root => Ok(scopes.root().clone()),
        Ast::Field(name) => Ok(match current {
            Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        Ast::Index(i) => Ok(match current {
            Value::Array(items) => index_array(items, *i),
            _ => Value::Null,
        }),
        Ast::Slice { start, stop, step } => eval_slice(current, *start, *stop, *step),
        Ast::Literal(value) => Ok(value.clone()),
        Ast::Subexpression(l, r) => {
            let mid = eval(l, current, scopes, options, builtins)?;
            if mid.is_null() {
                Ok(Value::Null)
            } else {
                eval(r, &mid, scopes, options, builtins)
            }
        }
        Ast::IndexExpression(children) => {
            let mut acc = current.clone();
            for child in children {
                acc = eval(child, &acc, scopes, options, builtins)?;
            }
            Ok(acc)
        }
        Ast::Projection(l, r) => {
            let xs = eval(l, current, scopes, options, builtins)?;
            match xs {
                Value::Array(items) => {
                    let mut out = Vec::new();
                    for item in &items {
                        let v = eval(r, item, scopes, options, builtins)?;
                        if !v.is_null() {
                            out.push(v);
                        }
                    }
                    Ok(Value::Array(out))
                }
                _ => Ok(Value::Null),
            }
        }
        Ast::ValueProjection(l, r) => {
            let xs = eval(l, current, scopes, options, builtins)?;
            match xs {
                Value::Object(map) => {
                    let mut out = Vec::new();
                    for value in map.values() {
                        let v = eval(r, value, scopes, options, builtins)?;
                        if !v.is_null() {
                            out.push(v);
                        }
                    }
                    Ok(Value::Array(out))
                }
                _ => Ok(Value::Null),
            }
        }
        Ast::FilterProjection {
            source,
            predicate,
            projection,
        } => {
            let xs = eval(source, current, scopes, options, builtins)?;
            match xs {
                Value::Array(items) => {
                    let mut out = Vec::new();
                    for item in &items {
                        let keep = eval(predicate, item, scopes, options, builtins)?;
                        if !keep.is_truthy() {
                            continue;
                        }
                        let v = eval(projection, item, scopes, options, builtins)?;
                        if !v.is_null() {
                            out.push(v);
                        }
                    }
                    Ok(Value::Array(out))
                }
                _ => Ok(Value::Null),
            }
        }
        Ast::Flatten(l) => {
            let xs = eval(l, current, scopes, options, builtins)?;
            match xs {
                Value::Array(items) => {
                    let mut out = Vec::new();
                    for item in items {
                        match item {
                            Value::Array(inner) => out.extend(inner),
                            other => out.push(other),
                        }
                    }
                    Ok(Value::Array(out))
                }
                _ => Ok(Value::Null),
            }
        }
        Ast::MultiSelectList(children) => {
            if current.is_null() {
                return Ok(Value::Null);
            }
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                out.push(eval(child, current, scopes, options, builtins)?);
            }
            Ok(Value::Array(out))
        }
        Ast::MultiSelectDict(pairs) => {
            if current.is_null() {
                return Ok(Value::Null);
            }
            let mut entries = Vec::with_capacity(pairs.len());
            for kv in pairs {
                entries.push((kv.key.clone(), eval(&kv.value, current, scopes, options, builtins)?));
            }
            Ok(Value::Object((options.dict_cls)(entries)))
        }
        Ast::Comparator(op, l, r) => {
            let lv = eval(l, current, scopes, options, builtins)?;
            let rv = eval(r, current, scopes, options, builtins)?;
            Ok(compare(*op, &lv, &rv))
        }
        Ast::Or(l, r) => {
            let lv = eval(l, current, scopes, options, builtins)?;
            if lv.is_truthy() {
                Ok(lv)
            } else {
                eval(r, current, scopes, options, builtins)
            }
        }
        Ast::And(l, r) => {
            let lv = eval(l, current, scopes, options, builtins)?;
            if lv.is_truthy() {
                eval(r, current, scopes, options, builtins)
            } else {
                Ok(lv)
            }
        }
        Ast::Not(inner) => {
            let v = eval(inner, current, scopes, options, builtins)?;
            Ok(Value::Bool(!v.is_truthy()))
        }
        Ast::Pipe(l, r) => {
            let mid = eval(l, current, scopes, options, builtins)?;
            eval(r, &mid, scopes, options, builtins)
        }
        Ast::FunctionExpression { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, current, scopes, options, builtins)?);
            }
            log::trace!("resolving function '{name}' with {} argument(s)", values.len());
            let invoke = |expref: &ExprRef, arg: &Value| eval(&expref.ast, arg, &expref.scopes, options, builtins);
            registry::call(name, values, &options.custom_functions, builtins, &invoke)
        }
        Ast::Expref(inner) => Ok(Value::Expref(Box::new(ExprRef {
            ast: (**inner).clone(),
            scopes: scopes.clone(),
        }))),
        Ast::Arithmetic(op, l, r) => {
            let lv = eval(l, current, scopes, options, builtins)?;
            let rv = eval(r, current, scopes, options, builtins)?;
            arithmetic(*op, &lv, &rv)
        }
        Ast::ArithmeticUnary(op, inner) => {
            let v = eval(inner, current, scopes, options, builtins)?;
            Ok(match v.as_f64() {
                None => Value::Null,
                Some(_) => match op {
                    UnaryOp::Plus => v,
                    UnaryOp::Minus => negate(&v),
                },
            })
        }
        Ast::VariableRef(name) => Ok(scopes.lookup(name)),
        Ast::Let { bindings, body } => {
            let mut frame: HashMap<String, Value> = HashMap::new();
            for binding in bindings {
                let live = scopes.with_frame(frame.clone());
                let v = eval(&binding.value, current, &live, options, builtins)?;
                frame.insert(binding.name.clone(), v);
            }
            let body_scopes = scopes.with_frame(frame);
            eval(body, current, &body_scopes, options, builtins)
        }
        Ast::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            let c = eval(condition, current, scopes, options, builtins)?;
            if c.is_truthy() {
                eval(then_branch, current, scopes, options, builtins)
            } else {
                eval(else_branch, current, scopes, options, builtins)
            }
        }
    }
}

fn index_array(items: &[Value], i: i64) -> Value {
    let len = items.len() as i64;
    let j = if i < 0 { i + len } else { i };
    if j >= 0 && j < len {
        items[j as usize].clone()
    } else {
        Value::Null
    }
}

/// Adjust a slice's `(start, stop)` against a sequence of length `len`, following Python-style
/// slice semantics: out-of-range bounds clamp rather than error, and the defaults depend on the
/// sign of `step`.
fn adjust_slice(len: i64, start: Option<i64>, stop: Option<i64>, step: i64) -> (i64, i64) {
    let negative = step < 0;
    let cap = |s: i64| -> i64 {
        if s < 0 {
            let s = s + len;
            if s < 0 {
                if negative {
                    -1
                } else {
                    0
                }
            } else {
                s
            }
        } else if s >= len {
            if negative {
                len - 1
            } else {
                len
            }
        } else {
            s
        }
    };
    let start = start.map(cap).unwrap_or(if negative { len - 1 } else { 0 });
    let stop = stop.map(cap).unwrap_or(if negative { -1 } else { len });
    (start, stop)
}

fn slice_values(items: &[Value], start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Result<Vec<Value>, EvalError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::invalid_value("slice step cannot be 0"));
    }
    let len = items.len() as i64;
    let (start, stop) = adjust_slice(len, start, stop, step);
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            if i >= 0 && i < len {
                out.push(items[i as usize].clone());
            }
            i += step;
        }
    } else {
        while i > stop {
            if i >= 0 && i < len {
                out.push(items[i as usize].clone());
            }
            i += step;
        }
    }
    Ok(out)
}

fn eval_slice(current: &Value, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Result<Value, EvalError> {
    match current {
        Value::Array(items) => Ok(Value::Array(slice_values(items, start, stop, step)?)),
        Value::String(s) => {
            let chars: Vec<Value> = s.chars().map(|c| Value::String(c.to_string())).collect();
            let sliced = slice_values(&chars, start, stop, step)?;
            let out: String = sliced
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    _ => unreachable!("chars are always strings"),
                })
                .collect();
            Ok(Value::String(out))
        }
        _ => Ok(Value::Null),
    }
}

fn compare(op: Comparator, l: &Value, r: &Value) -> Value {
    match op {
        Comparator::Eq => Value::Bool(l == r),
        Comparator::Ne => Value::Bool(l != r),
        _ => match l.partial_cmp_numeric(r) {
            None => Value::Null,
            Some(ordering) => {
                let keep = match op {
                    Comparator::Lt => ordering.is_lt(),
                    Comparator::Lte => ordering.is_le(),
                    Comparator::Gt => ordering.is_gt(),
                    Comparator::Gte => ordering.is_ge(),
                    Comparator::Eq | Comparator::Ne => unreachable!("handled above"),
                };
                Value::Bool(keep)
            }
        },
    }
}

fn numeric_result(both_int: bool, v: f64) -> Value {
    if both_int && v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::Int(v as i64)
    } else {
        Value::Float(v)
    }
}

fn arithmetic(op: ArithmeticOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
        return Ok(Value::Null);
    };
    let both_int = matches!(l, Value::Int(_)) && matches!(r, Value::Int(_));
    Ok(match op {
        ArithmeticOp::Add => numeric_result(both_int, a + b),
        ArithmeticOp::Sub => numeric_result(both_int, a - b),
        ArithmeticOp::Mul => numeric_result(both_int, a * b),
        ArithmeticOp::Div => {
            if b == 0.0 {
                Value::Null
            } else {
                Value::Float(a / b)
            }
        }
        ArithmeticOp::FloorDiv => {
            if b == 0.0 {
                Value::Null
            } else {
                numeric_result(both_int, (a / b).floor())
            }
        }
        ArithmeticOp::Modulo => {
            if b == 0.0 {
                Value::Null
            } else {
                numeric_result(both_int, a - b * (a / b).floor())
            }
        }
    })
}

fn negate(v: &Value) -> Value {
    match v {
        Value::Int(n) => Value::Int(-n),
        Value::Float(f) => Value::Float(-f),
        _ => unreachable!("caller already confirmed this is a number"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Binding, KeyValue};
    use crate::value::OrderedMap;

    fn run(ast: Ast, document: Value) -> Result<Value, EvalError> {
        search(&ast, document, &Options::default())
    }

    #[test]
    fn field_chain_short_circuits_on_null() {
        let ast = Ast::Subexpression(
            Ast::Field("foo".into()).boxed(),
            Ast::Field("bar".into()).boxed(),
        );
        let doc = Value::Object(OrderedMap::from_pairs(vec![("foo".into(), Value::Null)]));
        assert_eq!(run(ast, doc).unwrap(), Value::Null);
    }

    #[test]
    fn index_negative_wraps_from_end() {
        let ast = Ast::Index(-1);
        let doc = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(run(ast, doc).unwrap(), Value::Int(3));
    }

    #[test]
    fn projection_drops_null_results() {
        let ast = Ast::Projection(
            Ast::Identity.boxed(),
            Ast::Field("b".into()).boxed(),
        );
        let doc = Value::Array(vec![
            Value::Object(OrderedMap::from_pairs(vec![("b".into(), Value::Int(1))])),
            Value::Object(OrderedMap::from_pairs(vec![("b".into(), Value::Null)])),
            Value::Object(OrderedMap::from_pairs(vec![("b".into(), Value::Int(3))])),
        ]);
        assert_eq!(
            run(ast, doc).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(3)])
        );
    }

    #[test]
    fn let_binding_is_sequential_and_does_not_escape() {
        let ast = Ast::Let {
            bindings: vec![
                Binding {
                    name: "a".into(),
                    value: Ast::Literal(Value::Int(1)),
                },
                Binding {
                    name: "b".into(),
                    value: Ast::Arithmetic(
                        ArithmeticOp::Add,
                        Ast::VariableRef("a".into()).boxed(),
                        Ast::Literal(Value::Int(1)).boxed(),
                    ),
                },
            ],
            body: Ast::MultiSelectList(vec![Ast::VariableRef("a".into()), Ast::VariableRef("b".into())]).boxed(),
        };
        assert_eq!(
            run(ast, Value::Null).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn ternary_picks_branch_by_truthiness() {
        let ast = Ast::Ternary {
            condition: Ast::Literal(Value::Bool(false)).boxed(),
            then_branch: Ast::Literal(Value::Int(1)).boxed(),
            else_branch: Ast::Literal(Value::Int(2)).boxed(),
        };
        assert_eq!(run(ast, Value::Null).unwrap(), Value::Int(2));
    }

    #[test]
    fn floor_div_and_modulo_follow_divisor_sign() {
        assert_eq!(
            arithmetic(ArithmeticOp::FloorDiv, &Value::Int(10), &Value::Int(3)).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            arithmetic(ArithmeticOp::Modulo, &Value::Int(10), &Value::Int(-3)).unwrap(),
            Value::Int(-2)
        );
    }

    #[test]
    fn division_by_zero_is_null() {
        assert_eq!(
            arithmetic(ArithmeticOp::Div, &Value::Int(1), &Value::Int(0)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn multi_select_dict_preserves_declaration_order() {
        let ast = Ast::MultiSelectDict(vec![
            KeyValue {
                key: "y".into(),
                value: Ast::Literal(Value::Int(1)),
            },
            KeyValue {
                key: "x".into(),
                value: Ast::Literal(Value::Int(2)),
            },
        ]);
        let result = run(ast, Value::Object(OrderedMap::new())).unwrap();
        let map = result.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["y", "x"]);
    }
}
