//! The fixed table of built-in functions (§4.4).
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use super::{CallCtx, FunctionDef, NativeFn, ParamSpec, ParamType, Registry};
use crate::error::EvalError;
use crate::value::{OrderedMap, Value};

type Call = fn(&[Value], &CallCtx) -> Result<Value, EvalError>;

fn native(call: Call) -> NativeFn {
    Rc::new(call)
}

fn def(params: Vec<ParamType>, call: Call) -> FunctionDef {
    FunctionDef {
        params: params.into_iter().map(ParamSpec::one).collect(),
        variadic: None,
        call: native(call),
    }
}

fn def_any_of(params: Vec<Vec<ParamType>>, call: Call) -> FunctionDef {
    FunctionDef {
        params: params.into_iter().map(ParamSpec::new).collect(),
        variadic: None,
        call: native(call),
    }
}

fn def_variadic(params: Vec<ParamType>, variadic: ParamType, call: Call) -> FunctionDef {
    FunctionDef {
        params: params.into_iter().map(ParamSpec::one).collect(),
        variadic: Some(ParamSpec::one(variadic)),
        call: native(call),
    }
}

/// Like `def_variadic`, but the trailing (optional) parameter accepts more than one shape — used
/// for functions whose optional arguments are typed `number|null` rather than a single type.
fn def_optional_tail(params: Vec<ParamType>, tail_accepted: Vec<ParamType>, call: Call) -> FunctionDef {
    FunctionDef {
        params: params.into_iter().map(ParamSpec::one).collect(),
        variadic: Some(ParamSpec::new(tail_accepted)),
        call: native(call),
    }
}

fn array_of(ty: ParamType) -> ParamType {
    ParamType::Array(Some(Box::new(ty)))
}

pub fn table() -> Registry {
    let mut map: HashMap<String, FunctionDef> = HashMap::new();

    map.insert("abs".into(), def(vec![ParamType::Number], abs));
    map.insert("avg".into(), def(vec![array_of(ParamType::Number)], avg));
    map.insert("ceil".into(), def(vec![ParamType::Number], ceil));
    map.insert("floor".into(), def(vec![ParamType::Number], floor));
    map.insert(
        "contains".into(),
        def_any_of(
            vec![vec![ParamType::String, ParamType::Array(None)], vec![ParamType::Any]],
            contains,
        ),
    );
    map.insert(
        "ends_with".into(),
        def(vec![ParamType::String, ParamType::String], ends_with),
    );
    map.insert(
        "starts_with".into(),
        def(vec![ParamType::String, ParamType::String], starts_with),
    );
    map.insert(
        "find_first".into(),
        def_optional_tail(
            vec![ParamType::String, ParamType::String],
            vec![ParamType::Number, ParamType::Null],
            find_first,
        ),
    );
    map.insert(
        "find_last".into(),
        def_optional_tail(
            vec![ParamType::String, ParamType::String],
            vec![ParamType::Number, ParamType::Null],
            find_last,
        ),
    );
    map.insert("items".into(), def(vec![ParamType::Object], items));
    map.insert(
        "from_items".into(),
        def(vec![array_of(array_of(ParamType::Any))], from_items),
    );
    map.insert(
        "group_by".into(),
        def(vec![ParamType::Array(None), ParamType::Expref], group_by),
    );
    map.insert(
        "join".into(),
        def(vec![ParamType::String, array_of(ParamType::String)], join),
    );
    map.insert("keys".into(), def(vec![ParamType::Object], keys));
    map.insert("values".into(), def(vec![ParamType::Object], values));
    map.insert(
        "length".into(),
        def_any_of(
            vec![vec![ParamType::String, ParamType::Array(None), ParamType::Object]],
            length,
        ),
    );
    map.insert(
        "map".into(),
        def(vec![ParamType::Expref, ParamType::Array(None)], map_fn),
    );
    map.insert(
        "max".into(),
        def_any_of(
            vec![vec![array_of(ParamType::Number), array_of(ParamType::String)]],
            max,
        ),
    );
    map.insert(
        "min".into(),
        def_any_of(
            vec![vec![array_of(ParamType::Number), array_of(ParamType::String)]],
            min,
        ),
    );
    map.insert(
        "max_by".into(),
        def(vec![ParamType::Array(None), ParamType::Expref], max_by),
    );
    map.insert(
        "min_by".into(),
        def(vec![ParamType::Array(None), ParamType::Expref], min_by),
    );
    map.insert(
        "merge".into(),
        def_variadic(vec![], ParamType::Object, merge),
    );
    map.insert(
        "not_null".into(),
        def_variadic(vec![ParamType::Any], ParamType::Any, not_null),
    );
    map.insert(
        "pad_left".into(),
        def_optional_tail(
            vec![ParamType::String, ParamType::Number],
            vec![ParamType::String],
            pad_left,
        ),
    );
    map.insert(
        "pad_right".into(),
        def_optional_tail(
            vec![ParamType::String, ParamType::Number],
            vec![ParamType::String],
            pad_right,
        ),
    );
    map.insert(
        "replace".into(),
        def_optional_tail(
            vec![ParamType::String, ParamType::String, ParamType::String],
            vec![ParamType::Number, ParamType::Null],
            replace,
        ),
    );
    map.insert(
        "reverse".into(),
        def_any_of(vec![vec![ParamType::Array(None), ParamType::String]], reverse),
    );
    map.insert(
        "sort".into(),
        def_any_of(
            vec![vec![array_of(ParamType::Number), array_of(ParamType::String)]],
            sort,
        ),
    );
    map.insert(
        "sort_by".into(),
        def(vec![ParamType::Array(None), ParamType::Expref], sort_by),
    );
    map.insert(
        "split".into(),
        def_optional_tail(
            vec![ParamType::String, ParamType::String],
            vec![ParamType::Number, ParamType::Null],
            split,
        ),
    );
    map.insert("sum".into(), def(vec![array_of(ParamType::Number)], sum));
    map.insert("to_array".into(), def(vec![ParamType::Any], to_array));
    map.insert("to_number".into(), def(vec![ParamType::Any], to_number));
    map.insert("to_string".into(), def(vec![ParamType::Any], to_string_fn));
    map.insert("trim".into(), def(vec![ParamType::String], trim));
    map.insert("trim_left".into(), def(vec![ParamType::String], trim_left));
    map.insert("trim_right".into(), def(vec![ParamType::String], trim_right));
    map.insert("type".into(), def(vec![ParamType::Any], type_fn));
    map.insert(
        "zip".into(),
        def_variadic(vec![ParamType::Array(None)], ParamType::Array(None), zip),
    );
    map.insert("lower".into(), def(vec![ParamType::String], lower));
    map.insert("upper".into(), def(vec![ParamType::String], upper));

    Registry::from_map(map)
}

fn abs(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::Int(n) => Value::Int(n.abs()),
        Value::Float(f) => Value::Float(f.abs()),
        _ => unreachable!("checked by registry"),
    })
}

fn avg(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    if items.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = items.iter().filter_map(Value::as_f64).sum();
    Ok(Value::Float(total / items.len() as f64))
}

fn ceil(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let f = args[0].as_f64().expect("checked by registry");
    Ok(Value::Int(f.ceil() as i64))
}

fn floor(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let f = args[0].as_f64().expect("checked by registry");
    Ok(Value::Int(f.floor() as i64))
}

fn contains(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let found = match &args[0] {
        Value::String(subject) => match args[1].as_str() {
            Some(needle) => subject.contains(needle),
            None => false,
        },
        Value::Array(items) => items.contains(&args[1]),
        _ => unreachable!("checked by registry"),
    };
    Ok(Value::Bool(found))
}

fn ends_with(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let search = args[1].as_str().expect("checked by registry");
    Ok(Value::Bool(subject.ends_with(search)))
}

fn starts_with(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let search = args[1].as_str().expect("checked by registry");
    Ok(Value::Bool(subject.starts_with(search)))
}

fn clamp_range(len: usize, start: Option<i64>, end: Option<i64>) -> (usize, usize) {
    let clamp = |v: i64| -> usize {
        if v < 0 {
            0
        } else if v as usize > len {
            len
        } else {
            v as usize
        }
    };
    let start = start.map(clamp).unwrap_or(0);
    let end = end.map(clamp).unwrap_or(len);
    if start > end {
        (start, start)
    } else {
        (start, end)
    }
}

fn find_first(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let search = args[1].as_str().expect("checked by registry");
    let start = args.get(2).and_then(Value::as_f64).map(|f| f as i64);
    let end = args.get(3).and_then(Value::as_f64).map(|f| f as i64);
    let chars: Vec<char> = subject.chars().collect();
    let (from, to) = clamp_range(chars.len(), start, end);
    let window: String = chars[from..to].iter().collect();
    match window.find(search) {
        Some(byte_idx) => {
            let char_idx = window[..byte_idx].chars().count();
            Ok(Value::Int((from + char_idx) as i64))
        }
        None => Ok(Value::Null),
    }
}

fn find_last(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let search = args[1].as_str().expect("checked by registry");
    let start = args.get(2).and_then(Value::as_f64).map(|f| f as i64);
    let end = args.get(3).and_then(Value::as_f64).map(|f| f as i64);
    let chars: Vec<char> = subject.chars().collect();
    let (from, to) = clamp_range(chars.len(), start, end);
    let window: String = chars[from..to].iter().collect();
    match window.rfind(search) {
        Some(byte_idx) => {
            let char_idx = window[..byte_idx].chars().count();
            Ok(Value::Int((from + char_idx) as i64))
        }
        None => Ok(Value::Null),
    }
}

fn items(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let map = args[0].as_object().expect("checked by registry");
    Ok(Value::Array(
        map.iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.to_owned()), v.clone()]))
            .collect(),
    ))
}

fn from_items(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let pairs = args[0].as_array().expect("checked by registry");
    let mut map = OrderedMap::new();
    for pair in pairs {
        let elems = pair
            .as_array()
            .ok_or_else(|| EvalError::invalid_value("from_items requires [key, value] pairs"))?;
        if elems.len() != 2 {
            return Err(EvalError::invalid_value("from_items requires [key, value] pairs"));
        }
        let key = elems[0]
            .as_str()
            .ok_or_else(|| EvalError::invalid_value("from_items keys must be strings"))?;
        map.insert(key.to_owned(), elems[1].clone());
    }
    Ok(Value::Object(map))
}

fn group_by(args: &[Value], ctx: &CallCtx) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    let expref = match &args[1] {
        Value::Expref(e) => e,
        _ => unreachable!("checked by registry"),
    };
    let mut map = OrderedMap::new();
    for item in items {
        let key = (ctx.invoke_expref)(expref, item)?;
        let key = key
            .as_str()
            .ok_or_else(|| EvalError::invalid_value("group_by expression must return a string"))?
            .to_owned();
        match map.get(&key).cloned() {
            Some(Value::Array(mut bucket)) => {
                bucket.push(item.clone());
                map.insert(key, Value::Array(bucket));
            }
            _ => map.insert(key, Value::Array(vec![item.clone()])),
        }
    }
    Ok(Value::Object(map))
}

fn join(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let sep = args[0].as_str().expect("checked by registry");
    let items = args[1].as_array().expect("checked by registry");
    let parts: Vec<&str> = items.iter().map(|v| v.as_str().expect("checked by registry")).collect();
    Ok(Value::String(parts.join(sep)))
}

fn keys(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let map = args[0].as_object().expect("checked by registry");
    Ok(Value::Array(map.keys().map(|k| Value::String(k.to_owned())).collect()))
}

fn values(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let map = args[0].as_object().expect("checked by registry");
    Ok(Value::Array(map.values().cloned().collect()))
}

fn length(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => unreachable!("checked by registry"),
    };
    Ok(Value::Int(n as i64))
}

fn map_fn(args: &[Value], ctx: &CallCtx) -> Result<Value, EvalError> {
    let expref = match &args[0] {
        Value::Expref(e) => e,
        _ => unreachable!("checked by registry"),
    };
    let items = args[1].as_array().expect("checked by registry");
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push((ctx.invoke_expref)(expref, item)?);
    }
    Ok(Value::Array(out))
}

/// Ordering usable for `sort`/`max`/`min`: numbers compare numerically, strings lexicographically,
/// any other pairing (including a number against a string) is a value-level mismatch.
fn order_values(a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => a
            .partial_cmp_numeric(b)
            .ok_or_else(|| EvalError::invalid_value("cannot compare values of different types")),
    }
}

fn max(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    let mut best: Option<&Value> = None;
    for item in items {
        if let Some(current) = best {
            if order_values(item, current)? == Ordering::Greater {
                best = Some(item);
            }
        } else {
            best = Some(item);
        }
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn min(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    let mut best: Option<&Value> = None;
    for item in items {
        if let Some(current) = best {
            if order_values(item, current)? == Ordering::Less {
                best = Some(item);
            }
        } else {
            best = Some(item);
        }
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn max_by(args: &[Value], ctx: &CallCtx) -> Result<Value, EvalError> {
    by_extremum(args, ctx, Ordering::Greater)
}

fn min_by(args: &[Value], ctx: &CallCtx) -> Result<Value, EvalError> {
    by_extremum(args, ctx, Ordering::Less)
}

fn by_extremum(args: &[Value], ctx: &CallCtx, favor: Ordering) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    let expref = match &args[1] {
        Value::Expref(e) => e,
        _ => unreachable!("checked by registry"),
    };
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let key = (ctx.invoke_expref)(expref, item)?;
        if !(key.is_number() || key.as_str().is_some()) {
            return Err(EvalError::invalid_value(
                "max_by/min_by expression must return a number or string",
            ));
        }
        best = match best {
            None => Some((key, item.clone())),
            Some((best_key, best_item)) => {
                if order_values(&key, &best_key)? == favor {
                    Some((key, item.clone()))
                } else {
                    Some((best_key, best_item))
                }
            }
        };
    }
    Ok(best.map(|(_, item)| item).unwrap_or(Value::Null))
}

fn merge(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let mut out = OrderedMap::new();
    for arg in args {
        let map = arg.as_object().expect("checked by registry");
        for (k, v) in map.iter() {
            out.insert(k.to_owned(), v.clone());
        }
    }
    Ok(Value::Object(out))
}

fn not_null(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
}

fn pad_left(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    pad(args, true)
}

fn pad_right(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    pad(args, false)
}

fn pad(args: &[Value], left: bool) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let width = args[1].as_f64().expect("checked by registry") as usize;
    let pad_char = args
        .get(2)
        .and_then(Value::as_str)
        .unwrap_or(" ")
        .chars()
        .next()
        .unwrap_or(' ');
    let len = subject.chars().count();
    if len >= width {
        return Ok(Value::String(subject.to_owned()));
    }
    let filler: String = std::iter::repeat(pad_char).take(width - len).collect();
    Ok(Value::String(if left {
        format!("{filler}{subject}")
    } else {
        format!("{subject}{filler}")
    }))
}

fn replace(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let search = args[1].as_str().expect("checked by registry");
    let replacement = args[2].as_str().expect("checked by registry");
    let count = args.get(3).and_then(Value::as_f64).map(|f| f as usize);
    let result = match count {
        Some(n) => subject.replacen(search, replacement, n),
        None => subject.replace(search, replacement),
    };
    Ok(Value::String(result))
}

fn reverse(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::Array(items) => {
            let mut items = items.clone();
            items.reverse();
            Value::Array(items)
        }
        Value::String(s) => Value::String(s.chars().rev().collect()),
        _ => unreachable!("checked by registry"),
    })
}

fn sort(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let mut items = args[0].as_array().expect("checked by registry").to_vec();
    let mut failure = None;
    items.sort_by(|a, b| match order_values(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(Value::Array(items)),
    }
}

fn sort_by(args: &[Value], ctx: &CallCtx) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    let expref = match &args[1] {
        Value::Expref(e) => e,
        _ => unreachable!("checked by registry"),
    };
    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
    for item in items {
        let key = (ctx.invoke_expref)(expref, item)?;
        if !(key.is_number() || key.as_str().is_some()) {
            return Err(EvalError::invalid_value("sort_by expression must return a number or string"));
        }
        keyed.push((key, item.clone()));
    }
    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| match order_values(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(Value::Array(keyed.into_iter().map(|(_, item)| item).collect())),
    }
}

fn split(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let subject = args[0].as_str().expect("checked by registry");
    let sep = args[1].as_str().expect("checked by registry");
    let limit = args.get(2).and_then(Value::as_f64).map(|f| f as usize);
    let parts: Vec<&str> = match limit {
        Some(n) => subject.splitn(n + 1, sep).collect(),
        None => subject.split(sep).collect(),
    };
    Ok(Value::Array(parts.into_iter().map(|p| Value::String(p.to_owned())).collect()))
}

fn sum(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let items = args[0].as_array().expect("checked by registry");
    if items.iter().all(|v| matches!(v, Value::Int(_))) {
        let total: i64 = items
            .iter()
            .map(|v| match v {
                Value::Int(n) => *n,
                _ => unreachable!(),
            })
            .sum();
        Ok(Value::Int(total))
    } else {
        let total: f64 = items.iter().filter_map(Value::as_f64).sum();
        Ok(Value::Float(total))
    }
}

fn to_array(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::Array(_) => args[0].clone(),
        other => Value::Array(vec![other.clone()]),
    })
}

fn to_number(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::Int(_) | Value::Float(_) => args[0].clone(),
        Value::String(s) => {
            if let Ok(i) = s.parse::<i64>() {
                Value::Int(i)
            } else if let Ok(f) = s.parse::<f64>() {
                Value::Float(f)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    })
}

fn to_string_fn(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::String(s) => Value::String(s.clone()),
        other => {
            let json = serde_json::Value::try_from(other.clone())?;
            let encoded = serde_json::to_string(&json)
                .map_err(|err| EvalError::invalid_value(format!("to_string: {err}")))?;
            Value::String(encoded)
        }
    })
}

fn trim(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].as_str().expect("checked by registry").trim().to_owned()))
}

fn trim_left(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(Value::String(
        args[0].as_str().expect("checked by registry").trim_start().to_owned(),
    ))
}

fn trim_right(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(Value::String(
        args[0].as_str().expect("checked by registry").trim_end().to_owned(),
    ))
}

fn type_fn(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].type_name().to_owned()))
}

fn zip(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    let arrays: Vec<&[Value]> = args.iter().map(|v| v.as_array().expect("checked by registry")).collect();
    let len = arrays.iter().map(|a| a.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(Value::Array(arrays.iter().map(|a| a[i].clone()).collect()));
    }
    Ok(Value::Array(out))
}

fn lower(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].as_str().expect("checked by registry").to_lowercase()))
}

fn upper(args: &[Value], _ctx: &CallCtx) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].as_str().expect("checked by registry").to_uppercase()))
}
