//! The built-in and user-extensible function registry.
//!
//! Grounded on the teacher's `interpreter::run_fn_call` (match-on-name dispatch over a handful of
//! intrinsics), generalized into a signature-driven table since this language has 39 built-ins
//! instead of one (`print`), each with its own arity and parameter-type contract (§4.4).
mod builtins;

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::EvalError;
use crate::value::{ExprRef, Value};

/// A single accepted parameter shape. `Array` may additionally constrain its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Number,
    String,
    Boolean,
    Null,
    Array(Option<Box<ParamType>>),
    Object,
    Expref,
    Any,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::Number => value.is_number(),
            ParamType::String => matches!(value, Value::String(_)),
            ParamType::Boolean => matches!(value, Value::Bool(_)),
            ParamType::Null => value.is_null(),
            ParamType::Object => matches!(value, Value::Object(_)),
            ParamType::Expref => matches!(value, Value::Expref(_)),
            ParamType::Any => true,
            ParamType::Array(element) => match value {
                Value::Array(items) => match element {
                    None => true,
                    Some(elem_ty) => items.iter().all(|item| elem_ty.matches(item)),
                },
                _ => false,
            },
        }
    }

    fn name(&self) -> String {
        match self {
            ParamType::Number => "number".to_owned(),
            ParamType::String => "string".to_owned(),
            ParamType::Boolean => "boolean".to_owned(),
            ParamType::Null => "null".to_owned(),
            ParamType::Object => "object".to_owned(),
            ParamType::Expref => "expref".to_owned(),
            ParamType::Any => "any".to_owned(),
            ParamType::Array(None) => "array".to_owned(),
            ParamType::Array(Some(elem)) => format!("array[{}]", elem.name()),
        }
    }
}

/// One parameter position: a set of acceptable shapes, any one of which satisfies it.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub accepted: Vec<ParamType>,
}

impl ParamSpec {
    pub fn new(accepted: Vec<ParamType>) -> Self {
        Self { accepted }
    }

    pub fn one(ty: ParamType) -> Self {
        Self::new(vec![ty])
    }

    fn matches(&self, value: &Value) -> bool {
        self.accepted.iter().any(|ty| ty.matches(value))
    }

    fn describe(&self) -> String {
        self.accepted
            .iter()
            .map(ParamType::name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Context a native function body needs beyond its arguments: a way to invoke an `expref`
/// argument against an element, routed back through the evaluator that called the registry.
pub struct CallCtx<'a> {
    pub invoke_expref: &'a dyn Fn(&ExprRef, &Value) -> Result<Value, EvalError>,
}

pub type NativeFn = Rc<dyn Fn(&[Value], &CallCtx) -> Result<Value, EvalError>>;

/// A registered function: its fixed parameters, an optional trailing variadic parameter, and the
/// native implementation.
#[derive(Clone)]
pub struct FunctionDef {
    pub params: Vec<ParamSpec>,
    pub variadic: Option<ParamSpec>,
    pub call: NativeFn,
}

impl FunctionDef {
    fn arity_message(&self) -> String {
        match (&self.variadic, self.params.len()) {
            (Some(_), 0) => "at least 0 arguments".to_owned(),
            (Some(_), n) => format!("at least {n} arguments"),
            (None, n) => format!("{n} arguments"),
        }
    }

    fn check_arity(&self, got: usize) -> bool {
        match &self.variadic {
            Some(_) => got >= self.params.len(),
            None => got == self.params.len(),
        }
    }
}

/// A table of callable functions, keyed by name. Used both for the fixed built-in set and for a
/// caller-supplied overlay of custom functions that takes precedence over it.
#[derive(Clone, Default)]
pub struct Registry {
    functions: Rc<HashMap<String, FunctionDef>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            functions: Rc::new(HashMap::new()),
        }
    }

    pub fn from_map(functions: HashMap<String, FunctionDef>) -> Self {
        Self {
            functions: Rc::new(functions),
        }
    }

    /// The full built-in table (§4.4).
    pub fn builtins() -> Self {
        builtins::table()
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }
}

/// Resolve `name` against `custom` first, falling back to `builtins`, check arity and parameter
/// types, then invoke the implementation.
pub fn call(
    name: &str,
    args: Vec<Value>,
    custom: &Registry,
    builtins: &Registry,
    invoke_expref: &dyn Fn(&ExprRef, &Value) -> Result<Value, EvalError>,
) -> Result<Value, EvalError> {
    let def = custom
        .get(name)
        .or_else(|| builtins.get(name))
        .ok_or_else(|| EvalError::UnknownFunction { name: name.to_owned() })?;

    if !def.check_arity(args.len()) {
        return Err(EvalError::InvalidArity {
            function: name.to_owned(),
            expected: def.arity_message(),
            got: args.len(),
        });
    }

    for (idx, (arg, spec)) in args.iter().zip(def.params.iter()).enumerate() {
        if !spec.matches(arg) {
            return Err(EvalError::invalid_type_for(
                name,
                idx,
                format!("expected {}, got {}", spec.describe(), arg.type_name()),
            ));
        }
    }
    if let Some(variadic) = &def.variadic {
        for (idx, arg) in args.iter().enumerate().skip(def.params.len()) {
            if !variadic.matches(arg) {
                return Err(EvalError::invalid_type_for(
                    name,
                    idx,
                    format!("expected {}, got {}", variadic.describe(), arg.type_name()),
                ));
            }
        }
    }

    let ctx = CallCtx { invoke_expref };
    (def.call)(&args, &ctx)
}
