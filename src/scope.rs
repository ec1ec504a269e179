//! Lexical variable scoping.
//!
//! Grounded on the teacher's `interpreter::Scope` (`scope_stack: Vec<HashMap<..>>`, walked
//! back-to-front on lookup), extended with an immutable root document anchor addressed by `$`,
//! which the teacher's toy language has no equivalent of.
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// The lexical scope chain active during evaluation: a stack of `let`-introduced bindings plus
/// the document the search started from.
#[derive(Debug, Clone)]
pub struct Scopes {
    root: Rc<Value>,
    frames: Vec<Rc<HashMap<String, Value>>>,
}

impl Scopes {
    pub fn new(root: Value) -> Self {
        Self {
            root: Rc::new(root),
            frames: Vec::new(),
        }
    }

    /// The document passed to `search`, addressed by the `$` node and unaffected by any `let`.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a variable, walking frames from the most recently pushed back to the oldest.
    /// Absent names resolve to `null` rather than an error.
    pub fn lookup(&self, name: &str) -> Value {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return value.clone();
            }
        }
        Value::Null
    }

    /// Push a new binding frame, shadowing any outer binding of the same name, and return a new
    /// `Scopes` with it applied (the original chain is left untouched).
    pub fn with_frame(&self, frame: HashMap<String, Value>) -> Self {
        let mut frames = self.frames.clone();
        frames.push(Rc::new(frame));
        Self {
            root: Rc::clone(&self.root),
            frames,
        }
    }
}
