//! A JMESPath-style query language: compile an expression once, search any number of documents
//! against it.
//!
//! Grounded on the teacher's top-level `lib.rs` (re-exporting its pipeline stages and exposing a
//! single `run` convenience entry point over a process-wide default); the same shape here exposes
//! [`compile`] and [`Expression::search`] over a shared default [`parser::Parser`].
pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod position;
pub mod registry;
pub mod scope;
pub mod value;

pub use ast::Ast;
pub use error::{CompileError, Error, EvalError, LexError, ParseError};
pub use options::Options;
pub use parser::Parser;
pub use value::Value;

use once_cell::unsync::Lazy;

/// A compiled expression, ready to be run against any number of documents via
/// [`Expression::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    ast: Ast,
    source: String,
}

impl Expression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Evaluate this expression against `document`, using `options` for function/scope behavior.
    pub fn search(&self, document: impl Into<Value>, options: &Options) -> Result<Value, EvalError> {
        eval::search(&self.ast, document.into(), options)
    }
}

// `Scopes`/`Value::Expref` hold `Rc`, so `Ast` (and anything containing it) is `!Send`/`!Sync` —
// consistent with the parse cache not being safe to share across threads without external
// synchronization. The default parser is therefore one-per-thread rather than one process-wide
// `Sync` static.
thread_local! {
    static DEFAULT_PARSER: Lazy<Parser> = Lazy::new(Parser::new);
}

/// Compile `text` into a reusable [`Expression`] using the default options and this thread's
/// shared parse cache.
pub fn compile(text: &str) -> Result<Expression, CompileError> {
    compile_with_options(text, &Options::default())
}

/// Compile `text` with caller-supplied options (custom functions, legacy literal toggle, dict
/// builder). The parse cache is shared across calls regardless of the options passed.
pub fn compile_with_options(text: &str, options: &Options) -> Result<Expression, CompileError> {
    let ast = DEFAULT_PARSER.with(|parser| parser.parse(text, options))?;
    Ok(Expression {
        ast,
        source: text.to_owned(),
    })
}

/// Compile `text` and immediately evaluate it against `document`, using default options.
///
/// A one-shot convenience for callers who won't reuse the expression; repeated calls with the
/// same `text` still benefit from the default parser's cache.
pub fn search(text: &str, document: impl Into<Value>) -> Result<Value, Error> {
    let expr = compile(text)?;
    let result = expr.search(document, &Options::default())?;
    Ok(result)
}

/// Number of entries currently held in this thread's default parse cache. Exposed for tests that
/// assert on cache behavior through the public `compile` entry point rather than constructing a
/// `Parser` directly.
pub fn default_cache_len() -> usize {
    DEFAULT_PARSER.with(|parser| parser.cache_len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compile_and_search_round_trip() {
        let expr = compile("foo.bar").unwrap();
        let result = expr
            .search(Value::from(json!({"foo": {"bar": 42}})), &Options::default())
            .unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn search_rejects_unparseable_expressions() {
        let err = search("foo..bar", Value::from(json!(null)));
        assert!(err.is_err());
    }

    #[test]
    fn empty_expression_is_a_compile_error() {
        let err = compile("");
        assert!(matches!(err, Err(CompileError::EmptyExpression)));
    }
}
