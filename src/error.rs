//! Diagnostic kinds surfaced by the lexer, parser and evaluator.
//!
//! Follows the teacher's manual `Display`/`Error` style (`ast::ParseError`,
//! `loader::FileLoadError`) rather than a derive-macro crate: every externally visible kind
//! carries enough position/context to reproduce the failure, and nothing more.
use std::fmt::{self, Display};

/// Failure to tokenize the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    /// The offending character, when one single character triggered the failure.
    pub character: Option<char>,
    pub message: String,
}

impl Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.character {
            Some(c) => write!(f, "{} at offset {} (near '{}')", self.message, self.offset, c),
            None => write!(f, "{} at offset {}", self.message, self.offset),
        }
    }
}

impl std::error::Error for LexError {}

/// Failure to parse a token stream into an AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub token: String,
    pub expected: Option<String>,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}, found '{}'", self.message, self.offset, self.token)?;
        if let Some(expected) = &self.expected {
            write!(f, ", expected {expected}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Any failure while turning source text into a compiled [`crate::Expression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    EmptyExpression,
    Lexer(LexError),
    Parser(ParseError),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::EmptyExpression => write!(f, "invalid empty expression"),
            CompileError::Lexer(err) => write!(f, "{err}"),
            CompileError::Parser(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(value: LexError) -> Self {
        CompileError::Lexer(value)
    }
}

impl From<ParseError> for CompileError {
    fn from(value: ParseError) -> Self {
        CompileError::Parser(value)
    }
}

/// Any failure raised while evaluating a compiled expression against a document.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    InvalidType {
        message: String,
        function: Option<String>,
        param_index: Option<usize>,
    },
    InvalidArity {
        function: String,
        expected: String,
        got: usize,
    },
    UnknownFunction {
        name: String,
    },
    InvalidValue {
        message: String,
    },
}

impl EvalError {
    pub fn invalid_type(message: impl Into<String>) -> Self {
        EvalError::InvalidType {
            message: message.into(),
            function: None,
            param_index: None,
        }
    }

    pub fn invalid_type_for(function: &str, param_index: usize, message: impl Into<String>) -> Self {
        EvalError::InvalidType {
            message: message.into(),
            function: Some(function.to_owned()),
            param_index: Some(param_index),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        EvalError::InvalidValue {
            message: message.into(),
        }
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::InvalidType {
                message,
                function,
                param_index,
            } => match (function, param_index) {
                (Some(name), Some(idx)) => {
                    write!(f, "invalid type for argument {idx} of '{name}': {message}")
                }
                _ => write!(f, "invalid type: {message}"),
            },
            EvalError::InvalidArity {
                function,
                expected,
                got,
            } => write!(
                f,
                "invalid arity calling '{function}': expected {expected}, got {got}"
            ),
            EvalError::UnknownFunction { name } => write!(f, "unknown function: {name}"),
            EvalError::InvalidValue { message } => write!(f, "invalid value: {message}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Every error this crate can produce, spanning compile time and evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Compile(CompileError),
    Eval(EvalError),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile(err) => write!(f, "{err}"),
            Error::Eval(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<CompileError> for Error {
    fn from(value: CompileError) -> Self {
        Error::Compile(value)
    }
}

impl From<EvalError> for Error {
    fn from(value: EvalError) -> Self {
        Error::Eval(value)
    }
}
