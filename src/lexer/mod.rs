//! Hand-written scanner: source text to a flat token stream.
//!
//! Grounded on the teacher's `lexer::Lexer` (`src/lexer/mod.rs`): a struct wrapping a
//! `Peekable<CharIndices>`, one handler function per leading-character class, called in a loop
//! until the input is exhausted. The teacher's lexer only needed three classes (alphanumeric,
//! numeric, "everything else"); this one adds the two literal-fence sub-scanners required by
//! §4.1 of the spec.
mod token;

pub use token::{Token, TokenKind, TokenValue};

use std::iter::Peekable;
use std::str::CharIndices;

use log::trace;

use crate::error::{CompileError, LexError};
use crate::options::Options;
use crate::position::Span;
use crate::value::Value;

const UNICODE_MINUS: char = '\u{2212}';
const LINE_SEPARATOR: char = '\u{2028}';
const PARAGRAPH_SEPARATOR: char = '\u{2029}';

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    enable_legacy_literals: bool,
    /// Whether the most recently emitted token could end a primary expression. Used to
    /// disambiguate a leading `-` between a signed-number literal and the `minus` operator.
    prev_is_value_like: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, options: &Options) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            enable_legacy_literals: options.enable_legacy_literals,
            prev_is_value_like: false,
        }
    }

    pub fn tokenize(source: &'a str, options: &Options) -> Result<Vec<Token>, CompileError> {
        if source.is_empty() {
            return Err(CompileError::EmptyExpression);
        }
        let mut lexer = Self::new(source, options);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            lexer.prev_is_value_like = is_value_like(token.kind);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace();

        let Some((start, c)) = self.bump() else {
            let end = self.source.len();
            return Ok(Token::new(TokenKind::Eof, TokenValue::None, Span::new(end, end)));
        };

        trace!("lexing at offset {start}, leading char '{c}'");

        match c {
            '.' => Ok(self.simple(TokenKind::Dot, start)),
            '@' => Ok(self.simple(TokenKind::At, start)),
            '$' => Ok(self.lex_dollar(start)),
            '*' => Ok(self.simple(TokenKind::Star, start)),
            '\u{d7}' => Ok(self.simple(TokenKind::Multiply, start)),
            '\u{f7}' => Ok(self.simple(TokenKind::Divide, start)),
            UNICODE_MINUS => Ok(self.simple(TokenKind::Minus, start)),
            '+' => Ok(self.simple(TokenKind::Plus, start)),
            '-' => self.lex_minus(start),
            '/' => Ok(self.lex_slash(start)),
            '%' => Ok(self.simple(TokenKind::Modulo, start)),
            '(' => Ok(self.simple(TokenKind::LParen, start)),
            ')' => Ok(self.simple(TokenKind::RParen, start)),
            '{' => Ok(self.simple(TokenKind::LBrace, start)),
            '}' => Ok(self.simple(TokenKind::RBrace, start)),
            '[' => Ok(self.lex_lbracket(start)),
            ']' => Ok(self.simple(TokenKind::RBracket, start)),
            ',' => Ok(self.simple(TokenKind::Comma, start)),
            ':' => Ok(self.simple(TokenKind::Colon, start)),
            '?' => Ok(self.simple(TokenKind::Question, start)),
            '&' => Ok(self.lex_amp(start)),
            '|' => Ok(self.lex_pipe(start)),
            '!' => Ok(self.lex_bang(start)),
            '=' => Ok(self.lex_eq(start)),
            '<' => Ok(self.lex_lt(start)),
            '>' => Ok(self.lex_gt(start)),
            '`' => self.lex_literal(start),
            '\'' => self.lex_raw_string(start),
            '"' => self.lex_quoted_identifier(start),
            '0'..='9' => Ok(self.lex_number(start, false, Some(c))),
            'A'..='Z' | 'a'..='z' | '_' => Ok(self.lex_identifier(start)),
            other => Err(CompileError::Lexer(LexError {
                offset: start,
                character: Some(other),
                message: "unrecognized character".to_owned(),
            })),
        }
    }

    fn simple(&self, kind: TokenKind, start: usize) -> Token {
        let end = start + self.char_len_at(start);
        Token::new(kind, TokenValue::None, Span::new(start, end))
    }

    fn char_len_at(&self, start: usize) -> usize {
        self.source[start..].chars().next().map(char::len_utf8).unwrap_or(0)
    }

    fn lex_dollar(&mut self, start: usize) -> Token {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let text = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let end = start + 1 + text.len();
                let mut name = String::with_capacity(text.len() + 1);
                name.push('$');
                name.push_str(&text);
                Token::new(TokenKind::Variable, TokenValue::Str(name), Span::new(start, end))
            }
            _ => Token::new(TokenKind::Root, TokenValue::None, Span::new(start, start + 1)),
        }
    }

    fn lex_minus(&mut self, start: usize) -> Result<Token, CompileError> {
        if !self.prev_is_value_like && matches!(self.peek(), Some('0'..='9')) {
            Ok(self.lex_number(start, true, None))
        } else {
            Ok(Token::new(TokenKind::Minus, TokenValue::None, Span::new(start, start + 1)))
        }
    }

    fn lex_slash(&mut self, start: usize) -> Token {
        if self.peek() == Some('/') {
            self.bump();
            Token::new(TokenKind::Div, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Divide, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_lbracket(&mut self, start: usize) -> Token {
        match self.peek() {
            Some(']') => {
                self.bump();
                Token::new(TokenKind::Flatten, TokenValue::None, Span::new(start, start + 2))
            }
            Some('?') => {
                self.bump();
                Token::new(TokenKind::Filter, TokenValue::None, Span::new(start, start + 2))
            }
            _ => Token::new(TokenKind::LBracket, TokenValue::None, Span::new(start, start + 1)),
        }
    }

    fn lex_amp(&mut self, start: usize) -> Token {
        if self.peek() == Some('&') {
            self.bump();
            Token::new(TokenKind::And, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Expref, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_pipe(&mut self, start: usize) -> Token {
        if self.peek() == Some('|') {
            self.bump();
            Token::new(TokenKind::Or, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Pipe, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_bang(&mut self, start: usize) -> Token {
        if self.peek() == Some('=') {
            self.bump();
            Token::new(TokenKind::Ne, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Not, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_eq(&mut self, start: usize) -> Token {
        if self.peek() == Some('=') {
            self.bump();
            Token::new(TokenKind::Eq, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Assign, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_lt(&mut self, start: usize) -> Token {
        if self.peek() == Some('=') {
            self.bump();
            Token::new(TokenKind::Lte, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Lt, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_gt(&mut self, start: usize) -> Token {
        if self.peek() == Some('=') {
            self.bump();
            Token::new(TokenKind::Gte, TokenValue::None, Span::new(start, start + 2))
        } else {
            Token::new(TokenKind::Gt, TokenValue::None, Span::new(start, start + 1))
        }
    }

    fn lex_number(&mut self, start: usize, negative: bool, first_digit: Option<char>) -> Token {
        let mut digits = String::new();
        if let Some(c) = first_digit {
            digits.push(c);
        }
        digits.push_str(&self.consume_while(|c| c.is_ascii_digit()));
        let magnitude: i64 = digits.parse().unwrap_or(0);
        let value = if negative { -magnitude } else { magnitude };
        let end = start + (if negative { 1 } else { 0 }) + digits.len();
        Token::new(TokenKind::Number, TokenValue::Int(value), Span::new(start, end))
    }

    fn lex_identifier(&mut self, start: usize) -> Token {
        let rest = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let end = start + 1 + rest.len();
        let mut text = self.source[start..start + 1].to_owned();
        text.push_str(&rest);
        let kind = match text.as_str() {
            "let" => TokenKind::Let,
            "in" => TokenKind::In,
            _ => TokenKind::UnquotedIdentifier,
        };
        let value = match kind {
            TokenKind::UnquotedIdentifier => TokenValue::Str(text),
            _ => TokenValue::None,
        };
        Token::new(kind, value, Span::new(start, end))
    }

    /// Consume characters matching `predicate` and return the text consumed.
    fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut buf = String::new();
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            buf.push(c);
            self.bump();
        }
        buf
    }

    fn lex_quoted_identifier(&mut self, start: usize) -> Result<Token, CompileError> {
        let raw = self.scan_fenced('"', start)?;
        let decoded = decode_json_string(&raw, start)?;
        let end = self.current_offset();
        Ok(Token::new(
            TokenKind::QuotedIdentifier,
            TokenValue::Str(decoded),
            Span::new(start, end),
        ))
    }

    fn lex_raw_string(&mut self, start: usize) -> Result<Token, CompileError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(CompileError::Lexer(LexError {
                        offset: start,
                        character: Some('\''),
                        message: "unterminated raw string literal".to_owned(),
                    }))
                }
                Some((_, '\'')) => break,
                Some((_, '\\')) => match self.peek() {
                    Some('\'') => {
                        self.bump();
                        text.push('\'');
                    }
                    Some('\\') => {
                        self.bump();
                        text.push('\\');
                    }
                    _ => text.push('\\'),
                },
                Some((_, c)) => text.push(c),
            }
        }
        let end = self.current_offset();
        Ok(Token::new(
            TokenKind::Literal,
            TokenValue::Json(Value::String(text)),
            Span::new(start, end),
        ))
    }

    fn lex_literal(&mut self, start: usize) -> Result<Token, CompileError> {
        let raw = self.scan_fenced('`', start)?;
        let content = raw.replace("\\`", "`");
        if content.contains(LINE_SEPARATOR) || content.contains(PARAGRAPH_SEPARATOR) {
            return Err(CompileError::Lexer(LexError {
                offset: start,
                character: None,
                message: "line or paragraph separator is not permitted in a literal".to_owned(),
            }));
        }

        let value = match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(json) => Value::from(json),
            Err(err) if self.enable_legacy_literals => {
                let quoted = format!("\"{}\"", content.replace('"', "\\\""));
                match serde_json::from_str::<serde_json::Value>(&quoted) {
                    Ok(json) => Value::from(json),
                    Err(_) => {
                        return Err(CompileError::Lexer(LexError {
                            offset: start,
                            character: None,
                            message: format!("invalid literal: {err}"),
                        }))
                    }
                }
            }
            Err(err) => {
                return Err(CompileError::Lexer(LexError {
                    offset: start,
                    character: None,
                    message: format!("invalid literal: {err}"),
                }))
            }
        };

        let end = self.current_offset();
        Ok(Token::new(TokenKind::Literal, TokenValue::Json(value), Span::new(start, end)))
    }

    /// Scan content between two occurrences of `fence`, honoring `\fence` as an escaped fence
    /// character, and return the raw (still-escaped) text in between.
    fn scan_fenced(&mut self, fence: char, start: usize) -> Result<String, CompileError> {
        let mut raw = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(CompileError::Lexer(LexError {
                        offset: start,
                        character: Some(fence),
                        message: "unterminated literal".to_owned(),
                    }))
                }
                Some((_, c)) if c == fence => break,
                Some((_, '\\')) => {
                    raw.push('\\');
                    if let Some((_, next)) = self.bump() {
                        raw.push(next);
                    }
                }
                Some((_, c)) => raw.push(c),
            }
        }
        Ok(raw)
    }

    fn current_offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(idx, _)| idx)
            .unwrap_or(self.source.len())
    }
}

fn decode_json_string(raw: &str, start: usize) -> Result<String, CompileError> {
    let quoted = format!("\"{raw}\"");
    serde_json::from_str::<String>(&quoted).map_err(|err| {
        CompileError::Lexer(LexError {
            offset: start,
            character: None,
            message: format!("invalid quoted identifier: {err}"),
        })
    })
}

fn is_value_like(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::UnquotedIdentifier
            | TokenKind::QuotedIdentifier
            | TokenKind::Number
            | TokenKind::Literal
            | TokenKind::Variable
            | TokenKind::Root
            | TokenKind::At
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
    )
}
