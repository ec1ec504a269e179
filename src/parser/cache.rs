//! The bounded, whole-flush parse cache (§3, §9).
//!
//! Grounded on the teacher's fondness for `once_cell`-backed lazily-initialized state (its
//! `Lazy<Mutex<..>>` default instances), adapted into an explicit struct here since this cache's
//! eviction policy (drop everything at capacity) is itself part of the observable contract.
use std::collections::HashMap;

use crate::ast::Ast;

/// Default capacity before the whole cache is flushed.
pub const DEFAULT_CAPACITY: usize = 128;

/// Maps source text to its compiled AST. At capacity, the entire cache is dropped rather than
/// evicting a single entry — cheap, and keeps behavior simple to reason about when option sets
/// (which are not part of the cache key) change between calls.
#[derive(Debug, Default)]
pub struct ParseCache {
    capacity: usize,
    entries: HashMap<String, Ast>,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, text: &str) -> Option<Ast> {
        let hit = self.entries.get(text).cloned();
        if hit.is_some() {
            log::debug!("parse cache hit for {} byte expression", text.len());
        } else {
            log::debug!("parse cache miss for {} byte expression", text.len());
        }
        hit
    }

    pub fn insert(&mut self, text: String, ast: Ast) {
        if self.entries.len() >= self.capacity.max(1) && !self.entries.contains_key(&text) {
            log::debug!("parse cache reached capacity {}, flushing", self.capacity);
            self.entries.clear();
        }
        self.entries.insert(text, ast);
    }

    /// Test hook exposed on [`crate::parser::Parser`] to clear the cache between option sets.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ParseCache {
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn flushes_entirely_at_capacity() {
        let mut cache = ParseCache::new(2);
        cache.insert("a".into(), Ast::Literal(Value::Int(1)));
        cache.insert("b".into(), Ast::Literal(Value::Int(2)));
        assert_eq!(cache.len(), 2);
        cache.insert("c".into(), Ast::Literal(Value::Int(3)));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn hit_returns_structurally_equal_ast() {
        let mut cache = ParseCache::new(4);
        cache.insert("x".into(), Ast::Literal(Value::Int(7)));
        assert_eq!(cache.get("x"), Some(Ast::Literal(Value::Int(7))));
    }
}
