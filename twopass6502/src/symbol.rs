//! Symbol table for labels and manifest constants

use std::collections::HashMap;

use crate::error::{EncodingError, ErrorKind};

/// Names are case-insensitive; both maps are keyed by the upper-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    defines: HashMap<String, u32>,
    labels: HashMap<String, u32>,
}

fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.defines.clear();
        self.labels.clear();
    }

    /// Binds a manifest constant. A repeated name replaces the earlier value.
    pub fn define(&mut self, name: &str, value: u32) {
        self.defines.insert(key(name), value);
    }

    pub fn insert_label(&mut self, name: &str, addr: u32) -> Result<(), ErrorKind> {
        let k = key(name);
        if self.labels.contains_key(&k) {
            return Err(EncodingError::DuplicateLabel(name.to_string()).into());
        }
        self.labels.insert(k, addr);
        Ok(())
    }

    /// Defines shadow labels of the same name.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        let k = key(name);
        self.defines.get(&k).or_else(|| self.labels.get(&k)).copied()
    }

    pub fn get_define(&self, name: &str) -> Option<u32> {
        self.defines.get(&key(name)).copied()
    }

    pub fn get_label(&self, name: &str) -> Option<u32> {
        self.labels.get(&key(name)).copied()
    }

    pub fn defines(&self) -> &HashMap<String, u32> {
        &self.defines
    }

    pub fn labels(&self) -> &HashMap<String, u32> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.defines.len() + self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty() && self.labels.is_empty()
    }
}

/// Symbols visible at one line: the table being built in the current sweep,
/// backed by the previous (or settled) table for forward references.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    current: &'a SymbolTable,
    previous: Option<&'a SymbolTable>,
}

impl<'a> Scope<'a> {
    pub fn new(current: &'a SymbolTable, previous: Option<&'a SymbolTable>) -> Self {
        Self { current, previous }
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.current
            .get_define(name)
            .or_else(|| self.previous.and_then(|p| p.get_define(name)))
            .or_else(|| self.current.get_label(name))
            .or_else(|| self.previous.and_then(|p| p.get_label(name)))
    }
}

impl<'a> From<&'a SymbolTable> for Scope<'a> {
    fn from(table: &'a SymbolTable) -> Self {
        Scope::new(table, None)
    }
}
