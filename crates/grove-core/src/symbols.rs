//! Symbol table for project-wide callee lookup

use std::collections::HashMap;

/// Maps function short names to the id of their first registered definition.
///
/// Short names collide across files; the first registration wins and later
/// ones are ignored, so lookups are only as precise as the names are unique.
pub struct SymbolTable {
    symbols: HashMap<String, String>,
    /// For fast file lookup: file path -> function ids defined in that file
    file_symbols: HashMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: HashMap::new(),
            file_symbols: HashMap::new(),
        }
    }

    /// Register a definition. Returns false if the short name was already taken.
    pub fn insert(&mut self, short_name: &str, function_id: &str, file_path: &str) -> bool {
        self.file_symbols
            .entry(file_path.to_string())
            .or_default()
            .push(function_id.to_string());
        if self.symbols.contains_key(short_name) {
            return false;
        }
        self.symbols
            .insert(short_name.to_string(), function_id.to_string());
        true
    }

    /// Look up the definition a short name resolves to.
    pub fn lookup(&self, short_name: &str) -> Option<&str> {
        self.symbols.get(short_name).map(String::as_str)
    }

    /// Get all function ids defined in a file.
    pub fn symbols_in_file(&self, file_path: &str) -> &[String] {
        self.file_symbols
            .get(file_path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
