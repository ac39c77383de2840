//! String interning for node identifiers.
//!
//! Every original/unique id in a graph is interned once; nodes and child maps
//! carry the small `Symbol` handle instead of the string.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    lookup: HashMap<String, Symbol>,
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the symbol for `name`, allocating it on first use.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(name) {
            return sym;
        }
        let sym = Symbol(self.names.len() as u32);
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), sym);
        sym
    }

    /// Looks a name up without interning it.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.lookup.get(name).copied()
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.names.get(sym.index()).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut table = SymbolTable::new();
        let a = table.intern("chr1");
        let b = table.intern("chr2");
        assert_ne!(a, b);
        assert_eq!(table.intern("chr1"), a);
        assert_eq!(table.resolve(b), "chr2");
        assert_eq!(table.get("chr3"), None);
        assert_eq!(table.len(), 2);
    }
}
