//! Interned symbols
//!
//! Symbol identity is an index into a process-wide, append-only interning
//! table: two symbols constructed from the same text always compare equal by
//! index, and interned names are never released. The table is lock-guarded so
//! independent evaluator sessions may share it.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

/// An interned symbol, identified by its index in the global table
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

struct Interner {
    names: Vec<String>,
    by_name: HashMap<String, Symbol>,
    gensym_counter: u64,
}

lazy_static::lazy_static! {
    static ref INTERNER: RwLock<Interner> = RwLock::new(Interner {
        names: Vec::new(),
        by_name: HashMap::new(),
        gensym_counter: 0,
    });
}

impl Symbol {
    /// Interns `text`, returning the existing symbol if it was seen before.
    pub fn new(text: &str) -> Symbol {
        if let Some(sym) = INTERNER.read().by_name.get(text) {
            return *sym;
        }
        let mut interner = INTERNER.write();
        // Raced with another writer between the read and write locks.
        if let Some(sym) = interner.by_name.get(text) {
            return *sym;
        }
        let sym = Symbol(interner.names.len() as u32);
        interner.names.push(text.to_string());
        interner.by_name.insert(text.to_string(), sym);
        sym
    }

    /// Returns the symbol's interned text.
    pub fn name(&self) -> String {
        INTERNER.read().names[self.0 as usize].clone()
    }

    /// Case-insensitive name comparison, used by relaxed (`equalp`) equality.
    pub fn eq_ignore_case(&self, other: &Symbol) -> bool {
        if self == other {
            return true;
        }
        let interner = INTERNER.read();
        interner.names[self.0 as usize].eq_ignore_ascii_case(&interner.names[other.0 as usize])
    }
}

/// Creates a fresh symbol guaranteed not to collide with any interned name.
pub fn gensym() -> Symbol {
    let n = {
        let mut interner = INTERNER.write();
        interner.gensym_counter += 1;
        interner.gensym_counter
    };
    Symbol::new(&format!("#:g{n}"))
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_identity() {
        assert_eq!(Symbol::new("car"), Symbol::new("car"));
        assert_ne!(Symbol::new("car"), Symbol::new("cdr"));
    }

    #[test]
    fn test_name_round_trip() {
        assert_eq!(Symbol::new("let*").name(), "let*");
    }

    #[test]
    fn test_case_insensitive_comparison() {
        let a = Symbol::new("Width");
        let b = Symbol::new("width");
        assert_ne!(a, b);
        assert!(a.eq_ignore_case(&b));
    }

    #[test]
    fn test_gensym_is_fresh() {
        let a = gensym();
        let b = gensym();
        assert_ne!(a, b);
    }
}
