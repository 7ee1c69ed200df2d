//! A flat symbol table mapping variable names to integer values.
//!
//! Insertion order is preserved, which keeps diagnostics and iteration
//! stable across runs.

use indexmap::IndexMap;
use smartstring::alias::String;

/// Maps names to `i64` values; undefined names read as `0`.
///
/// # Example
/// ```rust
/// # use lexparse_calc::SymTab;
/// let mut symtab = SymTab::new();
/// symtab.set("x", 42);
/// assert_eq!(symtab.get("x"), 42);
/// assert_eq!(symtab.get("y"), 0);
/// ```
#[derive(Debug, Default)]
pub struct SymTab {
    tab: IndexMap<String, i64>,
}

impl SymTab {
    pub fn new() -> Self {
        Self {
            tab: IndexMap::new(),
        }
    }

    /// The number of defined names.
    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    /// Defines or overwrites a name.
    pub fn set(&mut self, name: impl AsRef<str>, value: i64) {
        self.tab.insert(String::from(name.as_ref()), value);
    }

    /// The value of a name, or `0` when undefined.
    pub fn get(&self, name: impl AsRef<str>) -> i64 {
        self.tab.get(name.as_ref()).copied().unwrap_or(0)
    }

    /// Iterates `(name, value)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.tab.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
