//! LR items and item sets: CLOSURE, GOTO, and core equivalence.
//!
//! An [`Item`] is a production with a dot position and a lookahead set
//! (empty lookaheads make it an LR(0) item). The dot counts grammar
//! symbols only, while `actual_dot` indexes the underlying element body;
//! both are fixed together at construction so that the element at
//! `actual_dot` is always the next grammar symbol, whatever record
//! elements the body carries.
//!
//! An [`ItemSet`] keeps its items normalized (one item per core, with
//! lookaheads merged) and caches its CLOSURE, which is what makes
//! repeated GOTO walks over the same set cheap during table
//! construction.

use once_cell::sync::OnceCell;

use crate::grammar::{Grammar, GrammarData, GrammarError, Production, Symbol, SymbolString, TermSet};

/// An LR item: `(production, dot, lookaheads)`.
#[derive(Debug, Clone)]
pub struct Item<G: GrammarData> {
    production: Production<G>,
    dot: usize,
    actual_dot: usize,
    lookaheads: TermSet<G>,
}

impl<G: GrammarData> PartialEq for Item<G> {
    fn eq(&self, other: &Self) -> bool {
        // dot first, the cheapest and most common discrepancy
        self.dot == other.dot
            && self.production == other.production
            && self.lookaheads == other.lookaheads
    }
}

impl<G: GrammarData> Item<G> {
    /// Builds an item, validating `0 <= dot <= |grammar symbols|` and
    /// deriving the actual body index of the dot.
    pub fn new(
        production: Production<G>,
        dot: usize,
        lookaheads: TermSet<G>,
    ) -> Result<Self, GrammarError> {
        let symbols = production.symbol_len();
        if dot > symbols {
            return Err(GrammarError::DotOutOfRange { dot, symbols });
        }
        let actual_dot = Self::actual_position(&production, dot);
        Ok(Self {
            production,
            dot,
            actual_dot,
            lookaheads,
        })
    }

    /// The body index of the `dot`-th grammar symbol, skipping record
    /// elements; the body length when the dot is at the end.
    fn actual_position(production: &Production<G>, dot: usize) -> usize {
        let mut seen = 0;
        for (i, element) in production.body().iter().enumerate() {
            if element.is_symbol() {
                if seen == dot {
                    return i;
                }
                seen += 1;
            }
        }
        production.body().len()
    }

    pub fn production(&self) -> &Production<G> {
        &self.production
    }

    pub fn dot(&self) -> usize {
        self.dot
    }

    /// The dot's index into the element body (records included).
    pub fn actual_dot(&self) -> usize {
        self.actual_dot
    }

    pub fn lookaheads(&self) -> &TermSet<G> {
        &self.lookaheads
    }

    /// An item with no lookaheads is an LR(0) item.
    pub fn is_lr0(&self) -> bool {
        self.lookaheads.is_empty()
    }

    /// Whether the dot sits at the end of the body.
    pub fn is_complete(&self) -> bool {
        self.dot == self.production.symbol_len()
    }

    /// A kernel item: dot not at the start, or the start production.
    pub fn is_kernel(&self) -> bool {
        self.dot > 0 || self.production.index() == 0
    }

    /// The grammar symbol just after the dot, if the dot is not at the
    /// end.
    pub fn symbol_at_dot(&self) -> Option<Symbol<G>> {
        if self.is_complete() {
            return None;
        }
        self.production.body()[self.actual_dot].symbol()
    }

    /// The grammar symbols strictly after the dot symbol.
    pub fn tail_after_dot(&self) -> SymbolString<G> {
        if self.is_complete() {
            return SymbolString::new();
        }
        let tail: Vec<Symbol<G>> = self.production.body()[self.actual_dot + 1..]
            .iter()
            .filter_map(|e| e.symbol())
            .collect();
        SymbolString::from(tail)
    }

    /// The item with the dot advanced past one grammar symbol.
    pub fn advanced(&self) -> Result<Self, GrammarError> {
        Self::new(self.production.clone(), self.dot + 1, self.lookaheads.clone())
    }

    /// Core identity: same production and dot, lookaheads ignored.
    pub fn core_eq(&self, other: &Self) -> bool {
        self.dot == other.dot && self.production == other.production
    }
}

/// Inserts `item` into `items`, merging lookaheads when an item with the
/// identical core is already present. Returns whether anything changed.
fn insert_merge<G: GrammarData>(items: &mut Vec<Item<G>>, item: Item<G>) -> bool {
    match items.iter_mut().find(|i| i.core_eq(&item)) {
        Some(existing) => {
            let before = existing.lookaheads.len();
            existing.lookaheads.extend(item.lookaheads.iter().copied());
            existing.lookaheads.len() > before
        }
        None => {
            items.push(item);
            true
        }
    }
}

/// A collection of items with a lazily computed CLOSURE cache.
///
/// Equality is set equality of the items; insertion keeps one item per
/// core and unions lookaheads.
#[derive(Debug, Clone, Default)]
pub struct ItemSet<G: GrammarData> {
    items: Vec<Item<G>>,
    closure: OnceCell<Vec<Item<G>>>,
}

impl<G: GrammarData> PartialEq for ItemSet<G> {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .all(|i| other.items.iter().any(|j| i == j))
    }
}

impl<G: GrammarData> ItemSet<G> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            closure: OnceCell::new(),
        }
    }

    /// Builds a set, normalizing through [`ItemSet::insert`].
    pub fn from_items(items: impl IntoIterator<Item = Item<G>>) -> Self {
        let mut set = Self::new();
        for item in items {
            set.insert(item);
        }
        set
    }

    /// A set whose CLOSURE cache is pre-filled with its own items (used
    /// for sets that are closed by construction).
    fn closed(items: Vec<Item<G>>) -> Self {
        let closure = OnceCell::new();
        let _ = closure.set(items.clone());
        Self { items, closure }
    }

    pub fn items(&self) -> &[Item<G>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item<G>> {
        self.items.iter()
    }

    /// The item with the given first component, if present.
    pub fn get(&self, production: &Production<G>, dot: usize) -> Option<&Item<G>> {
        self.items
            .iter()
            .find(|i| i.dot == dot && i.production == *production)
    }

    /// Whether an item with the same core and at least these lookaheads
    /// is present.
    pub fn contains(&self, item: &Item<G>) -> bool {
        self.items
            .iter()
            .any(|i| i.core_eq(item) && i.lookaheads.is_superset(&item.lookaheads))
    }

    /// Inserts an item; if one with the identical core exists, the
    /// lookaheads are unioned instead. Returns whether the set changed.
    /// Any cached CLOSURE is discarded.
    pub fn insert(&mut self, item: Item<G>) -> bool {
        self.closure = OnceCell::new();
        insert_merge(&mut self.items, item)
    }

    /// Folds every item of `other` into this set. Returns whether the
    /// set changed.
    pub fn merge(&mut self, other: &ItemSet<G>) -> bool {
        let mut changed = false;
        for item in &other.items {
            if self.insert(item.clone()) {
                changed = true;
            }
        }
        changed
    }

    /// Core equality: the same multiset of `(production, dot)` cores,
    /// lookaheads ignored.
    pub fn core_eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .all(|i| other.items.iter().any(|j| i.core_eq(j)))
    }

    /// The CLOSURE of this set, computed once and cached.
    ///
    /// For every item `[H -> alpha . B beta, a]` and every alternative
    /// `B -> gamma`, the item `[B -> . gamma, b]` joins the closure for
    /// each `b` in FIRST(`beta a`); LR(0) items skip the lookahead
    /// generation. Passes repeat until neither a new item nor a new
    /// lookahead appears. The empty set closes to itself.
    pub fn closure_items(&self, grammar: &Grammar<G>) -> Result<&[Item<G>], GrammarError> {
        self.closure
            .get_or_try_init(|| self.build_closure(grammar))
            .map(Vec::as_slice)
    }

    fn build_closure(&self, grammar: &Grammar<G>) -> Result<Vec<Item<G>>, GrammarError> {
        if self.items.is_empty() {
            log::debug!("closing an empty item set");
            return Ok(Vec::new());
        }
        let mut closure = self.items.clone();
        let lr1 = closure.iter().any(|i| !i.is_lr0());
        if lr1 {
            grammar.compute_first()?;
        }
        log::debug!(
            "computing CLOSURE of {} LR({}) items",
            closure.len(),
            if lr1 { 1 } else { 0 }
        );
        loop {
            let mut changed = false;
            let mut i = 0;
            while i < closure.len() {
                let item = closure[i].clone();
                i += 1;
                let Some(Symbol::NonTerminal(b)) = item.symbol_at_dot() else {
                    continue;
                };
                if item.is_lr0() {
                    for prod in grammar.alternatives(b) {
                        let new_item = Item::new(prod.clone(), 0, TermSet::<G>::new())?;
                        if insert_merge(&mut closure, new_item) {
                            changed = true;
                        }
                    }
                } else {
                    let tail = item.tail_after_dot();
                    let first_sets = grammar.first_sets()?;
                    for la in item.lookaheads.iter().copied().collect::<Vec<_>>() {
                        let mut string = tail.clone();
                        string.push(Symbol::Terminal(la));
                        let lookaheads = string.first(first_sets)?.clone();
                        for prod in grammar.alternatives(b) {
                            let new_item = Item::new(prod.clone(), 0, lookaheads.clone())?;
                            if insert_merge(&mut closure, new_item) {
                                changed = true;
                            }
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        Ok(closure)
    }

    /// GOTO of this set on `symbol`: the closure of every item of
    /// CLOSURE(self) with its dot advanced past `symbol`.
    ///
    /// The returned set holds the full closure and arrives with its
    /// CLOSURE cache already filled.
    pub fn goto(&self, symbol: Symbol<G>, grammar: &Grammar<G>) -> Result<ItemSet<G>, GrammarError> {
        let closure = self.closure_items(grammar)?;
        let mut moved = ItemSet::new();
        for item in closure {
            if item.symbol_at_dot() == Some(symbol) {
                moved.insert(item.advanced()?);
            }
        }
        if moved.is_empty() {
            return Ok(ItemSet::new());
        }
        let closed = moved.closure_items(grammar)?.to_vec();
        Ok(ItemSet::closed(closed))
    }
}
