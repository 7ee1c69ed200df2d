//! Grammars: symbols, symbol strings, productions, and the FIRST/FOLLOW
//! fixed-points.
//!
//! The per-grammar types are bundled behind the [`GrammarData`] marker
//! trait, so every structure in this crate takes a single type parameter.
//! A caller defines two enumerations (terminals and non-terminals), the
//! payload types carried by semantic records and LR states, and a parse
//! result type, then ties them together on a marker:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
//! struct MyGrammar;
//!
//! impl GrammarData for MyGrammar {
//!     type Term = MyTerm;
//!     type NonTerm = MyVar;
//!     type RecordData = String;
//!     type StateData = i64;
//!     type Output = i64;
//! }
//! ```
//!
//! FIRST and FOLLOW are cached on the grammar once computed; FOLLOW
//! refuses to run before FIRST. Both computations are idempotent and the
//! caches are published atomically, so a finished grammar can be shared
//! between concurrent parses.

use once_cell::sync::OnceCell;
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::fmt::Debug;
use thiserror::Error;

use crate::lr::{LrStack, LrState};

/// A terminal enumeration.
///
/// `COUNT` must cover every enumerator (parsing-table columns are sized
/// by it), and the enumeration must contain the two distinguished
/// sentinels [`Terminal::EPSILON`] and [`Terminal::EOF`].
pub trait Terminal: Copy + Eq + Ord + Debug + Into<usize> {
    const COUNT: usize;
    const EPSILON: Self;
    const EOF: Self;

    /// The enumerator with the given index, if any.
    fn from_index(index: usize) -> Option<Self>;
}

/// A non-terminal enumeration. `COUNT` sizes parsing-table rows.
pub trait NonTerminal: Copy + Eq + Ord + Debug + Into<usize> {
    const COUNT: usize;

    /// The enumerator with the given index, if any.
    fn from_index(index: usize) -> Option<Self>;
}

/// The type bundle of one grammar.
///
/// Implemented on a marker type that derives `Copy`, `Eq`, `Ord` and
/// `Debug` (the marker itself is never stored).
pub trait GrammarData: Copy + Eq + Ord + Debug {
    type Term: Terminal;
    type NonTerm: NonTerminal;

    /// Payload carried by LL synthesized and action records.
    type RecordData: Clone + Debug + Default + PartialEq;

    /// Payload carried by LR stack states between reductions.
    type StateData: Clone + Debug + Default;

    /// The accumulator threaded through an LR parse into the accept
    /// action.
    type Output;
}

/// Set of terminals, as used for FIRST, FOLLOW and lookahead sets.
pub type TermSet<G> = BTreeSet<<G as GrammarData>::Term>;

/// A grammar symbol: terminal or non-terminal.
///
/// The derived ordering places terminals before non-terminals and orders
/// within a kind by enumerator index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Symbol<G: GrammarData> {
    Terminal(G::Term),
    NonTerminal(G::NonTerm),
}

impl<G: GrammarData> Symbol<G> {
    /// The empty-string sentinel.
    pub const EPSILON: Self = Symbol::Terminal(<G::Term as Terminal>::EPSILON);

    /// The end-of-input marker.
    pub const END_MARKER: Self = Symbol::Terminal(<G::Term as Terminal>::EOF);

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_epsilon(&self) -> bool {
        *self == Self::EPSILON
    }

    pub fn terminal(&self) -> Option<G::Term> {
        match *self {
            Symbol::Terminal(t) => Some(t),
            Symbol::NonTerminal(_) => None,
        }
    }

    pub fn non_terminal(&self) -> Option<G::NonTerm> {
        match *self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal(n) => Some(n),
        }
    }
}

/// An ordered sequence of grammar symbols with a cached FIRST set.
#[derive(Debug, Clone, Default)]
pub struct SymbolString<G: GrammarData> {
    symbols: Vec<Symbol<G>>,
    first: OnceCell<TermSet<G>>,
}

impl<G: GrammarData> PartialEq for SymbolString<G> {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

impl<G: GrammarData> From<Vec<Symbol<G>>> for SymbolString<G> {
    fn from(symbols: Vec<Symbol<G>>) -> Self {
        Self {
            symbols,
            first: OnceCell::new(),
        }
    }
}

impl<G: GrammarData> SymbolString<G> {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            first: OnceCell::new(),
        }
    }

    pub fn symbols(&self) -> &[Symbol<G>] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Appends a symbol. Any cached FIRST set is discarded.
    pub fn push(&mut self, symbol: Symbol<G>) {
        self.first = OnceCell::new();
        self.symbols.push(symbol);
    }

    pub fn pop(&mut self) -> Option<Symbol<G>> {
        self.first = OnceCell::new();
        self.symbols.pop()
    }

    /// FIRST of this string, computed against a grammar's FIRST table and
    /// cached on the string.
    ///
    /// The inductive rule: a proper terminal contributes itself and ends
    /// the walk; a non-terminal contributes its FIRST set minus EPSILON
    /// and ends the walk unless that set contains EPSILON; if the walk
    /// falls off the end, EPSILON joins the result. FIRST of the empty
    /// string is `{EPSILON}`.
    ///
    /// Fails with [`GrammarError::EmptyFirst`] when a non-terminal's
    /// FIRST set is missing or empty, since that means `first_sets` is
    /// incomplete or belongs to a different grammar.
    pub fn first(&self, first_sets: &[TermSet<G>]) -> Result<&TermSet<G>, GrammarError> {
        self.first.get_or_try_init(|| {
            let mut out = TermSet::<G>::new();
            if self.symbols.is_empty() {
                out.insert(G::Term::EPSILON);
                return Ok(out);
            }
            for (i, sym) in self.symbols.iter().enumerate() {
                let last = i + 1 == self.symbols.len();
                match *sym {
                    Symbol::Terminal(t) => {
                        let epsilon = t == G::Term::EPSILON;
                        if !epsilon || last {
                            out.insert(t);
                        }
                        if !epsilon {
                            return Ok(out);
                        }
                    }
                    Symbol::NonTerminal(n) => {
                        let index: usize = n.into();
                        let fset = first_sets
                            .get(index)
                            .filter(|set| !set.is_empty())
                            .ok_or_else(|| GrammarError::EmptyFirst {
                                symbol: String::from(format!("{:?}", n).as_str()),
                            })?;
                        let has_epsilon = fset.contains(&G::Term::EPSILON);
                        out.extend(fset.iter().copied().filter(|t| *t != G::Term::EPSILON));
                        if !has_epsilon {
                            return Ok(out);
                        }
                        if last {
                            out.insert(G::Term::EPSILON);
                        }
                    }
                }
            }
            Ok(out)
        })
    }
}

/// The LL parsing stack: production elements, topmost last.
pub type LlStack<G> = Vec<ProdElement<G>>;

/// Callback form of LL synthesized and action records: the stack and the
/// popped record's data.
pub type LlActionFn<G> = fn(&mut LlStack<G>, &mut <G as GrammarData>::RecordData);

/// Callback form of LR postfix reduce actions: the stack (still holding
/// the handle) and the state about to be pushed.
pub type ReduceActionFn<G> = fn(&mut LrStack<G>, &mut LrState<G>);

/// Callback form of the LR accept action: as the reduce form, plus the
/// parse result accumulator.
pub type AcceptActionFn<G> = fn(&mut LrStack<G>, &mut LrState<G>, &mut <G as GrammarData>::Output);

/// A semantic record inside an LL production body: opaque caller data
/// plus an optional callback run when the record is popped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlRecord<G: GrammarData> {
    pub data: G::RecordData,
    pub action: Option<LlActionFn<G>>,
}

impl<G: GrammarData> LlRecord<G> {
    pub fn new(data: G::RecordData, action: Option<LlActionFn<G>>) -> Self {
        Self { data, action }
    }
}

/// One element of a production body.
///
/// Only [`ProdElement::Symbol`] elements count toward the length used for
/// LR reductions; the record variants are semantic glue for the LL
/// driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ProdElement<G: GrammarData> {
    Symbol(Symbol<G>),
    Synthesized(LlRecord<G>),
    Action(LlRecord<G>),
}

impl<G: GrammarData> From<Symbol<G>> for ProdElement<G> {
    fn from(symbol: Symbol<G>) -> Self {
        ProdElement::Symbol(symbol)
    }
}

impl<G: GrammarData> ProdElement<G> {
    pub fn is_symbol(&self) -> bool {
        matches!(self, ProdElement::Symbol(_))
    }

    pub fn symbol(&self) -> Option<Symbol<G>> {
        match self {
            ProdElement::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    /// The record payload of either record variant.
    pub fn record(&self) -> Option<&LlRecord<G>> {
        match self {
            ProdElement::Synthesized(r) | ProdElement::Action(r) => Some(r),
            ProdElement::Symbol(_) => None,
        }
    }

    pub fn record_mut(&mut self) -> Option<&mut LlRecord<G>> {
        match self {
            ProdElement::Synthesized(r) | ProdElement::Action(r) => Some(r),
            ProdElement::Symbol(_) => None,
        }
    }
}

/// A production: a non-terminal head and a non-empty body of elements.
///
/// The index is assigned when the production is pushed into a
/// [`Grammar`]. The two optional postfix callbacks serve the LR driver:
/// `reduce_action` runs when the production is reduced, `accept_action`
/// only ever fires for the augmented start production on acceptance.
/// Equality compares head and body and ignores index and actions.
#[derive(Debug, Clone)]
pub struct Production<G: GrammarData> {
    head: G::NonTerm,
    body: Vec<ProdElement<G>>,
    index: usize,
    symbols: usize,
    reduce_action: Option<ReduceActionFn<G>>,
    accept_action: Option<AcceptActionFn<G>>,
}

impl<G: GrammarData> PartialEq for Production<G> {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.body == other.body
    }
}

impl<G: GrammarData> Production<G> {
    /// Builds a production, rejecting an empty body.
    pub fn new(
        head: G::NonTerm,
        body: impl IntoIterator<Item = ProdElement<G>>,
    ) -> Result<Self, GrammarError> {
        let body: Vec<ProdElement<G>> = body.into_iter().collect();
        if body.is_empty() {
            return Err(GrammarError::EmptyProductionBody);
        }
        let symbols = body.iter().filter(|e| e.is_symbol()).count();
        Ok(Self {
            head,
            body,
            index: 0,
            symbols,
            reduce_action: None,
            accept_action: None,
        })
    }

    /// Convenience constructor for symbol-only bodies (the LR case).
    pub fn of_symbols(
        head: G::NonTerm,
        symbols: impl IntoIterator<Item = Symbol<G>>,
    ) -> Result<Self, GrammarError> {
        Self::new(head, symbols.into_iter().map(ProdElement::Symbol))
    }

    pub fn with_reduce(mut self, action: ReduceActionFn<G>) -> Self {
        self.reduce_action = Some(action);
        self
    }

    pub fn with_accept(mut self, action: AcceptActionFn<G>) -> Self {
        self.accept_action = Some(action);
        self
    }

    pub fn head(&self) -> G::NonTerm {
        self.head
    }

    pub fn body(&self) -> &[ProdElement<G>] {
        &self.body
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// The number of grammar symbols in the body (records excluded).
    /// This is the pop count of an LR reduction by this production.
    pub fn symbol_len(&self) -> usize {
        self.symbols
    }

    /// The grammar symbols of the body, in order, records skipped.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol<G>> + '_ {
        self.body.iter().filter_map(|e| e.symbol())
    }

    /// The body as a [`SymbolString`], records dropped.
    pub fn symbol_string(&self) -> SymbolString<G> {
        SymbolString::from(self.symbols().collect::<Vec<_>>())
    }

    pub fn contains(&self, symbol: Symbol<G>) -> bool {
        self.symbols().any(|s| s == symbol)
    }

    /// Whether the body mentions the EPSILON sentinel.
    pub fn is_epsilon(&self) -> bool {
        self.contains(Symbol::EPSILON)
    }

    pub fn reduce_action(&self) -> Option<ReduceActionFn<G>> {
        self.reduce_action
    }

    pub fn accept_action(&self) -> Option<AcceptActionFn<G>> {
        self.accept_action
    }
}

/// Failures in grammar construction and analysis.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("the body of a production cannot be empty")]
    EmptyProductionBody,

    #[error("dot position {dot} is out of range for a production with {symbols} grammar symbols")]
    DotOutOfRange { dot: usize, symbols: usize },

    #[error("the grammar contains no productions")]
    EmptyGrammar,

    #[error("FIRST sets have not been computed for this grammar")]
    FirstNotComputed,

    #[error("FOLLOW sets have not been computed for this grammar")]
    FollowNotComputed,

    #[error("FIRST({symbol}) is empty; the FIRST sets are incomplete or belong to a different grammar")]
    EmptyFirst { symbol: String },

    #[error("enumerator index {index} out of range; the enumeration declares {count} values")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("production index {index} is out of range ({len} productions)")]
    BadProductionIndex { index: usize, len: usize },
}

/// An ordered collection of productions with cached FIRST and FOLLOW
/// sets.
///
/// The head of the first production is the augmented start symbol.
/// FIRST must be computed before FOLLOW; both computations run to a
/// fixed point and are idempotent.
#[derive(Debug, Clone, Default)]
pub struct Grammar<G: GrammarData> {
    prods: Vec<Production<G>>,
    first: OnceCell<Vec<TermSet<G>>>,
    follow: OnceCell<Vec<TermSet<G>>>,
}

impl<G: GrammarData> Grammar<G> {
    pub fn new() -> Self {
        Self {
            prods: Vec::new(),
            first: OnceCell::new(),
            follow: OnceCell::new(),
        }
    }

    pub fn from_productions(prods: impl IntoIterator<Item = Production<G>>) -> Self {
        let mut grammar = Self::new();
        for prod in prods {
            grammar.push(prod);
        }
        grammar
    }

    /// Appends a production, assigning its index. Any computed FIRST and
    /// FOLLOW caches are dropped.
    pub fn push(&mut self, mut prod: Production<G>) {
        prod.set_index(self.prods.len());
        self.prods.push(prod);
        self.first = OnceCell::new();
        self.follow = OnceCell::new();
    }

    pub fn len(&self) -> usize {
        self.prods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prods.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Production<G>> {
        self.prods.iter()
    }

    pub fn production(&self, index: usize) -> Result<&Production<G>, GrammarError> {
        self.prods.get(index).ok_or(GrammarError::BadProductionIndex {
            index,
            len: self.prods.len(),
        })
    }

    /// The augmented start symbol: the head of the first production.
    pub fn start_symbol(&self) -> Result<G::NonTerm, GrammarError> {
        self.prods
            .first()
            .map(|p| p.head())
            .ok_or(GrammarError::EmptyGrammar)
    }

    /// All productions whose head is `n` (the alternatives of `n`).
    pub fn alternatives(&self, n: G::NonTerm) -> impl Iterator<Item = &Production<G>> {
        self.prods.iter().filter(move |p| p.head() == n)
    }

    /// Computes (once) the FIRST set of every non-terminal.
    ///
    /// Fixed-point: every production is revisited on every round, and the
    /// rounds stop only when a full pass adds nothing. Within one
    /// production the walk follows the textbook rule, with the special
    /// case of the production's own head appearing in its body handled by
    /// consulting the head's own EPSILON membership as known so far.
    pub fn compute_first(&self) -> Result<(), GrammarError> {
        self.first.get_or_try_init(|| self.build_first()).map(|_| ())
    }

    fn nonterm_index(index: usize) -> Result<usize, GrammarError> {
        if index >= G::NonTerm::COUNT {
            Err(GrammarError::IndexOutOfRange {
                index,
                count: G::NonTerm::COUNT,
            })
        } else {
            Ok(index)
        }
    }

    fn build_first(&self) -> Result<Vec<TermSet<G>>, GrammarError> {
        let mut first: Vec<TermSet<G>> = vec![TermSet::<G>::new(); G::NonTerm::COUNT];
        log::debug!("computing FIRST for {} productions", self.prods.len());
        loop {
            let mut added = false;
            for prod in &self.prods {
                let h = Self::nonterm_index(prod.head().into())?;
                let symbol_len = prod.symbol_len();
                for (i, sym) in prod.symbols().enumerate() {
                    let last = i + 1 == symbol_len;
                    match sym {
                        Symbol::Terminal(t) => {
                            // covers the epsilon production: the sentinel
                            // itself lands in FIRST(head)
                            if first[h].insert(t) {
                                added = true;
                            }
                            break;
                        }
                        Symbol::NonTerminal(n) if n == prod.head() => {
                            if first[h].contains(&G::Term::EPSILON) {
                                continue;
                            }
                            break;
                        }
                        Symbol::NonTerminal(n) => {
                            let ni = Self::nonterm_index(n.into())?;
                            let fset = first[ni].clone();
                            let has_epsilon = fset.contains(&G::Term::EPSILON);
                            for t in fset {
                                if t != G::Term::EPSILON && first[h].insert(t) {
                                    added = true;
                                }
                            }
                            if !has_epsilon {
                                break;
                            }
                            if last && first[h].insert(G::Term::EPSILON) {
                                added = true;
                            }
                        }
                    }
                }
            }
            log::trace!("FIRST round complete, added = {}", added);
            if !added {
                break;
            }
        }
        Ok(first)
    }

    /// The FIRST table, indexed by non-terminal. Errors until
    /// [`Grammar::compute_first`] has run.
    pub fn first_sets(&self) -> Result<&[TermSet<G>], GrammarError> {
        self.first
            .get()
            .map(Vec::as_slice)
            .ok_or(GrammarError::FirstNotComputed)
    }

    pub fn first_of(&self, n: G::NonTerm) -> Result<&TermSet<G>, GrammarError> {
        let sets = self.first_sets()?;
        let index = Self::nonterm_index(n.into())?;
        Ok(&sets[index])
    }

    /// Computes (once) the FOLLOW set of every non-terminal.
    ///
    /// Precondition: FIRST has been computed; otherwise this fails with
    /// [`GrammarError::FirstNotComputed`]. The start symbol's FOLLOW is
    /// seeded with the end marker; EPSILON never enters a FOLLOW set.
    pub fn compute_follow(&self) -> Result<(), GrammarError> {
        let first = self
            .first
            .get()
            .ok_or(GrammarError::FirstNotComputed)?;
        self.follow
            .get_or_try_init(|| self.build_follow(first))
            .map(|_| ())
    }

    fn build_follow(&self, first: &[TermSet<G>]) -> Result<Vec<TermSet<G>>, GrammarError> {
        let mut follow: Vec<TermSet<G>> = vec![TermSet::<G>::new(); G::NonTerm::COUNT];
        let start = self.start_symbol()?;
        follow[Self::nonterm_index(start.into())?].insert(G::Term::EOF);
        log::debug!("computing FOLLOW for {} productions", self.prods.len());
        loop {
            let mut added = false;
            for prod in &self.prods {
                let h = Self::nonterm_index(prod.head().into())?;
                let syms: Vec<Symbol<G>> = prod.symbols().collect();
                for (i, sym) in syms.iter().enumerate() {
                    let Symbol::NonTerminal(a) = *sym else {
                        continue;
                    };
                    let ai = Self::nonterm_index(a.into())?;

                    // FIRST of the tail after this occurrence
                    let mut tail_nullable = true;
                    for s in &syms[i + 1..] {
                        match *s {
                            Symbol::Terminal(t) => {
                                if t == G::Term::EPSILON {
                                    continue;
                                }
                                if follow[ai].insert(t) {
                                    added = true;
                                }
                                tail_nullable = false;
                                break;
                            }
                            Symbol::NonTerminal(n) => {
                                let ni = Self::nonterm_index(n.into())?;
                                let fset = first[ni].clone();
                                for t in &fset {
                                    if *t != G::Term::EPSILON && follow[ai].insert(*t) {
                                        added = true;
                                    }
                                }
                                if !fset.contains(&G::Term::EPSILON) {
                                    tail_nullable = false;
                                    break;
                                }
                            }
                        }
                    }

                    if tail_nullable {
                        let head_follow = follow[h].clone();
                        for t in head_follow {
                            if follow[ai].insert(t) {
                                added = true;
                            }
                        }
                    }
                }
            }
            log::trace!("FOLLOW round complete, added = {}", added);
            if !added {
                break;
            }
        }
        Ok(follow)
    }

    /// The FOLLOW table, indexed by non-terminal. Errors until
    /// [`Grammar::compute_follow`] has run.
    pub fn follow_sets(&self) -> Result<&[TermSet<G>], GrammarError> {
        self.follow
            .get()
            .map(Vec::as_slice)
            .ok_or(GrammarError::FollowNotComputed)
    }

    pub fn follow_of(&self, n: G::NonTerm) -> Result<&TermSet<G>, GrammarError> {
        let sets = self.follow_sets()?;
        let index = Self::nonterm_index(n.into())?;
        Ok(&sets[index])
    }
}
