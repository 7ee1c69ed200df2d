//! LL and LR parsing tables.
//!
//! Entries are plain tagged values; there is no file format behind them.
//! A table owns the grammar it was built for, since nearly every driver
//! step needs both. Lookups are bounds-checked: an index past the
//! declared enumeration count means the terminal or non-terminal
//! enumeration lied about its `COUNT`, which surfaces as a
//! [`TableError`] instead of a panic.

use thiserror::Error;

use crate::grammar::{Grammar, GrammarData, LlStack, NonTerminal, ProdElement, Terminal};
use crate::lexer::Token;

/// Synchronization callback attached to an LL error entry; consulted
/// during panic-mode recovery with the stack, the erroring stack top and
/// the peeked token. Returns whether the parse is synchronized.
pub type LlSyncFn<G> =
    fn(&mut LlStack<G>, &ProdElement<G>, &Token<<G as GrammarData>::Term>) -> bool;

/// One cell of an LL parsing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlEntry<G: GrammarData> {
    /// No prediction for this pair.
    Error,
    /// Expand by the production with this index.
    Production(usize),
    /// No prediction, but a recovery action to consult while
    /// synchronizing.
    Recover(LlSyncFn<G>),
}

impl<G: GrammarData> Default for LlEntry<G> {
    fn default() -> Self {
        LlEntry::Error
    }
}

impl<G: GrammarData> LlEntry<G> {
    /// Everything that is not a production reference is an error for the
    /// main loop (a [`LlEntry::Recover`] entry only matters to the
    /// recovery routine).
    pub fn is_error(&self) -> bool {
        !matches!(self, LlEntry::Production(_))
    }

    pub fn production_index(&self) -> Option<usize> {
        match self {
            LlEntry::Production(i) => Some(*i),
            _ => None,
        }
    }
}

/// Index errors on table access: the enumerator count was mis-declared.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("terminal index {index} out of range; the terminal enumeration declares {count} values")]
    TerminalOutOfRange { index: usize, count: usize },

    #[error(
        "non-terminal index {index} out of range; the non-terminal enumeration declares {count} values"
    )]
    NonTerminalOutOfRange { index: usize, count: usize },
}

fn terminal_index<T: Terminal>(t: T) -> Result<usize, TableError> {
    let index: usize = t.into();
    if index >= T::COUNT {
        return Err(TableError::TerminalOutOfRange {
            index,
            count: T::COUNT,
        });
    }
    Ok(index)
}

fn nonterminal_index<N: NonTerminal>(n: N) -> Result<usize, TableError> {
    let index: usize = n.into();
    if index >= N::COUNT {
        return Err(TableError::NonTerminalOutOfRange {
            index,
            count: N::COUNT,
        });
    }
    Ok(index)
}

/// An LL(1) parsing table: `non-terminal x terminal -> entry`, plus the
/// grammar the production indices point into.
#[derive(Debug, Clone)]
pub struct LlTable<G: GrammarData> {
    grammar: Grammar<G>,
    entries: Vec<Vec<LlEntry<G>>>,
}

impl<G: GrammarData> LlTable<G> {
    /// An all-error table over `grammar`, with dimensions taken from the
    /// declared enumeration counts.
    pub fn new(grammar: Grammar<G>) -> Self {
        Self {
            grammar,
            entries: vec![vec![LlEntry::Error; G::Term::COUNT]; G::NonTerm::COUNT],
        }
    }

    pub fn grammar(&self) -> &Grammar<G> {
        &self.grammar
    }

    pub fn set(
        &mut self,
        n: G::NonTerm,
        t: G::Term,
        entry: LlEntry<G>,
    ) -> Result<(), TableError> {
        let row = nonterminal_index(n)?;
        let col = terminal_index(t)?;
        self.entries[row][col] = entry;
        Ok(())
    }

    pub fn entry(&self, n: G::NonTerm, t: G::Term) -> Result<LlEntry<G>, TableError> {
        let row = nonterminal_index(n)?;
        let col = terminal_index(t)?;
        Ok(self.entries[row][col])
    }
}

/// One cell of an LR parsing table. An absent cell reads as
/// [`LrEntry::Error`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LrEntry {
    Shift(usize),
    Reduce(usize),
    Goto(usize),
    Accept,
    #[default]
    Error,
}

impl LrEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, LrEntry::Error)
    }
}

/// An LR parsing table: an action table (`state x terminal`), a goto
/// table (`state x non-terminal`) and the grammar they refer to. State 0
/// is the start state; rows grow on demand when entries are written.
#[derive(Debug, Clone)]
pub struct LrTable<G: GrammarData> {
    grammar: Grammar<G>,
    actions: Vec<Vec<LrEntry>>,
    gotos: Vec<Vec<LrEntry>>,
}

impl<G: GrammarData> LrTable<G> {
    pub fn new(grammar: Grammar<G>) -> Self {
        Self {
            grammar,
            actions: Vec::new(),
            gotos: Vec::new(),
        }
    }

    pub fn from_parts(
        grammar: Grammar<G>,
        actions: Vec<Vec<LrEntry>>,
        gotos: Vec<Vec<LrEntry>>,
    ) -> Self {
        Self {
            grammar,
            actions,
            gotos,
        }
    }

    pub fn grammar(&self) -> &Grammar<G> {
        &self.grammar
    }

    pub fn state_count(&self) -> usize {
        self.actions.len().max(self.gotos.len())
    }

    /// Pre-sizes both tables to `states` rows.
    pub fn reserve_states(&mut self, states: usize) {
        if self.actions.len() < states {
            self.actions.resize(states, vec![LrEntry::Error; G::Term::COUNT]);
        }
        if self.gotos.len() < states {
            self.gotos.resize(states, vec![LrEntry::Error; G::NonTerm::COUNT]);
        }
    }

    pub fn set_action(
        &mut self,
        state: usize,
        t: G::Term,
        entry: LrEntry,
    ) -> Result<(), TableError> {
        let col = terminal_index(t)?;
        if self.actions.len() <= state {
            self.actions
                .resize(state + 1, vec![LrEntry::Error; G::Term::COUNT]);
        }
        self.actions[state][col] = entry;
        Ok(())
    }

    pub fn set_goto(
        &mut self,
        state: usize,
        n: G::NonTerm,
        entry: LrEntry,
    ) -> Result<(), TableError> {
        let col = nonterminal_index(n)?;
        if self.gotos.len() <= state {
            self.gotos
                .resize(state + 1, vec![LrEntry::Error; G::NonTerm::COUNT]);
        }
        self.gotos[state][col] = entry;
        Ok(())
    }

    /// The action entry for `(state, t)`; an absent row or cell is an
    /// error entry.
    pub fn action(&self, state: usize, t: G::Term) -> Result<LrEntry, TableError> {
        let col = terminal_index(t)?;
        Ok(self
            .actions
            .get(state)
            .and_then(|row| row.get(col))
            .copied()
            .unwrap_or(LrEntry::Error))
    }

    /// The goto entry for `(state, n)`; an absent row or cell is an
    /// error entry.
    pub fn goto_entry(&self, state: usize, n: G::NonTerm) -> Result<LrEntry, TableError> {
        let col = nonterminal_index(n)?;
        Ok(self
            .gotos
            .get(state)
            .and_then(|row| row.get(col))
            .copied()
            .unwrap_or(LrEntry::Error))
    }

    /// Every non-terminal on which `state` has a non-error goto entry.
    /// This is what panic-mode recovery walks the stack for.
    pub fn goto_targets(&self, state: usize) -> Vec<G::NonTerm> {
        let Some(row) = self.gotos.get(state) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (i, entry) in row.iter().enumerate() {
            if !entry.is_error() {
                if let Some(n) = G::NonTerm::from_index(i) {
                    out.push(n);
                }
            }
        }
        out
    }
}
