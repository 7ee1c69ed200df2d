//! Building blocks for table-driven lexical analysis and parsing.
//!
//! The crate is organized leaves-first:
//!
//! - [`fsm`] — deterministic and nondeterministic state machines with
//!   three match modes (whole string, longest prefix, longest substring).
//! - [`lexer`] — a thin layer that drives a DFA in longest-prefix mode,
//!   keeps a line/column cursor, and builds tokens through a
//!   caller-supplied factory.
//! - [`grammar`] — symbols, productions, grammars, and the FIRST/FOLLOW
//!   fixed-points.
//! - [`item`] — LR items and item sets with CLOSURE and GOTO.
//! - [`table`] — LL and LR parsing tables as plain tagged values.
//! - [`tablegen`] — canonical-collection and SLR(1) table construction.
//! - [`ll`] / [`lr`] — the predictive and shift/reduce drivers, both with
//!   panic-mode error recovery.
//!
//! Grammars and tables are built once and are read-only during parsing;
//! the lazily computed FIRST/FOLLOW/CLOSURE caches are published through
//! `OnceCell`, so sharing a grammar between concurrent parses is safe as
//! long as each parse owns its own lexer cursor and stack.

pub mod fsm;
pub mod grammar;
pub mod item;
pub mod lexer;
pub mod ll;
pub mod lr;
pub mod recovery;
pub mod table;
pub mod tablegen;

#[cfg(test)]
pub(crate) mod test_grammar_data;

pub use crate::fsm::{Dfa, DfaTable, FsmError, FsmResult, MatchMode, Nfa, NfaKind, NfaTable};
pub use crate::grammar::{
    Grammar, GrammarData, GrammarError, LlRecord, NonTerminal, ProdElement, Production, Symbol,
    SymbolString, TermSet, Terminal,
};
pub use crate::item::{Item, ItemSet};
pub use crate::lexer::{LexerStats, LexicalAnalyzer, Scan, Token, WhitespacePolicy};
pub use crate::ll::{LlError, LlParser, LlStack};
pub use crate::lr::{LrError, LrParser, LrStack, LrState, ParserStats};
pub use crate::recovery::{ErrorRecovery, RECOVERY_LIMIT};
pub use crate::table::{LlEntry, LlSyncFn, LlTable, LrEntry, LrTable, TableError};
pub use crate::tablegen::{
    canonical_collection, ll_table, lr1_collection, lr1_table, slr_table, BuildError,
};
