//! The shift/reduce (LR) table-driven parser.
//!
//! The driver keeps a stack of [`LrState`]s; state 0 is always at the
//! bottom. Each iteration looks up `action[top, token]` and shifts,
//! reduces, accepts or recovers. A reduction runs the production's
//! postfix action while the handle is still on the stack, pops one state
//! per grammar symbol of the body, then pushes the state named by the
//! goto table. The sequence of reduced production indices, available
//! through [`LrParser::reductions`], read in reverse is a rightmost
//! derivation of the input.

use smartstring::alias::String;
use thiserror::Error;

use crate::fsm::StateId;
use crate::grammar::{GrammarData, GrammarError};
use crate::lexer::{LexicalAnalyzer, Token, WhitespacePolicy};
use crate::recovery::{ErrorRecovery, RECOVERY_LIMIT};
use crate::table::{LrEntry, LrTable, TableError};

/// One entry of the LR parsing stack: the automaton state, caller data
/// carried between reductions, and the token whose shift pushed it.
#[derive(Debug, Clone)]
pub struct LrState<G: GrammarData> {
    pub state: usize,
    pub data: G::StateData,
    pub token: Token<G::Term>,
}

impl<G: GrammarData> LrState<G> {
    pub fn new(state: usize) -> Self {
        Self {
            state,
            data: G::StateData::default(),
            token: Token::epsilon(),
        }
    }
}

impl<G: GrammarData> Default for LrState<G> {
    fn default() -> Self {
        Self::new(0)
    }
}

/// The LR parsing stack, bottom first.
pub type LrStack<G> = Vec<LrState<G>>;

/// Failures surfacing from an LR parse.
#[derive(Debug, Error)]
pub enum LrError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// An error entry was hit with recovery disabled.
    #[error("the input does not belong to the grammar (line {line}): {diagnostic}")]
    Unrecoverable { line: usize, diagnostic: String },

    /// Panic mode could not find a synchronization point (this includes
    /// reaching end of input while scanning for one).
    #[error("could not synchronize with the input: {diagnostic}")]
    Unsynchronized { diagnostic: String },

    /// The recovered-error counter reached its cap.
    #[error("error recovery limit of {limit} exceeded")]
    RecoveryLimitExceeded { limit: usize },

    /// A lookup that must produce a goto entry produced something else:
    /// the table was built wrong.
    #[error("table invariant violated: {diagnostic}")]
    TableInvariant { diagnostic: String },

    /// A reduction asked for more states than the stack holds: the table
    /// was built wrong.
    #[error("stack underflow: a reduction needs {wanted} states but the stack holds {depth}")]
    StackUnderflow { wanted: usize, depth: usize },
}

/// Counters for one LR parse.
#[derive(Debug, Clone, Default)]
pub struct ParserStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
    pub recovered: usize,
}

/// The LR(1) driver.
///
/// Construction computes FIRST and FOLLOW on the table's grammar, since
/// panic-mode recovery synchronizes through FOLLOW sets. All per-parse
/// state is reset on entry to [`LrParser::parse`].
pub struct LrParser<'a, G, F>
where
    G: GrammarData,
    F: Fn(StateId, &[u8]) -> Token<G::Term>,
{
    table: &'a LrTable<G>,
    lexer: LexicalAnalyzer<'a, G::Term, F>,
    stack: LrStack<G>,
    token: Token<G::Term>,
    recovery: ErrorRecovery,
    recovered: usize,
    reductions: Vec<usize>,
    stats: ParserStats,
}

impl<'a, G, F> LrParser<'a, G, F>
where
    G: GrammarData,
    F: Fn(StateId, &[u8]) -> Token<G::Term>,
{
    pub fn new(
        table: &'a LrTable<G>,
        lexer: LexicalAnalyzer<'a, G::Term, F>,
    ) -> Result<Self, GrammarError> {
        table.grammar().compute_first()?;
        table.grammar().compute_follow()?;
        Ok(Self {
            table,
            lexer,
            stack: Vec::new(),
            token: Token::eof(),
            recovery: ErrorRecovery::None,
            recovered: 0,
            reductions: Vec::new(),
            stats: ParserStats::default(),
        })
    }

    /// The indices of the productions reduced by the last parse, in
    /// order: read in reverse, a rightmost derivation when the parse
    /// accepted. The accepting production itself is not recorded.
    pub fn reductions(&self) -> &[usize] {
        &self.reductions
    }

    pub fn stats(&self) -> ParserStats {
        self.stats.clone()
    }

    fn fetch(&mut self) {
        self.token = self.lexer.next(WhitespacePolicy::Skip).into_token();
        self.stats.tokens += 1;
    }

    fn top_state(&self) -> usize {
        self.stack.last().map_or(0, |s| s.state)
    }

    fn diagnostic(&self) -> String {
        let states: Vec<usize> = self.stack.iter().map(|s| s.state).collect();
        let rest = std::string::String::from_utf8_lossy(self.lexer.rest());
        String::from(
            format!(
                "token {:?} (line {}), states {:?}, remaining input {:?}",
                self.token,
                self.lexer.line(),
                states,
                rest
            )
            .as_str(),
        )
    }

    fn dump_state(&self) {
        if log::log_enabled!(log::Level::Trace) {
            let mut out = std::string::String::new();
            for st in &self.stack {
                out.push_str(&format!("<{}:{:?}> ", st.state, st.token.name));
            }
            log::trace!("{}<- {:?}", out, self.token);
        }
    }

    /// Runs the parse to completion, threading `init` into the accept
    /// action and back to the caller.
    ///
    /// With [`ErrorRecovery::PanicMode`], up to [`RECOVERY_LIMIT`] errors
    /// are absorbed by synchronization before the parse is failed.
    pub fn parse(&mut self, init: G::Output, recovery: ErrorRecovery) -> Result<G::Output, LrError> {
        self.recovery = recovery;
        self.stack.clear();
        self.stack.push(LrState::new(0));
        self.reductions.clear();
        self.recovered = 0;
        self.fetch();
        let mut result = init;

        loop {
            self.dump_state();
            let entry = self.table.action(self.top_state(), self.token.name)?;
            match entry {
                LrEntry::Shift(next) => {
                    log::trace!("shift {}", next);
                    let mut state = LrState::new(next);
                    state.token = self.token.clone();
                    self.stack.push(state);
                    self.stats.shifts += 1;
                    self.fetch();
                }
                LrEntry::Reduce(index) => {
                    self.reduce(index)?;
                }
                LrEntry::Accept => {
                    log::trace!("accept");
                    let table = self.table;
                    let prod = table.grammar().production(0)?;
                    if let Some(action) = prod.accept_action() {
                        let mut state = LrState::new(0);
                        action(&mut self.stack, &mut state, &mut result);
                    } else {
                        log::debug!("accepted with no accept action");
                    }
                    return Ok(result);
                }
                LrEntry::Goto(_) => {
                    return Err(LrError::TableInvariant {
                        diagnostic: String::from(
                            format!(
                                "goto entry in the action table: {}",
                                self.diagnostic()
                            )
                            .as_str(),
                        ),
                    });
                }
                LrEntry::Error => {
                    self.recover()?;
                }
            }
        }
    }

    fn reduce(&mut self, index: usize) -> Result<(), LrError> {
        let table = self.table;
        let prod = table.grammar().production(index)?;
        log::trace!("reduce by production {}", index);

        // the action sees the handle still on the stack and may fill in
        // the data of the state about to be pushed
        let mut state = LrState::new(0);
        if let Some(action) = prod.reduce_action() {
            action(&mut self.stack, &mut state);
        }

        let pops = prod.symbol_len();
        if self.stack.len() < pops + 1 {
            return Err(LrError::StackUnderflow {
                wanted: pops,
                depth: self.stack.len(),
            });
        }
        self.stack.truncate(self.stack.len() - pops);

        let entry = table.goto_entry(self.top_state(), prod.head())?;
        let LrEntry::Goto(next) = entry else {
            // goto lookups never produce errors in a well-built table
            return Err(LrError::TableInvariant {
                diagnostic: String::from(
                    format!(
                        "expected a goto entry for {:?}, found {:?}: {}",
                        prod.head(),
                        entry,
                        self.diagnostic()
                    )
                    .as_str(),
                ),
            });
        };
        state.state = next;
        self.stack.push(state);
        self.reductions.push(index);
        self.stats.reductions += 1;
        Ok(())
    }

    fn recover(&mut self) -> Result<(), LrError> {
        if self.recovery == ErrorRecovery::None {
            return Err(LrError::Unrecoverable {
                line: self.lexer.line(),
                diagnostic: self.diagnostic(),
            });
        }
        if self.recovered == RECOVERY_LIMIT {
            return Err(LrError::RecoveryLimitExceeded {
                limit: RECOVERY_LIMIT,
            });
        }
        self.recovered += 1;
        self.stats.recovered += 1;
        let (line, column) = self.lexer.position();
        log::warn!("({}, {}) unexpected token {:?}", line, column, self.token);
        self.panic_mode()
    }

    /// Panic-mode recovery: pop to a state with at least one goto
    /// entry, then discard input until a token in the FOLLOW set of one
    /// of its goto non-terminals turns up, and push that goto state.
    /// Already-matched input is never rewound.
    fn panic_mode(&mut self) -> Result<(), LrError> {
        let table = self.table;

        let targets = loop {
            let Some(top) = self.stack.last() else {
                return Err(LrError::Unsynchronized {
                    diagnostic: self.diagnostic(),
                });
            };
            let targets = table.goto_targets(top.state);
            if !targets.is_empty() {
                break targets;
            }
            self.stack.pop();
        };

        loop {
            // end of input while scanning for a synchronization token
            // fails the parse
            if self.token.is_eof() {
                return Err(LrError::Unsynchronized {
                    diagnostic: self.diagnostic(),
                });
            }
            for &n in &targets {
                let follow = table.grammar().follow_of(n)?;
                if follow.contains(&self.token.name) {
                    let entry = table.goto_entry(self.top_state(), n)?;
                    let LrEntry::Goto(next) = entry else {
                        return Err(LrError::TableInvariant {
                            diagnostic: String::from(
                                format!(
                                    "expected a goto entry for {:?}, found {:?}",
                                    n, entry
                                )
                                .as_str(),
                            ),
                        });
                    };
                    log::info!("synchronized on {:?} with token {:?}", n, self.token);
                    self.stack.push(LrState::new(next));
                    return Ok(());
                }
            }
            self.fetch();
        }
    }
}
