//! The predictive (LL(1)) table-driven parser.
//!
//! The driver keeps a stack of production elements. Grammar symbols are
//! matched (terminals) or expanded (non-terminals, by table lookup,
//! pushing the production body in reverse); synthesized and action
//! records invoke their callbacks on the stack and their own payload as
//! they are popped. An accepted parse leaves the stack empty with the
//! input at end; the sequence of expanded production indices, available
//! through [`LlParser::derivation`], is a leftmost derivation of the
//! input.

use smartstring::alias::String;
use thiserror::Error;

use crate::fsm::StateId;
use crate::grammar::{GrammarData, GrammarError, ProdElement, Symbol, Terminal};
pub use crate::grammar::LlStack;
use crate::lexer::{LexicalAnalyzer, Scan, Token, WhitespacePolicy};
use crate::recovery::{ErrorRecovery, RECOVERY_LIMIT};
use crate::table::{LlEntry, LlTable, TableError};

/// Failures surfacing from an LL parse.
#[derive(Debug, Error)]
pub enum LlError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// An error entry was hit with recovery disabled.
    #[error("the input does not belong to the grammar (line {line}): {diagnostic}")]
    Unrecoverable { line: usize, diagnostic: String },

    /// Panic mode ran out of stack before finding a synchronization
    /// point.
    #[error("could not synchronize with the input: {diagnostic}")]
    Unsynchronized { diagnostic: String },

    /// The recovered-error counter reached its cap.
    #[error("error recovery limit of {limit} exceeded")]
    RecoveryLimitExceeded { limit: usize },

    /// The stack emptied while input remained: the table does not match
    /// the grammar.
    #[error("the parsing stack emptied before the input did: {diagnostic}")]
    TrailingInput { diagnostic: String },
}

/// Counters for one LL parse.
#[derive(Debug, Clone, Default)]
pub struct LlStats {
    pub tokens: usize,
    pub expansions: usize,
    pub recovered: usize,
}

/// The LL(1) driver.
///
/// Holds a parsing table (with its grammar) and a lexical analyzer over
/// one input. All per-parse state is reset on entry to
/// [`LlParser::parse`].
pub struct LlParser<'a, G, F>
where
    G: GrammarData,
    F: Fn(StateId, &[u8]) -> Token<G::Term>,
{
    table: &'a LlTable<G>,
    lexer: LexicalAnalyzer<'a, G::Term, F>,
    stack: LlStack<G>,
    token: Token<G::Term>,
    recovery: ErrorRecovery,
    recovered: usize,
    derivation: Vec<usize>,
    stats: LlStats,
}

impl<'a, G, F> LlParser<'a, G, F>
where
    G: GrammarData,
    F: Fn(StateId, &[u8]) -> Token<G::Term>,
{
    pub fn new(table: &'a LlTable<G>, lexer: LexicalAnalyzer<'a, G::Term, F>) -> Self {
        Self {
            table,
            lexer,
            stack: Vec::new(),
            token: Token::eof(),
            recovery: ErrorRecovery::None,
            recovered: 0,
            derivation: Vec::new(),
            stats: LlStats::default(),
        }
    }

    /// The indices of the productions expanded by the last parse, in
    /// order: a leftmost derivation when the parse accepted.
    pub fn derivation(&self) -> &[usize] {
        &self.derivation
    }

    pub fn stats(&self) -> LlStats {
        self.stats.clone()
    }

    fn fetch(&mut self) {
        self.token = self.lexer.next(WhitespacePolicy::Skip).into_token();
        self.stats.tokens += 1;
    }

    fn diagnostic(&self) -> String {
        let rest = std::string::String::from_utf8_lossy(self.lexer.rest());
        String::from(
            format!(
                "current token {:?}, stack {:?}, remaining input {:?}",
                self.token, self.stack, rest
            )
            .as_str(),
        )
    }

    /// Runs the parse to completion.
    ///
    /// Accepts (returns `Ok`) when the stack empties with the input at
    /// end. With [`ErrorRecovery::PanicMode`], up to [`RECOVERY_LIMIT`]
    /// errors are absorbed by synchronization before the parse is failed.
    pub fn parse(&mut self, recovery: ErrorRecovery) -> Result<(), LlError> {
        self.recovery = recovery;
        self.stack.clear();
        self.derivation.clear();
        self.recovered = 0;
        let start = self.table.grammar().start_symbol()?;
        self.stack
            .push(ProdElement::Symbol(Symbol::NonTerminal(start)));
        self.fetch();

        while let Some(element) = self.stack.pop() {
            log::trace!("top {:?}, token {:?}", element, self.token);
            match element {
                ProdElement::Symbol(symbol) => self.parse_symbol(symbol)?,
                ProdElement::Synthesized(mut record) | ProdElement::Action(mut record) => {
                    if let Some(action) = record.action {
                        action(&mut self.stack, &mut record.data);
                    }
                }
            }
        }

        if !self.token.is_eof() {
            return Err(LlError::TrailingInput {
                diagnostic: self.diagnostic(),
            });
        }
        Ok(())
    }

    fn parse_symbol(&mut self, symbol: Symbol<G>) -> Result<(), LlError> {
        match symbol {
            Symbol::Terminal(t) => {
                // epsilon matches with nothing
                if t == G::Term::EPSILON {
                    return Ok(());
                }
                let matched = t == self.token.name;
                log::trace!("matching {:?} against {:?}: {}", t, self.token, matched);
                self.fetch();
                if !matched {
                    return self.recover(symbol);
                }
                Ok(())
            }
            Symbol::NonTerminal(n) => {
                let entry = self.table.entry(n, self.token.name)?;
                match entry {
                    LlEntry::Production(index) => self.expand(index),
                    _ => self.recover(symbol),
                }
            }
        }
    }

    /// Expands by the production with the given index: its body is
    /// pushed in reverse, so the first body element becomes the new top.
    fn expand(&mut self, index: usize) -> Result<(), LlError> {
        let table = self.table;
        let prod = table.grammar().production(index)?;
        for element in prod.body().iter().rev() {
            self.stack.push(element.clone());
        }
        self.derivation.push(index);
        self.stats.expansions += 1;
        log::trace!("expanded {:?} by production {}", prod.head(), index);
        Ok(())
    }

    fn recover(&mut self, at: Symbol<G>) -> Result<(), LlError> {
        if self.recovery == ErrorRecovery::None {
            return Err(LlError::Unrecoverable {
                line: self.lexer.line(),
                diagnostic: self.diagnostic(),
            });
        }
        if self.recovered == RECOVERY_LIMIT {
            return Err(LlError::RecoveryLimitExceeded {
                limit: RECOVERY_LIMIT,
            });
        }
        self.recovered += 1;
        self.stats.recovered += 1;
        let (line, column) = self.lexer.position();
        log::warn!(
            "({}, {}) unexpected token {:?} at {:?}",
            line,
            column,
            self.token,
            at
        );
        self.panic_mode(at)
    }

    /// Panic mode, starting from the symbol the error was detected at
    /// (already popped off the stack).
    fn panic_mode(&mut self, at: Symbol<G>) -> Result<(), LlError> {
        let mut current = at;
        loop {
            match current {
                // a mismatched terminal is reported and treated as
                // matched; it is already off the stack
                Symbol::Terminal(t) => {
                    log::warn!("pretending {:?} was matched", t);
                    return Ok(());
                }
                Symbol::NonTerminal(n) => {
                    if self.try_sync(n)? {
                        return Ok(());
                    }
                    // end of input without a synchronization point for
                    // this non-terminal: drop it, try the next stack top
                    loop {
                        match self.stack.pop() {
                            Some(ProdElement::Symbol(sym)) => {
                                current = sym;
                                break;
                            }
                            // records are semantic glue; attribute flow
                            // is already broken, so they are discarded
                            Some(_) => continue,
                            None => {
                                return Err(LlError::Unsynchronized {
                                    diagnostic: self.diagnostic(),
                                })
                            }
                        }
                    }
                }
            }
        }
    }

    /// Tries to synchronize on non-terminal `n`. `Ok(false)` means the
    /// input was exhausted without finding a synchronization token.
    fn try_sync(&mut self, n: G::NonTerm) -> Result<bool, LlError> {
        // an epsilon alternative absorbs the error silently
        if let LlEntry::Production(index) = self.table.entry(n, G::Term::EPSILON)? {
            self.expand(index)?;
            self.log_sync();
            return Ok(true);
        }

        loop {
            let peeked = match self.lexer.peek(WhitespacePolicy::Skip) {
                Scan::Token { token, .. } => token,
                Scan::EndOfInput | Scan::NotFound => {
                    self.token = Token::eof();
                    return Ok(false);
                }
            };
            match self.table.entry(n, peeked.name)? {
                LlEntry::Production(_) => {
                    // consume the token, push the non-terminal back and
                    // let the main loop expand it normally
                    self.fetch();
                    self.stack
                        .push(ProdElement::Symbol(Symbol::NonTerminal(n)));
                    self.log_sync();
                    return Ok(true);
                }
                LlEntry::Recover(action) => {
                    let top = ProdElement::Symbol(Symbol::NonTerminal(n));
                    if action(&mut self.stack, &top, &peeked) {
                        self.fetch();
                        self.log_sync();
                        return Ok(true);
                    }
                    // the action declined; skip the token and keep going
                    self.fetch();
                }
                LlEntry::Error => {
                    self.fetch();
                }
            }
        }
    }

    fn log_sync(&self) {
        let (line, column) = self.lexer.position();
        log::info!(
            "({}, {}) synchronized; current token {:?}",
            line,
            column,
            self.token
        );
    }
}
