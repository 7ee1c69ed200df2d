//! The lexical analyzer: a thin layer that drives a DFA in
//! longest-prefix mode over the remaining input, keeps a line/column
//! cursor, and builds tokens through a caller-supplied factory.
//!
//! The factory receives the final state the automaton stopped in and the
//! matched lexeme; it must be deterministic, pure with respect to its
//! inputs, and handle every state it declared final when building the
//! automaton.
//!
//! ```rust
//! use lexparse::fsm::{Dfa, DfaTable};
//! use lexparse::lexer::{LexicalAnalyzer, Scan, Token, WhitespacePolicy};
//! # use lexparse::grammar::Terminal;
//! # #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
//! # enum T { Num, Eof, Epsilon }
//! # impl From<T> for usize { fn from(t: T) -> usize { t as usize } }
//! # impl Terminal for T {
//! #     const COUNT: usize = 3;
//! #     const EPSILON: Self = T::Epsilon;
//! #     const EOF: Self = T::Eof;
//! #     fn from_index(i: usize) -> Option<Self> { [T::Num, T::Eof, T::Epsilon].get(i).copied() }
//! # }
//! let mut table = DfaTable::new();
//! table.set_all(1, b'0'..=b'9', 2);
//! table.set_all(2, b'0'..=b'9', 2);
//! let dfa = Dfa::new([2].into(), table).unwrap();
//!
//! let mut lexer = LexicalAnalyzer::new(&dfa, |_, lexeme| Token::from_lexeme(T::Num, lexeme), b"12 34");
//! let Scan::Token { token, .. } = lexer.next(WhitespacePolicy::Skip) else { panic!() };
//! assert_eq!(token.attribute, "12");
//! ```

use smartstring::alias::String;
use std::ops::Range;

use crate::fsm::{Dfa, MatchMode, StateId};
use crate::grammar::Terminal;

/// A token: a terminal name plus the lexeme text it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<T: Terminal> {
    pub name: T,
    pub attribute: String,
}

impl<T: Terminal> Token<T> {
    pub fn new(name: T, attribute: impl AsRef<str>) -> Self {
        Self {
            name,
            attribute: String::from(attribute.as_ref()),
        }
    }

    /// A token over a raw lexeme; invalid UTF-8 is replaced, not
    /// rejected, since the attribute only serves semantic actions and
    /// diagnostics.
    pub fn from_lexeme(name: T, lexeme: &[u8]) -> Self {
        Self {
            name,
            attribute: String::from(std::string::String::from_utf8_lossy(lexeme).as_ref()),
        }
    }

    /// The distinguished empty-string token.
    pub fn epsilon() -> Self {
        Self {
            name: T::EPSILON,
            attribute: String::new(),
        }
    }

    /// The distinguished end-of-input token.
    pub fn eof() -> Self {
        Self {
            name: T::EOF,
            attribute: String::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.name == T::EOF
    }
}

/// What happens to leading whitespace before each scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WhitespacePolicy {
    /// Strip all whitespace; `\n` advances the line, anything else the
    /// column.
    #[default]
    Skip,
    /// Leave the input untouched; lexemes may contain whitespace.
    Keep,
    /// Strip whitespace except `\n`, which stays for the caller to
    /// tokenize.
    KeepNewlines,
}

/// Counters accumulated across one analyzer's lifetime.
#[derive(Debug, Clone, Default)]
pub struct LexerStats {
    /// DFA simulations run.
    pub matches: usize,
    /// Tokens actually produced (peeks not counted).
    pub tokens: usize,
    /// Whitespace bytes stripped.
    pub skipped: usize,
}

/// The outcome of one [`LexicalAnalyzer::next`] or
/// [`LexicalAnalyzer::peek`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<T: Terminal> {
    /// A lexeme matched. `span` is the column range of the lexeme on
    /// `line`.
    Token {
        token: Token<T>,
        span: Range<usize>,
        line: usize,
    },
    /// The remaining input matches nothing; the input was not consumed.
    NotFound,
    /// The remaining input is empty.
    EndOfInput,
}

impl<T: Terminal> Scan<T> {
    /// The scanned token, or the EOF sentinel for the other outcomes.
    /// A [`Scan::NotFound`] is reported before the sentinel is returned,
    /// since the parser drivers treat both the same way.
    pub fn into_token(self) -> Token<T> {
        match self {
            Scan::Token { token, .. } => token,
            Scan::EndOfInput => Token::eof(),
            Scan::NotFound => {
                log::warn!("input matches no token; treating it as end of input");
                Token::eof()
            }
        }
    }
}

/// Slices tokens off the front of a contiguous input.
pub struct LexicalAnalyzer<'a, T, F>
where
    T: Terminal,
    F: Fn(StateId, &[u8]) -> Token<T>,
{
    dfa: &'a Dfa,
    factory: F,
    rest: &'a [u8],
    line: usize,
    column: usize,
    stats: LexerStats,
}

impl<'a, T, F> LexicalAnalyzer<'a, T, F>
where
    T: Terminal,
    F: Fn(StateId, &[u8]) -> Token<T>,
{
    pub fn new(dfa: &'a Dfa, factory: F, input: &'a [u8]) -> Self {
        Self {
            dfa,
            factory,
            rest: input,
            line: 0,
            column: 0,
            stats: LexerStats::default(),
        }
    }

    /// The input not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        self.rest
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// `(line, column)` of the cursor.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    pub fn stats(&self) -> LexerStats {
        self.stats.clone()
    }

    fn strip_whitespace(&mut self, policy: WhitespacePolicy) {
        if policy == WhitespacePolicy::Keep {
            return;
        }
        while let Some(&b) = self.rest.first() {
            if !b.is_ascii_whitespace() {
                break;
            }
            if b == b'\n' {
                if policy == WhitespacePolicy::KeepNewlines {
                    break;
                }
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            self.rest = &self.rest[1..];
            self.stats.skipped += 1;
        }
    }

    fn scan(&mut self) -> Option<(Token<T>, usize)> {
        self.stats.matches += 1;
        let res = self.dfa.simulate(self.rest, MatchMode::LongestPrefix);
        if !res.accepted {
            return None;
        }
        let state = res.final_states.iter().next().copied()?;
        let lexeme = res.lexeme();
        Some(((self.factory)(state, lexeme), lexeme.len()))
    }

    /// The next token, consuming its lexeme.
    ///
    /// Whitespace is handled per `policy` first; a non-matching rest of
    /// input yields [`Scan::NotFound`] without consuming anything.
    pub fn next(&mut self, policy: WhitespacePolicy) -> Scan<T> {
        self.strip_whitespace(policy);
        if self.rest.is_empty() {
            return Scan::EndOfInput;
        }
        let Some((token, len)) = self.scan() else {
            return Scan::NotFound;
        };
        let span = self.column..self.column + len;
        let line = self.line;
        self.column += len;
        self.rest = &self.rest[len..];
        self.stats.tokens += 1;
        log::trace!("token {:?} at line {}, span {:?}", token, line, span);
        Scan::Token { token, span, line }
    }

    /// As [`LexicalAnalyzer::next`], but the lexeme stays in the input
    /// and the column does not advance. Whitespace stripping may still
    /// move the cursor.
    pub fn peek(&mut self, policy: WhitespacePolicy) -> Scan<T> {
        self.strip_whitespace(policy);
        if self.rest.is_empty() {
            return Scan::EndOfInput;
        }
        let Some((token, len)) = self.scan() else {
            return Scan::NotFound;
        };
        Scan::Token {
            token,
            span: self.column..self.column + len,
            line: self.line,
        }
    }
}
