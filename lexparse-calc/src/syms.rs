//! The terminal and non-terminal enumerations of the expression
//! grammar, tied together on the [`CalcGrammar`] marker.

use lexparse::{GrammarData, NonTerminal, Terminal};
use smartstring::alias::String;

/// Terminals. `Id` covers both integer literals and variable names (the
/// token factory resolves variables before the parser sees them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    Id,
    LeftParen,
    RightParen,
    Plus,
    Star,
    Eof,
    Epsilon,
}

impl From<Term> for usize {
    fn from(t: Term) -> usize {
        t as usize
    }
}

impl Terminal for Term {
    const COUNT: usize = 7;
    const EPSILON: Self = Term::Epsilon;
    const EOF: Self = Term::Eof;

    fn from_index(index: usize) -> Option<Self> {
        [
            Term::Id,
            Term::LeftParen,
            Term::RightParen,
            Term::Plus,
            Term::Star,
            Term::Eof,
            Term::Epsilon,
        ]
        .get(index)
        .copied()
    }
}

/// Non-terminals. `Ep` doubles as the augmented start symbol of the LR
/// form and as the `E'` tail of the LL form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Var {
    E,
    Ep,
    T,
    Tp,
    F,
}

impl From<Var> for usize {
    fn from(v: Var) -> usize {
        v as usize
    }
}

impl NonTerminal for Var {
    const COUNT: usize = 5;

    fn from_index(index: usize) -> Option<Self> {
        [Var::E, Var::Ep, Var::T, Var::Tp, Var::F].get(index).copied()
    }
}

/// The type bundle: LR states carry `i64` values, LL records carry
/// strings, and a parse produces an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalcGrammar;

impl GrammarData for CalcGrammar {
    type Term = Term;
    type NonTerm = Var;
    type RecordData = String;
    type StateData = i64;
    type Output = i64;
}
