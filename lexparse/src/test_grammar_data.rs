//! Shared test fixtures: the arithmetic expression grammar in its LR
//! (left-recursive) and LL (right-recursive) forms, the DFA and token
//! factory that lex it, and hand-built parsing tables for both drivers.
//!
//! The LR semantic actions fold integer values through the state stack,
//! so tests can observe parses as arithmetic results.

use smartstring::alias::String;

use crate::fsm::{Dfa, DfaTable, StateId};
use crate::grammar::{
    Grammar, GrammarData, LlRecord, LlStack, NonTerminal, ProdElement, Production, Symbol,
    Terminal,
};
use crate::lexer::Token;
use crate::lr::{LrStack, LrState};
use crate::table::{LlEntry, LlTable, LrEntry, LrTable};

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExprG;

impl GrammarData for ExprG {
    type Term = Term;
    type NonTerm = Var;
    type RecordData = String;
    type StateData = i64;
    type Output = i64;
}

/// Integer literals lex as `Id`; single-byte operators get a final state
/// each.
pub fn expr_dfa() -> Dfa {
    let mut table = DfaTable::new();
    table.set_all(1, b'0'..=b'9', 3);
    table.set_all(3, b'0'..=b'9', 3);
    table.set(1, b'(', 4);
    table.set(1, b')', 5);
    table.set(1, b'+', 6);
    table.set(1, b'*', 7);
    Dfa::new([3, 4, 5, 6, 7].into(), table).unwrap()
}

pub fn expr_factory(state: StateId, lexeme: &[u8]) -> Token<Term> {
    match state {
        3 => Token::from_lexeme(Term::Id, lexeme),
        4 => Token::from_lexeme(Term::LeftParen, lexeme),
        5 => Token::from_lexeme(Term::RightParen, lexeme),
        6 => Token::from_lexeme(Term::Plus, lexeme),
        7 => Token::from_lexeme(Term::Star, lexeme),
        _ => unreachable!("unknown final state {state}"),
    }
}

fn sym(symbol: Symbol<ExprG>) -> ProdElement<ExprG> {
    ProdElement::Symbol(symbol)
}

fn t(term: Term) -> ProdElement<ExprG> {
    sym(Symbol::Terminal(term))
}

fn n(var: Var) -> ProdElement<ExprG> {
    sym(Symbol::NonTerminal(var))
}

fn act_mark(stack: &mut LlStack<ExprG>, _data: &mut String) {
    // tag the synthesized record sitting under the current stack top
    if let Some(i) = stack.len().checked_sub(2) {
        if let Some(record) = stack.get_mut(i).and_then(|e| e.record_mut()) {
            record.data = String::from(format!("[marked] {}", record.data).as_str());
        }
    }
}

fn syn_note(stack: &mut LlStack<ExprG>, data: &mut String) {
    log::debug!("synthesized record popped: {:?} ({} below)", data, stack.len());
}

fn act() -> ProdElement<ExprG> {
    ProdElement::Action(LlRecord::new(String::new(), Some(act_mark)))
}

fn syn() -> ProdElement<ExprG> {
    ProdElement::Synthesized(LlRecord::new(String::from("operand"), Some(syn_note)))
}

/// The right-recursive form:
/// `E -> T E'`, `E' -> + T E' | eps`, `T -> F T'`, `T' -> * F T' | eps`,
/// `F -> ( E ) | id`, with records spliced into two of the bodies.
pub fn ll_grammar() -> Grammar<ExprG> {
    Grammar::from_productions([
        // 0: E -> T {act} E' {syn}
        Production::new(Var::E, [n(Var::T), act(), n(Var::Ep), syn()]).unwrap(),
        // 1: E' -> + T E'
        Production::new(Var::Ep, [t(Term::Plus), n(Var::T), n(Var::Ep)]).unwrap(),
        // 2: T -> F T'
        Production::new(Var::T, [n(Var::F), n(Var::Tp)]).unwrap(),
        // 3: T' -> * {act} F {syn} T'
        Production::new(Var::Tp, [t(Term::Star), act(), n(Var::F), syn(), n(Var::Tp)]).unwrap(),
        // 4: F -> ( E )
        Production::new(Var::F, [t(Term::LeftParen), n(Var::E), t(Term::RightParen)]).unwrap(),
        // 5: F -> id
        Production::new(Var::F, [t(Term::Id)]).unwrap(),
        // 6: E' -> eps
        Production::new(Var::Ep, [t(Term::Epsilon)]).unwrap(),
        // 7: T' -> eps
        Production::new(Var::Tp, [t(Term::Epsilon)]).unwrap(),
    ])
}

/// The predictive table for [`ll_grammar`].
pub fn ll_table() -> LlTable<ExprG> {
    let mut table = LlTable::new(ll_grammar());
    let entries = [
        (Var::E, Term::Id, 0),
        (Var::E, Term::LeftParen, 0),
        (Var::Ep, Term::Plus, 1),
        (Var::Ep, Term::RightParen, 6),
        (Var::Ep, Term::Eof, 6),
        (Var::T, Term::Id, 2),
        (Var::T, Term::LeftParen, 2),
        (Var::Tp, Term::Star, 3),
        (Var::Tp, Term::Plus, 7),
        (Var::Tp, Term::RightParen, 7),
        (Var::Tp, Term::Eof, 7),
        (Var::F, Term::Id, 5),
        (Var::F, Term::LeftParen, 4),
    ];
    for (v, t, p) in entries {
        table.set(v, t, LlEntry::Production(p)).unwrap();
    }
    table
}

fn num_act(stack: &mut LrStack<ExprG>, state: &mut LrState<ExprG>) {
    // F -> id: the id token is on the stack top
    if let Some(top) = stack.last() {
        state.data = top.token.attribute.parse().unwrap_or(0);
    }
}

fn pass_last_act(stack: &mut LrStack<ExprG>, state: &mut LrState<ExprG>) {
    state.data = stack.last().map_or(0, |s| s.data);
}

fn pass_prelast_act(stack: &mut LrStack<ExprG>, state: &mut LrState<ExprG>) {
    // F -> ( E ): the value sits under the closing parenthesis
    state.data = stack
        .len()
        .checked_sub(2)
        .and_then(|i| stack.get(i))
        .map_or(0, |s| s.data);
}

fn add_act(stack: &mut LrStack<ExprG>, state: &mut LrState<ExprG>) {
    let a = stack
        .len()
        .checked_sub(3)
        .and_then(|i| stack.get(i))
        .map_or(0, |s| s.data);
    let b = stack.last().map_or(0, |s| s.data);
    state.data = a + b;
    log::debug!("added {} and {}", a, b);
}

fn mult_act(stack: &mut LrStack<ExprG>, state: &mut LrState<ExprG>) {
    let a = stack
        .len()
        .checked_sub(3)
        .and_then(|i| stack.get(i))
        .map_or(0, |s| s.data);
    let b = stack.last().map_or(0, |s| s.data);
    state.data = a * b;
    log::debug!("multiplied {} and {}", a, b);
}

fn accept_act(stack: &mut LrStack<ExprG>, _state: &mut LrState<ExprG>, result: &mut i64) {
    *result = stack.last().map_or(0, |s| s.data);
}

/// The left-recursive form:
/// `E' -> E`, `E -> E + T | T`, `T -> T * F | F`, `F -> ( E ) | id`,
/// with postfix actions folding integer values.
pub fn lr_grammar() -> Grammar<ExprG> {
    let te = Symbol::<ExprG>::Terminal;
    let nt = Symbol::<ExprG>::NonTerminal;
    Grammar::from_productions([
        // 0: E' -> E
        Production::of_symbols(Var::Ep, [nt(Var::E)])
            .unwrap()
            .with_accept(accept_act),
        // 1: E -> E + T
        Production::of_symbols(Var::E, [nt(Var::E), te(Term::Plus), nt(Var::T)])
            .unwrap()
            .with_reduce(add_act),
        // 2: E -> T
        Production::of_symbols(Var::E, [nt(Var::T)])
            .unwrap()
            .with_reduce(pass_last_act),
        // 3: T -> T * F
        Production::of_symbols(Var::T, [nt(Var::T), te(Term::Star), nt(Var::F)])
            .unwrap()
            .with_reduce(mult_act),
        // 4: T -> F
        Production::of_symbols(Var::T, [nt(Var::F)])
            .unwrap()
            .with_reduce(pass_last_act),
        // 5: F -> ( E )
        Production::of_symbols(
            Var::F,
            [te(Term::LeftParen), nt(Var::E), te(Term::RightParen)],
        )
        .unwrap()
        .with_reduce(pass_prelast_act),
        // 6: F -> id
        Production::of_symbols(Var::F, [te(Term::Id)])
            .unwrap()
            .with_reduce(num_act),
    ])
}

/// The hand-built SLR table for [`lr_grammar`] (the classic twelve
/// states).
pub fn lr_table() -> LrTable<ExprG> {
    let mut table = LrTable::new(lr_grammar());
    table.reserve_states(12);

    let shifts = [
        (0, Term::Id, 5),
        (0, Term::LeftParen, 4),
        (1, Term::Plus, 6),
        (2, Term::Star, 7),
        (4, Term::Id, 5),
        (4, Term::LeftParen, 4),
        (6, Term::Id, 5),
        (6, Term::LeftParen, 4),
        (7, Term::Id, 5),
        (7, Term::LeftParen, 4),
        (8, Term::Plus, 6),
        (8, Term::RightParen, 11),
        (9, Term::Star, 7),
    ];
    for (s, t, next) in shifts {
        table.set_action(s, t, LrEntry::Shift(next)).unwrap();
    }

    let reduces = [
        (2, 2, vec![Term::Plus, Term::RightParen, Term::Eof]),
        (3, 4, vec![Term::Plus, Term::Star, Term::RightParen, Term::Eof]),
        (5, 6, vec![Term::Plus, Term::Star, Term::RightParen, Term::Eof]),
        (9, 1, vec![Term::Plus, Term::RightParen, Term::Eof]),
        (10, 3, vec![Term::Plus, Term::Star, Term::RightParen, Term::Eof]),
        (11, 5, vec![Term::Plus, Term::Star, Term::RightParen, Term::Eof]),
    ];
    for (s, prod, terms) in reduces {
        for t in terms {
            table.set_action(s, t, LrEntry::Reduce(prod)).unwrap();
        }
    }

    table.set_action(1, Term::Eof, LrEntry::Accept).unwrap();

    let gotos = [
        (0, Var::E, 1),
        (0, Var::T, 2),
        (0, Var::F, 3),
        (4, Var::E, 8),
        (4, Var::T, 2),
        (4, Var::F, 3),
        (6, Var::T, 9),
        (6, Var::F, 3),
        (7, Var::F, 10),
    ];
    for (s, v, next) in gotos {
        table.set_goto(s, v, LrEntry::Goto(next)).unwrap();
    }

    table
}
