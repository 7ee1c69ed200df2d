//! Construction of parsing tables from a grammar.
//!
//! [`canonical_collection`] builds the canonical collection of LR(0)
//! item sets by iterating CLOSURE and GOTO from the augmented start
//! production; [`lr1_collection`] does the same with LR(1) items, seeded
//! with the end marker as the start item's lookahead. Three table
//! builders sit on top:
//!
//! - [`slr_table`] — SLR(1): reduces placed over FOLLOW of the head.
//! - [`lr1_table`] — canonical LR(1): reduces placed over each complete
//!   item's own lookaheads.
//! - [`ll_table`] — predictive: each production claims the cells of
//!   FIRST of its body, plus FOLLOW of its head (and the EPSILON column,
//!   which panic-mode recovery consults) when the body derives the empty
//!   string.
//!
//! Two demands on one cell that disagree are a conflict error — the
//! grammar is simply not in the class the builder targets. Epsilon
//! productions are rejected up front by the LR builders.

use smartstring::alias::String;
use thiserror::Error;

use crate::grammar::{Grammar, GrammarData, GrammarError, NonTerminal, Symbol, TermSet, Terminal};
use crate::item::{Item, ItemSet};
use crate::table::{LlEntry, LlTable, LrEntry, LrTable, TableError};

/// Failures of table construction.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Table(#[from] TableError),

    /// Two actions competed for the same LR cell: the grammar is not in
    /// the targeted class.
    #[error("conflict in state {state} on {symbol}: {existing:?} vs {proposed:?}")]
    Conflict {
        state: usize,
        symbol: String,
        existing: LrEntry,
        proposed: LrEntry,
    },

    /// Two productions competed for the same LL cell: the grammar is
    /// not LL(1).
    #[error("conflict for {nonterminal} on {terminal}: productions {existing} and {proposed}")]
    LlConflict {
        nonterminal: String,
        terminal: String,
        existing: usize,
        proposed: usize,
    },

    /// Epsilon productions have no place in a shift/reduce table built
    /// here.
    #[error("epsilon productions are not supported by LR table construction (production {index})")]
    EpsilonProduction { index: usize },

    /// A GOTO target did not appear in the collection; this cannot
    /// happen for a collection built by this module.
    #[error("a goto target is missing from the canonical collection")]
    MissingState,
}

fn find_state<G: GrammarData>(states: &[ItemSet<G>], target: &ItemSet<G>) -> Option<usize> {
    states.iter().position(|s| s == target)
}

/// Every symbol a dot can sit in front of: all terminals except the
/// EPSILON sentinel, then all non-terminals.
fn grammar_symbols<G: GrammarData>() -> Vec<Symbol<G>> {
    let mut symbols = Vec::with_capacity(G::Term::COUNT + G::NonTerm::COUNT);
    for i in 0..G::Term::COUNT {
        if let Some(t) = G::Term::from_index(i) {
            if t != G::Term::EPSILON {
                symbols.push(Symbol::Terminal(t));
            }
        }
    }
    for i in 0..G::NonTerm::COUNT {
        if let Some(n) = G::NonTerm::from_index(i) {
            symbols.push(Symbol::NonTerminal(n));
        }
    }
    symbols
}

fn reject_epsilon_productions<G: GrammarData>(grammar: &Grammar<G>) -> Result<(), BuildError> {
    for prod in grammar.iter() {
        if prod.is_epsilon() {
            return Err(BuildError::EpsilonProduction {
                index: prod.index(),
            });
        }
    }
    grammar.start_symbol()?;
    Ok(())
}

/// Iterates CLOSURE and GOTO from `start` until no new state appears.
/// State 0 is the closure of the start item; every further state is the
/// GOTO of an existing state on some symbol, in discovery order.
fn collection<G: GrammarData>(
    grammar: &Grammar<G>,
    start: Item<G>,
) -> Result<Vec<ItemSet<G>>, BuildError> {
    let start_set = ItemSet::from_items([start]);
    let closed = start_set.closure_items(grammar)?.to_vec();
    let mut states: Vec<ItemSet<G>> = vec![ItemSet::from_items(closed)];

    let symbols = grammar_symbols::<G>();
    let mut i = 0;
    while i < states.len() {
        let mut discovered: Vec<ItemSet<G>> = Vec::new();
        for &sym in &symbols {
            let next = states[i].goto(sym, grammar)?;
            if next.is_empty() {
                continue;
            }
            if states.iter().chain(discovered.iter()).all(|s| *s != next) {
                discovered.push(next);
            }
        }
        states.extend(discovered);
        i += 1;
    }
    log::debug!("collection holds {} states", states.len());
    Ok(states)
}

/// The canonical collection of LR(0) item sets of `grammar`.
pub fn canonical_collection<G: GrammarData>(
    grammar: &Grammar<G>,
) -> Result<Vec<ItemSet<G>>, BuildError> {
    reject_epsilon_productions(grammar)?;
    let start = Item::new(grammar.production(0)?.clone(), 0, TermSet::<G>::new())?;
    collection(grammar, start)
}

/// The canonical collection of LR(1) item sets of `grammar`, seeded
/// with the end marker as the start item's lookahead.
pub fn lr1_collection<G: GrammarData>(
    grammar: &Grammar<G>,
) -> Result<Vec<ItemSet<G>>, BuildError> {
    reject_epsilon_productions(grammar)?;
    grammar.compute_first()?;
    let start = Item::new(
        grammar.production(0)?.clone(),
        0,
        TermSet::<G>::from([G::Term::EOF]),
    )?;
    collection(grammar, start)
}

fn claim(
    row: &mut [LrEntry],
    col: usize,
    entry: LrEntry,
    state: usize,
    symbol: String,
) -> Result<(), BuildError> {
    let existing = row[col];
    if existing == entry {
        return Ok(());
    }
    if !existing.is_error() {
        return Err(BuildError::Conflict {
            state,
            symbol,
            existing,
            proposed: entry,
        });
    }
    row[col] = entry;
    Ok(())
}

fn symbol_name<S: std::fmt::Debug>(s: &S) -> String {
    String::from(format!("{:?}", s).as_str())
}

/// Fills action and goto matrices over `states`. Shift, goto and accept
/// placement is common to every LR flavor; `reduce_terms` decides which
/// terminal columns a complete item's reduction claims.
fn fill_lr_tables<G: GrammarData>(
    grammar: &Grammar<G>,
    states: &[ItemSet<G>],
    reduce_terms: &dyn Fn(&Grammar<G>, &Item<G>) -> Result<Vec<G::Term>, BuildError>,
) -> Result<(Vec<Vec<LrEntry>>, Vec<Vec<LrEntry>>), BuildError> {
    let t_count = G::Term::COUNT;
    let nt_count = G::NonTerm::COUNT;
    let mut actions = vec![vec![LrEntry::Error; t_count]; states.len()];
    let mut gotos = vec![vec![LrEntry::Error; nt_count]; states.len()];

    for (si, state) in states.iter().enumerate() {
        for item in state.iter() {
            match item.symbol_at_dot() {
                Some(sym @ Symbol::Terminal(t)) => {
                    let col: usize = t.into();
                    if col >= t_count {
                        return Err(TableError::TerminalOutOfRange {
                            index: col,
                            count: t_count,
                        }
                        .into());
                    }
                    let next = state.goto(sym, grammar)?;
                    let j = find_state(states, &next).ok_or(BuildError::MissingState)?;
                    claim(&mut actions[si], col, LrEntry::Shift(j), si, symbol_name(&t))?;
                }
                Some(sym @ Symbol::NonTerminal(n)) => {
                    let col: usize = n.into();
                    if col >= nt_count {
                        return Err(TableError::NonTerminalOutOfRange {
                            index: col,
                            count: nt_count,
                        }
                        .into());
                    }
                    let next = state.goto(sym, grammar)?;
                    let j = find_state(states, &next).ok_or(BuildError::MissingState)?;
                    claim(&mut gotos[si], col, LrEntry::Goto(j), si, symbol_name(&n))?;
                }
                None => {
                    let prod = item.production();
                    if prod.index() == 0 {
                        let col: usize = G::Term::EOF.into();
                        claim(
                            &mut actions[si],
                            col,
                            LrEntry::Accept,
                            si,
                            symbol_name(&G::Term::EOF),
                        )?;
                    } else {
                        for t in reduce_terms(grammar, item)? {
                            let col: usize = t.into();
                            if col >= t_count {
                                return Err(TableError::TerminalOutOfRange {
                                    index: col,
                                    count: t_count,
                                }
                                .into());
                            }
                            claim(
                                &mut actions[si],
                                col,
                                LrEntry::Reduce(prod.index()),
                                si,
                                symbol_name(&t),
                            )?;
                        }
                    }
                }
            }
        }
    }
    Ok((actions, gotos))
}

/// Builds an SLR(1) parsing table, consuming the grammar into the
/// table. FIRST and FOLLOW are computed as a side effect.
pub fn slr_table<G: GrammarData>(grammar: Grammar<G>) -> Result<LrTable<G>, BuildError> {
    grammar.compute_first()?;
    grammar.compute_follow()?;
    let states = canonical_collection(&grammar)?;
    let reduce_terms = |grammar: &Grammar<G>, item: &Item<G>| -> Result<Vec<G::Term>, BuildError> {
        Ok(grammar
            .follow_of(item.production().head())?
            .iter()
            .copied()
            .collect())
    };
    let (actions, gotos) = fill_lr_tables(&grammar, &states, &reduce_terms)?;
    Ok(LrTable::from_parts(grammar, actions, gotos))
}

/// Builds a canonical LR(1) parsing table, consuming the grammar into
/// the table. Reductions claim only each complete item's own
/// lookaheads, so the table accepts exactly the LR(1) class at the cost
/// of a larger state count than [`slr_table`] produces.
pub fn lr1_table<G: GrammarData>(grammar: Grammar<G>) -> Result<LrTable<G>, BuildError> {
    let states = lr1_collection(&grammar)?;
    let reduce_terms = |_: &Grammar<G>, item: &Item<G>| -> Result<Vec<G::Term>, BuildError> {
        Ok(item.lookaheads().iter().copied().collect())
    };
    let (actions, gotos) = fill_lr_tables(&grammar, &states, &reduce_terms)?;
    Ok(LrTable::from_parts(grammar, actions, gotos))
}

/// Builds a predictive LL(1) table, consuming the grammar into the
/// table.
///
/// Each production claims the cells of FIRST of its body; when the body
/// derives the empty string, it also claims FOLLOW of its head and the
/// EPSILON column (the marker panic-mode recovery looks for).
pub fn ll_table<G: GrammarData>(grammar: Grammar<G>) -> Result<LlTable<G>, BuildError> {
    grammar.compute_first()?;
    grammar.compute_follow()?;

    let mut cells: Vec<(G::NonTerm, G::Term, usize)> = Vec::new();
    for prod in grammar.iter() {
        let head = prod.head();
        let body_first = prod
            .symbol_string()
            .first(grammar.first_sets()?)?
            .clone();
        for &t in &body_first {
            if t != G::Term::EPSILON {
                cells.push((head, t, prod.index()));
            }
        }
        if body_first.contains(&G::Term::EPSILON) {
            for &t in grammar.follow_of(head)? {
                cells.push((head, t, prod.index()));
            }
            cells.push((head, G::Term::EPSILON, prod.index()));
        }
    }

    let mut table = LlTable::new(grammar);
    for (head, t, index) in cells {
        match table.entry(head, t)? {
            LlEntry::Production(existing) if existing != index => {
                return Err(BuildError::LlConflict {
                    nonterminal: symbol_name(&head),
                    terminal: symbol_name(&t),
                    existing,
                    proposed: index,
                });
            }
            LlEntry::Production(_) => {}
            _ => table.set(head, t, LlEntry::Production(index))?,
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{Dfa, DfaTable, StateId};
    use crate::grammar::Production;
    use crate::lexer::{LexicalAnalyzer, Token};
    use crate::ll::LlParser;
    use crate::lr::LrParser;
    use crate::recovery::ErrorRecovery;
    use crate::test_grammar_data::{expr_dfa, expr_factory, ll_grammar, lr_grammar, Term, Var};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn the_expression_grammar_has_the_classic_twelve_states() {
        init_logger();
        let grammar = lr_grammar();
        let states = canonical_collection(&grammar).unwrap();
        assert_eq!(states.len(), 12);
        // state 0 is the closure of the start item: one item per
        // production
        assert_eq!(states[0].len(), 7);
    }

    #[test]
    fn every_state_of_the_collection_is_closed() {
        let grammar = lr_grammar();
        let states = canonical_collection(&grammar).unwrap();
        for state in &states {
            let reclosed = ItemSet::from_items(state.items().to_vec());
            let reclosed = ItemSet::from_items(reclosed.closure_items(&grammar).unwrap().to_vec());
            assert_eq!(reclosed, *state);
        }
    }

    #[test]
    fn a_generated_slr_table_drives_the_parser() {
        init_logger();
        let table = slr_table(lr_grammar()).unwrap();
        let dfa = expr_dfa();
        for (input, value) in [
            (&b"12"[..], 12),
            (b"12 + 34", 46),
            (b"2 * 3 + 4", 10),
            (b"2 + 3 * 4", 14),
            (b"( 2 + 3 ) * 4", 20),
        ] {
            let lexer = LexicalAnalyzer::new(&dfa, expr_factory, input);
            let mut parser = LrParser::new(&table, lexer).unwrap();
            assert_eq!(parser.parse(0, ErrorRecovery::None).unwrap(), value);
        }
    }

    #[test]
    fn a_generated_lr1_table_agrees_with_the_slr_one() {
        init_logger();
        let table = lr1_table(lr_grammar()).unwrap();
        let dfa = expr_dfa();
        for (input, value) in [
            (&b"12"[..], 12),
            (b"12 + 34", 46),
            (b"2 * 3 + 4", 10),
            (b"( 2 + 3 ) * 4", 20),
        ] {
            let lexer = LexicalAnalyzer::new(&dfa, expr_factory, input);
            let mut parser = LrParser::new(&table, lexer).unwrap();
            assert_eq!(parser.parse(0, ErrorRecovery::None).unwrap(), value);
        }
    }

    #[test]
    fn generated_tables_reject_what_the_grammar_rejects() {
        let slr = slr_table(lr_grammar()).unwrap();
        let lr1 = lr1_table(lr_grammar()).unwrap();
        let dfa = expr_dfa();
        for table in [&slr, &lr1] {
            for input in [&b"12 +"[..], b"* 3", b"( 2", b"2 )"] {
                let lexer = LexicalAnalyzer::new(&dfa, expr_factory, input);
                let mut parser = LrParser::new(table, lexer).unwrap();
                assert!(parser.parse(0, ErrorRecovery::None).is_err(), "{:?}", input);
            }
        }
    }

    #[test]
    fn a_generated_ll_table_drives_the_predictive_parser() {
        init_logger();
        let table = ll_table(ll_grammar()).unwrap();
        let dfa = expr_dfa();
        let lexer = LexicalAnalyzer::new(&dfa, expr_factory, b"12 + 34");
        let mut parser = LlParser::new(&table, lexer);
        parser.parse(ErrorRecovery::None).unwrap();
        assert_eq!(parser.derivation(), &[0, 2, 5, 7, 1, 2, 5, 7, 6]);
    }

    #[test]
    fn a_left_recursive_grammar_is_not_ll1() {
        // E -> E + T and E -> T share their FIRST sets
        assert!(matches!(
            ll_table(lr_grammar()),
            Err(BuildError::LlConflict { .. })
        ));
    }

    #[test]
    fn ambiguity_surfaces_as_a_conflict() {
        // E -> E + E | id is not SLR(1): shift/reduce on +
        let t = Symbol::<crate::test_grammar_data::ExprG>::Terminal;
        let n = Symbol::<crate::test_grammar_data::ExprG>::NonTerminal;
        let grammar = Grammar::from_productions([
            Production::of_symbols(Var::Ep, [n(Var::E)]).unwrap(),
            Production::of_symbols(Var::E, [n(Var::E), t(Term::Plus), n(Var::E)]).unwrap(),
            Production::of_symbols(Var::E, [t(Term::Id)]).unwrap(),
        ]);
        assert!(matches!(
            slr_table(grammar),
            Err(BuildError::Conflict { .. })
        ));
    }

    #[test]
    fn epsilon_productions_are_rejected() {
        let grammar = Grammar::from_productions([
            Production::<crate::test_grammar_data::ExprG>::of_symbols(
                Var::E,
                [Symbol::Terminal(Term::Epsilon)],
            )
            .unwrap(),
        ]);
        assert!(matches!(
            canonical_collection(&grammar),
            Err(BuildError::EpsilonProduction { index: 0 })
        ));
    }

    // the textbook LR(1) grammar: S' -> S, S -> CC, C -> cC | d
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum CTerm {
        C,
        D,
        Eof,
        Epsilon,
    }

    impl From<CTerm> for usize {
        fn from(t: CTerm) -> usize {
            t as usize
        }
    }

    impl Terminal for CTerm {
        const COUNT: usize = 4;
        const EPSILON: Self = CTerm::Epsilon;
        const EOF: Self = CTerm::Eof;

        fn from_index(index: usize) -> Option<Self> {
            [CTerm::C, CTerm::D, CTerm::Eof, CTerm::Epsilon]
                .get(index)
                .copied()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum CVar {
        Start,
        S,
        C,
    }

    impl From<CVar> for usize {
        fn from(v: CVar) -> usize {
            v as usize
        }
    }

    impl NonTerminal for CVar {
        const COUNT: usize = 3;

        fn from_index(index: usize) -> Option<Self> {
            [CVar::Start, CVar::S, CVar::C].get(index).copied()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct CG;

    impl GrammarData for CG {
        type Term = CTerm;
        type NonTerm = CVar;
        type RecordData = ();
        type StateData = ();
        type Output = ();
    }

    fn cc_grammar() -> Grammar<CG> {
        let t = Symbol::<CG>::Terminal;
        let n = Symbol::<CG>::NonTerminal;
        Grammar::from_productions([
            Production::of_symbols(CVar::Start, [n(CVar::S)]).unwrap(),
            Production::of_symbols(CVar::S, [n(CVar::C), n(CVar::C)]).unwrap(),
            Production::of_symbols(CVar::C, [t(CTerm::C), n(CVar::C)]).unwrap(),
            Production::of_symbols(CVar::C, [t(CTerm::D)]).unwrap(),
        ])
    }

    fn cd_dfa() -> Dfa {
        let mut table = DfaTable::new();
        table.set(1, b'c', 2);
        table.set(1, b'd', 3);
        Dfa::new([2, 3].into(), table).unwrap()
    }

    fn cd_factory(state: StateId, lexeme: &[u8]) -> Token<CTerm> {
        match state {
            2 => Token::from_lexeme(CTerm::C, lexeme),
            _ => Token::from_lexeme(CTerm::D, lexeme),
        }
    }

    #[test]
    fn the_lr1_collection_splits_states_by_lookahead() {
        init_logger();
        let grammar = cc_grammar();
        // the classic count: ten LR(1) states against seven LR(0) ones
        assert_eq!(lr1_collection(&grammar).unwrap().len(), 10);
        assert_eq!(canonical_collection(&grammar).unwrap().len(), 7);
    }

    #[test]
    fn an_lr1_table_parses_the_textbook_grammar() {
        init_logger();
        let table = lr1_table(cc_grammar()).unwrap();
        let dfa = cd_dfa();
        for (input, ok) in [
            (&b"dd"[..], true),
            (b"cdd", true),
            (b"cdcd", true),
            (b"d", false),
            (b"cd", false),
            (b"ddc", false),
        ] {
            let lexer = LexicalAnalyzer::new(&dfa, cd_factory, input);
            let mut parser = LrParser::new(&table, lexer).unwrap();
            let res = parser.parse((), ErrorRecovery::None);
            assert_eq!(res.is_ok(), ok, "{:?}", input);
        }
    }

    // left recursion is the LR parser's home turf
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum RTerm {
        A,
        Eof,
        Epsilon,
    }

    impl From<RTerm> for usize {
        fn from(t: RTerm) -> usize {
            t as usize
        }
    }

    impl Terminal for RTerm {
        const COUNT: usize = 3;
        const EPSILON: Self = RTerm::Epsilon;
        const EOF: Self = RTerm::Eof;

        fn from_index(index: usize) -> Option<Self> {
            [RTerm::A, RTerm::Eof, RTerm::Epsilon].get(index).copied()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum RVar {
        Start,
        S,
    }

    impl From<RVar> for usize {
        fn from(v: RVar) -> usize {
            v as usize
        }
    }

    impl NonTerminal for RVar {
        const COUNT: usize = 2;

        fn from_index(index: usize) -> Option<Self> {
            [RVar::Start, RVar::S].get(index).copied()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct RG;

    impl GrammarData for RG {
        type Term = RTerm;
        type NonTerm = RVar;
        type RecordData = ();
        type StateData = ();
        type Output = ();
    }

    #[test]
    fn a_left_recursive_grammar_parses_under_lr() {
        let t = Symbol::<RG>::Terminal;
        let n = Symbol::<RG>::NonTerminal;
        let grammar = Grammar::from_productions([
            Production::of_symbols(RVar::Start, [n(RVar::S)]).unwrap(),
            Production::of_symbols(RVar::S, [n(RVar::S), t(RTerm::A)]).unwrap(),
            Production::of_symbols(RVar::S, [t(RTerm::A)]).unwrap(),
        ]);
        let table = slr_table(grammar).unwrap();

        let mut dfa_table = DfaTable::new();
        dfa_table.set(1, b'a', 2);
        let dfa = Dfa::new([2].into(), dfa_table).unwrap();
        let factory = |_: StateId, lexeme: &[u8]| Token::from_lexeme(RTerm::A, lexeme);

        let lexer = LexicalAnalyzer::new(&dfa, factory, b"aaa");
        let mut parser = LrParser::new(&table, lexer).unwrap();
        parser.parse((), ErrorRecovery::None).unwrap();
        // S -> a first, then S -> S a twice
        assert_eq!(parser.reductions(), &[2, 1, 1]);
    }
}
