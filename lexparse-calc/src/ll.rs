//! The predictive side of the calculator.
//!
//! The grammar is the right-recursive form
//! `E -> T E'`, `E' -> + T E' | eps`, `T -> F T'`, `T' -> * F T' | eps`,
//! `F -> ( E ) | id`, with synthesized and action records spliced into
//! two bodies to exercise the record machinery. A successful parse
//! yields the leftmost derivation as a list of production indices.

use lexparse::lexer::LexicalAnalyzer;
use lexparse::ll::LlParser;
use lexparse::recovery::ErrorRecovery;
use lexparse::table::{LlEntry, LlTable};
use lexparse::{Grammar, LlRecord, LlStack, ProdElement, Production, Symbol};
use smartstring::alias::String;

use crate::error::CalcError;
use crate::lexer::{calc_dfa, calc_factory};
use crate::symtab::SymTab;
use crate::syms::{CalcGrammar, Term, Var};

fn t(term: Term) -> ProdElement<CalcGrammar> {
    ProdElement::Symbol(Symbol::Terminal(term))
}

fn n(var: Var) -> ProdElement<CalcGrammar> {
    ProdElement::Symbol(Symbol::NonTerminal(var))
}

fn mark_act(stack: &mut LlStack<CalcGrammar>, _data: &mut String) {
    // annotate the synthesized record under the current stack top
    if let Some(i) = stack.len().checked_sub(2) {
        if let Some(record) = stack.get_mut(i).and_then(|e| e.record_mut()) {
            record.data = String::from(format!("[seen] {}", record.data).as_str());
        }
    }
}

fn note_act(_stack: &mut LlStack<CalcGrammar>, data: &mut String) {
    log::debug!("synthesized: {:?}", data);
}

fn act() -> ProdElement<CalcGrammar> {
    ProdElement::Action(LlRecord::new(String::new(), Some(mark_act)))
}

fn syn() -> ProdElement<CalcGrammar> {
    ProdElement::Synthesized(LlRecord::new(String::from("term"), Some(note_act)))
}

/// The right-recursive expression grammar.
pub fn grammar() -> Result<Grammar<CalcGrammar>, CalcError> {
    Ok(Grammar::from_productions([
        // 0: E -> T {act} E' {syn}
        Production::new(Var::E, [n(Var::T), act(), n(Var::Ep), syn()])?,
        // 1: E' -> + T E'
        Production::new(Var::Ep, [t(Term::Plus), n(Var::T), n(Var::Ep)])?,
        // 2: T -> F T'
        Production::new(Var::T, [n(Var::F), n(Var::Tp)])?,
        // 3: T' -> * {act} F {syn} T'
        Production::new(Var::Tp, [t(Term::Star), act(), n(Var::F), syn(), n(Var::Tp)])?,
        // 4: F -> ( E )
        Production::new(Var::F, [t(Term::LeftParen), n(Var::E), t(Term::RightParen)])?,
        // 5: F -> id
        Production::new(Var::F, [t(Term::Id)])?,
        // 6: E' -> eps
        Production::new(Var::Ep, [t(Term::Epsilon)])?,
        // 7: T' -> eps
        Production::new(Var::Tp, [t(Term::Epsilon)])?,
    ]))
}

/// The predictive table for [`grammar`], entries derived from the
/// FIRST/FOLLOW sets of the right-recursive form.
pub fn table() -> Result<LlTable<CalcGrammar>, CalcError> {
    let mut table = LlTable::new(grammar()?);
    let entries = [
        (Var::E, Term::Id, 0),
        (Var::E, Term::LeftParen, 0),
        (Var::Ep, Term::Plus, 1),
        (Var::Ep, Term::RightParen, 6),
        (Var::Ep, Term::Eof, 6),
        // the epsilon column marks the nullable alternatives for
        // panic-mode synchronization
        (Var::Ep, Term::Epsilon, 6),
        (Var::T, Term::Id, 2),
        (Var::T, Term::LeftParen, 2),
        (Var::Tp, Term::Star, 3),
        (Var::Tp, Term::Plus, 7),
        (Var::Tp, Term::RightParen, 7),
        (Var::Tp, Term::Eof, 7),
        (Var::Tp, Term::Epsilon, 7),
        (Var::F, Term::Id, 5),
        (Var::F, Term::LeftParen, 4),
    ];
    for (v, term, p) in entries {
        table.set(v, term, LlEntry::Production(p))?;
    }
    Ok(table)
}

/// Parses one expression predictively and returns the leftmost
/// derivation (the expanded production indices in order).
pub fn parse_expression(
    symtab: &SymTab,
    input: &str,
    recovery: ErrorRecovery,
) -> Result<Vec<usize>, CalcError> {
    let table = table()?;
    let dfa = calc_dfa();
    let factory = calc_factory(symtab);
    let lexer = LexicalAnalyzer::new(&dfa, factory, input.as_bytes());
    let mut parser = LlParser::new(&table, lexer);
    parser.parse(recovery)?;
    Ok(parser.derivation().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexparse::ll::LlError;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn derive(input: &str) -> Result<Vec<usize>, CalcError> {
        init_logger();
        parse_expression(&SymTab::new(), input, ErrorRecovery::None)
    }

    #[test]
    fn a_single_operand_derives_leftmost() {
        // E -> TE', T -> FT', F -> id, T' -> eps, E' -> eps
        assert_eq!(derive("7").unwrap(), vec![0, 2, 5, 7, 6]);
    }

    #[test]
    fn a_sum_derives_leftmost() {
        assert_eq!(
            derive("1 + 2").unwrap(),
            vec![0, 2, 5, 7, 1, 2, 5, 7, 6]
        );
    }

    #[test]
    fn precedence_and_grouping_parse() {
        derive("1 * 2 + 3").unwrap();
        derive("( 1 + 2 ) * 3").unwrap();
    }

    #[test]
    fn variables_tokenize_like_literals() {
        let mut symtab = SymTab::new();
        symtab.set("x", 1);
        parse_expression(&symtab, "x + 2", ErrorRecovery::None).unwrap();
    }

    #[test]
    fn a_dangling_operator_is_rejected() {
        assert!(matches!(
            derive("1 +"),
            Err(CalcError::Ll(LlError::Unrecoverable { .. }))
        ));
    }

    #[test]
    fn a_doubled_operator_recovers_predictively() {
        init_logger();
        let derivation =
            parse_expression(&SymTab::new(), "1 + + 2", ErrorRecovery::PanicMode).unwrap();
        assert!(!derivation.is_empty());
    }
}
