//! The shift/reduce side of the calculator.
//!
//! The grammar is the left-recursive form
//! `E' -> E`, `E -> E + T | T`, `T -> T * F | F`, `F -> ( E ) | id`;
//! its SLR table is generated at construction time and the postfix
//! actions fold `i64` values through the state stack.

use lexparse::fsm::Dfa;
use lexparse::lexer::LexicalAnalyzer;
use lexparse::lr::{LrParser, LrStack, LrState, ParserStats};
use lexparse::recovery::ErrorRecovery;
use lexparse::table::LrTable;
use lexparse::tablegen::slr_table;
use lexparse::{Grammar, Production, Symbol};

use crate::error::CalcError;
use crate::lexer::{calc_dfa, calc_factory};
use crate::symtab::SymTab;
use crate::syms::{CalcGrammar, Term, Var};

fn num_act(stack: &mut LrStack<CalcGrammar>, state: &mut LrState<CalcGrammar>) {
    // F -> id: the id token sits on the stack top
    if let Some(top) = stack.last() {
        state.data = top.token.attribute.parse().unwrap_or(0);
        log::debug!("operand {}", state.data);
    }
}

fn pass_last_act(stack: &mut LrStack<CalcGrammar>, state: &mut LrState<CalcGrammar>) {
    state.data = stack.last().map_or(0, |s| s.data);
}

fn pass_prelast_act(stack: &mut LrStack<CalcGrammar>, state: &mut LrState<CalcGrammar>) {
    // F -> ( E ): the value sits under the closing parenthesis
    state.data = stack
        .len()
        .checked_sub(2)
        .and_then(|i| stack.get(i))
        .map_or(0, |s| s.data);
}

fn operand_pair(stack: &LrStack<CalcGrammar>) -> (i64, i64) {
    let a = stack
        .len()
        .checked_sub(3)
        .and_then(|i| stack.get(i))
        .map_or(0, |s| s.data);
    let b = stack.last().map_or(0, |s| s.data);
    (a, b)
}

fn add_act(stack: &mut LrStack<CalcGrammar>, state: &mut LrState<CalcGrammar>) {
    let (a, b) = operand_pair(stack);
    state.data = a.wrapping_add(b);
    log::debug!("{} + {} = {}", a, b, state.data);
}

fn mult_act(stack: &mut LrStack<CalcGrammar>, state: &mut LrState<CalcGrammar>) {
    let (a, b) = operand_pair(stack);
    state.data = a.wrapping_mul(b);
    log::debug!("{} * {} = {}", a, b, state.data);
}

fn accept_act(stack: &mut LrStack<CalcGrammar>, _state: &mut LrState<CalcGrammar>, result: &mut i64) {
    *result = stack.last().map_or(0, |s| s.data);
}

/// The left-recursive expression grammar with its semantic actions.
pub fn grammar() -> Result<Grammar<CalcGrammar>, CalcError> {
    let t = Symbol::<CalcGrammar>::Terminal;
    let n = Symbol::<CalcGrammar>::NonTerminal;
    Ok(Grammar::from_productions([
        // 0: E' -> E
        Production::of_symbols(Var::Ep, [n(Var::E)])?.with_accept(accept_act),
        // 1: E -> E + T
        Production::of_symbols(Var::E, [n(Var::E), t(Term::Plus), n(Var::T)])?
            .with_reduce(add_act),
        // 2: E -> T
        Production::of_symbols(Var::E, [n(Var::T)])?.with_reduce(pass_last_act),
        // 3: T -> T * F
        Production::of_symbols(Var::T, [n(Var::T), t(Term::Star), n(Var::F)])?
            .with_reduce(mult_act),
        // 4: T -> F
        Production::of_symbols(Var::T, [n(Var::F)])?.with_reduce(pass_last_act),
        // 5: F -> ( E )
        Production::of_symbols(Var::F, [t(Term::LeftParen), n(Var::E), t(Term::RightParen)])?
            .with_reduce(pass_prelast_act),
        // 6: F -> id
        Production::of_symbols(Var::F, [t(Term::Id)])?.with_reduce(num_act),
    ]))
}

/// An expression evaluator: generated SLR table, hand-built DFA, and a
/// symbol table for variables.
///
/// # Example
/// ```rust
/// # use lexparse_calc::Calculator;
/// let mut calc = Calculator::new().unwrap();
/// calc.set("x", 5);
/// assert_eq!(calc.evaluate("x * (2 + 3)").unwrap(), 25);
/// ```
pub struct Calculator {
    table: LrTable<CalcGrammar>,
    dfa: Dfa,
    symtab: SymTab,
}

impl Calculator {
    pub fn new() -> Result<Self, CalcError> {
        Ok(Self {
            table: slr_table(grammar()?)?,
            dfa: calc_dfa(),
            symtab: SymTab::new(),
        })
    }

    /// Defines a variable for subsequent evaluations.
    pub fn set(&mut self, name: impl AsRef<str>, value: i64) {
        self.symtab.set(name, value);
    }

    pub fn symtab(&self) -> &SymTab {
        &self.symtab
    }

    /// Evaluates one expression, failing on the first syntax error.
    pub fn evaluate(&self, input: &str) -> Result<i64, CalcError> {
        self.run(input, ErrorRecovery::None).map(|(value, _)| value)
    }

    /// Evaluates with panic-mode recovery; returns the value together
    /// with the parser's counters (including recovered errors).
    pub fn evaluate_recovering(&self, input: &str) -> Result<(i64, ParserStats), CalcError> {
        self.run(input, ErrorRecovery::PanicMode)
    }

    fn run(&self, input: &str, recovery: ErrorRecovery) -> Result<(i64, ParserStats), CalcError> {
        let factory = calc_factory(&self.symtab);
        let lexer = LexicalAnalyzer::new(&self.dfa, factory, input.as_bytes());
        let mut parser = LrParser::new(&self.table, lexer)?;
        let value = parser.parse(0, recovery)?;
        Ok((value, parser.stats()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexparse::lr::LrError;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn calc() -> Calculator {
        init_logger();
        Calculator::new().unwrap()
    }

    #[test]
    fn a_single_operand_evaluates_to_itself() {
        assert_eq!(calc().evaluate("7").unwrap(), 7);
    }

    #[test]
    fn addition_reduces_operand_by_operand() {
        init_logger();
        let table = slr_table(grammar().unwrap()).unwrap();
        let dfa = calc_dfa();
        let symtab = SymTab::new();
        let factory = calc_factory(&symtab);
        let lexer = LexicalAnalyzer::new(&dfa, factory, b"1 + 2");
        let mut parser = LrParser::new(&table, lexer).unwrap();
        assert_eq!(parser.parse(0, ErrorRecovery::None).unwrap(), 3);
        // F -> id, T -> F, E -> T, then the right operand, then E -> E + T
        assert_eq!(parser.reductions(), &[6, 4, 2, 6, 4, 1]);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(calc().evaluate("2 * 3 + 4").unwrap(), 10);
        assert_eq!(calc().evaluate("2 + 3 * 4").unwrap(), 14);
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(calc().evaluate("( 2 + 3 ) * 4").unwrap(), 20);
        assert_eq!(calc().evaluate("(1 + 2) * (3 + 4)").unwrap(), 21);
    }

    #[test]
    fn variables_evaluate_through_the_symbol_table() {
        let mut calc = calc();
        calc.set("x", 5);
        calc.set("y", 7);
        assert_eq!(calc.evaluate("x * y + 2").unwrap(), 37);
    }

    #[test]
    fn a_dangling_operator_fails_even_with_recovery() {
        let calc = calc();
        let err = calc.evaluate_recovering("1 +").unwrap_err();
        assert!(matches!(err, CalcError::Lr(LrError::Unsynchronized { .. })));
    }

    #[test]
    fn a_doubled_operator_recovers() {
        let calc = calc();
        let (value, stats) = calc.evaluate_recovering("1 + + 2").unwrap();
        // the missing operand synchronizes as an empty value
        assert_eq!(value, 3);
        assert_eq!(stats.recovered, 1);
    }

    #[test]
    fn without_recovery_the_first_error_is_fatal() {
        let calc = calc();
        let err = calc.evaluate("1 + + 2").unwrap_err();
        assert!(matches!(err, CalcError::Lr(LrError::Unrecoverable { .. })));
    }

    #[test]
    fn too_many_errors_exhaust_the_recovery_limit() {
        let calc = calc();
        let err = calc.evaluate_recovering("1 + + + + + + + 2").unwrap_err();
        assert!(matches!(
            err,
            CalcError::Lr(LrError::RecoveryLimitExceeded { limit: 5 })
        ));
    }
}
