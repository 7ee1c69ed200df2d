//! The expression tokenizer: a hand-built DFA plus a token factory that
//! resolves variable names through the symbol table.

use lexparse::fsm::{Dfa, DfaTable, StateId};
use lexparse::lexer::Token;

use crate::symtab::SymTab;
use crate::syms::Term;

const S_NUM: StateId = 2;
const S_IDENT: StateId = 3;
const S_LPAREN: StateId = 4;
const S_RPAREN: StateId = 5;
const S_PLUS: StateId = 6;
const S_STAR: StateId = 7;

/// Integer literals, `[a-zA-Z_][a-zA-Z0-9_]*` identifiers, and the four
/// single-byte operators.
pub fn calc_dfa() -> Dfa {
    let mut table = DfaTable::new();
    table.set_all(1, b'0'..=b'9', S_NUM);
    table.set_all(S_NUM, b'0'..=b'9', S_NUM);

    table.set_all(1, b'a'..=b'z', S_IDENT);
    table.set_all(1, b'A'..=b'Z', S_IDENT);
    table.set(1, b'_', S_IDENT);
    table.set_all(S_IDENT, b'a'..=b'z', S_IDENT);
    table.set_all(S_IDENT, b'A'..=b'Z', S_IDENT);
    table.set_all(S_IDENT, b'0'..=b'9', S_IDENT);
    table.set(S_IDENT, b'_', S_IDENT);

    table.set(1, b'(', S_LPAREN);
    table.set(1, b')', S_RPAREN);
    table.set(1, b'+', S_PLUS);
    table.set(1, b'*', S_STAR);

    let finals = [S_NUM, S_IDENT, S_LPAREN, S_RPAREN, S_PLUS, S_STAR];
    // the final-state set is non-empty, so construction cannot fail
    match Dfa::new(finals.into(), table) {
        Ok(dfa) => dfa,
        Err(_) => unreachable!("final states are statically non-empty"),
    }
}

/// A factory over `symtab`: numbers keep their lexeme, identifiers are
/// resolved to their value's decimal rendering, so the parser's actions
/// see numeric attributes either way.
pub fn calc_factory(symtab: &SymTab) -> impl Fn(StateId, &[u8]) -> Token<Term> + '_ {
    move |state, lexeme| match state {
        S_NUM => Token::from_lexeme(Term::Id, lexeme),
        S_IDENT => {
            let name = String::from_utf8_lossy(lexeme);
            Token::new(Term::Id, symtab.get(name.as_ref()).to_string())
        }
        S_LPAREN => Token::from_lexeme(Term::LeftParen, lexeme),
        S_RPAREN => Token::from_lexeme(Term::RightParen, lexeme),
        S_PLUS => Token::from_lexeme(Term::Plus, lexeme),
        S_STAR => Token::from_lexeme(Term::Star, lexeme),
        _ => unreachable!("unknown final state {state}"),
    }
}
