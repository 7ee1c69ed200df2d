//! A worked example for `lexparse`: arithmetic expressions over `+`,
//! `*` and parentheses, with integer literals and named variables.
//!
//! The [`lr`] module parses the left-recursive grammar with a generated
//! SLR table and postfix actions that fold values; the [`ll`] module
//! parses the equivalent right-recursive grammar predictively. Variables
//! are resolved at tokenization time through a [`SymTab`].

pub mod error;
pub mod lexer;
pub mod ll;
pub mod lr;
pub mod symtab;
pub mod syms;

pub use error::CalcError;
pub use lexer::{calc_dfa, calc_factory};
pub use lr::Calculator;
pub use symtab::SymTab;
pub use syms::{CalcGrammar, Term, Var};
