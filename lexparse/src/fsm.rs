//! Finite-state machines over byte input.
//!
//! Machines are described by a transition table plus an explicit set of
//! final states. States are plain integers: state [`START_STATE`] is where
//! every simulation begins and state [`DEAD_STATE`] is the sink that
//! absent table entries map to. A machine is simulated against an input
//! slice in one of three [`MatchMode`]s and yields an [`FsmResult`]
//! describing the match, if any.
//!
//! ```rust
//! use lexparse::fsm::{Dfa, DfaTable, MatchMode};
//!
//! let mut table = DfaTable::new();
//! table.set(1, b'a', 2);
//! table.set(2, b'b', 3);
//! let dfa = Dfa::new([3].into(), table).unwrap();
//!
//! let res = dfa.simulate(b"abab", MatchMode::LongestPrefix);
//! assert!(res.accepted);
//! assert_eq!(res.lexeme(), b"ab");
//! ```

use std::collections::BTreeSet;
use std::ops::Range;
use thiserror::Error;

pub mod dfa;
pub mod nfa;

pub use dfa::{Dfa, DfaTable};
pub use nfa::{Nfa, NfaKind, NfaTable};

/// A machine state. States carry no structure beyond their number.
pub type StateId = usize;

/// A set of machine states, ordered for stable iteration and display.
pub type StateSet = BTreeSet<StateId>;

/// The state every simulation starts in.
pub const START_STATE: StateId = 1;

/// The sink state. Absent transition-table entries lead here, and no
/// transition ever leaves it.
pub const DEAD_STATE: StateId = 0;

/// How a machine is matched against the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Accept iff the whole input drives the machine into a final state.
    WholeString,
    /// Accept the longest prefix of the input that ends in a final state.
    LongestPrefix,
    /// Accept the longest substring (at any offset) that ends in a final
    /// state; ties are broken by first occurrence.
    LongestSubstring,
}

/// The outcome of one simulation.
///
/// `range` is the half-open byte range of the match within `input`; it is
/// `0..0` when nothing was accepted. `final_states` holds the final states
/// reached by the accepting configuration (a singleton for a DFA).
#[derive(Debug, Clone)]
pub struct FsmResult<'a> {
    pub accepted: bool,
    pub final_states: StateSet,
    pub range: Range<usize>,
    pub input: &'a [u8],
}

impl<'a> FsmResult<'a> {
    pub(crate) fn rejected(input: &'a [u8]) -> Self {
        Self {
            accepted: false,
            final_states: StateSet::new(),
            range: 0..0,
            input,
        }
    }

    /// The matched slice of the input (empty when nothing was accepted).
    pub fn lexeme(&self) -> &'a [u8] {
        &self.input[self.range.clone()]
    }

    /// Length of the match in bytes.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Construction failures of state machines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsmError {
    /// A machine with no final states can never accept anything.
    #[error("the set of final states of a state machine cannot be empty")]
    EmptyFinalStates,
}
