//! Deterministic automata.

use super::{FsmError, FsmResult, MatchMode, StateId, StateSet, DEAD_STATE, START_STATE};

/// A dense transition table for a DFA: `state x byte -> state`.
///
/// Rows grow on demand; any entry that was never written reads as
/// [`DEAD_STATE`].
#[derive(Debug, Clone, Default)]
pub struct DfaTable {
    rows: Vec<Vec<StateId>>,
}

impl DfaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the transition `state --byte--> next`.
    pub fn set(&mut self, state: StateId, byte: u8, next: StateId) {
        if self.rows.len() <= state {
            self.rows.resize(state + 1, Vec::new());
        }
        let row = &mut self.rows[state];
        let idx = byte as usize;
        if row.len() <= idx {
            row.resize(idx + 1, DEAD_STATE);
        }
        row[idx] = next;
    }

    /// Records the same target for every byte in `bytes`.
    pub fn set_all(&mut self, state: StateId, bytes: impl IntoIterator<Item = u8>, next: StateId) {
        for b in bytes {
            self.set(state, b, next);
        }
    }

    /// The state reached from `state` on `byte`; [`DEAD_STATE`] if the
    /// entry was never written.
    pub fn next(&self, state: StateId, byte: u8) -> StateId {
        self.rows
            .get(state)
            .and_then(|row| row.get(byte as usize))
            .copied()
            .unwrap_or(DEAD_STATE)
    }
}

/// A deterministic finite automaton.
#[derive(Debug, Clone)]
pub struct Dfa {
    finals: StateSet,
    table: DfaTable,
}

impl Dfa {
    /// Builds a DFA from its final-state set and transition table.
    ///
    /// Fails with [`FsmError::EmptyFinalStates`] when `finals` is empty.
    pub fn new(finals: StateSet, table: DfaTable) -> Result<Self, FsmError> {
        if finals.is_empty() {
            return Err(FsmError::EmptyFinalStates);
        }
        Ok(Self { finals, table })
    }

    pub fn final_states(&self) -> &StateSet {
        &self.finals
    }

    /// Runs the automaton over `input` in the given mode.
    pub fn simulate<'a>(&self, input: &'a [u8], mode: MatchMode) -> FsmResult<'a> {
        match mode {
            MatchMode::WholeString => self.whole_string(input),
            MatchMode::LongestPrefix => self.longest_prefix(input),
            MatchMode::LongestSubstring => self.longest_substring(input),
        }
    }

    fn whole_string<'a>(&self, input: &'a [u8]) -> FsmResult<'a> {
        let mut curr = START_STATE;
        for &b in input {
            curr = self.table.next(curr, b);
            if curr == DEAD_STATE {
                break;
            }
        }
        if self.finals.contains(&curr) {
            FsmResult {
                accepted: true,
                final_states: StateSet::from([curr]),
                range: 0..input.len(),
                input,
            }
        } else {
            FsmResult::rejected(input)
        }
    }

    /// The longest accepted prefix of `input`, as `(length, state)`.
    ///
    /// Walks the machine until the input ends or the dead state is hit,
    /// recording the configuration after every byte, then scans that
    /// record backwards for the nearest final state.
    fn accepted_prefix(&self, input: &[u8]) -> Option<(usize, StateId)> {
        let mut path = Vec::with_capacity(input.len());
        let mut curr = START_STATE;
        for &b in input {
            curr = self.table.next(curr, b);
            if curr == DEAD_STATE {
                break;
            }
            path.push(curr);
        }
        for (i, &state) in path.iter().enumerate().rev() {
            if self.finals.contains(&state) {
                return Some((i + 1, state));
            }
        }
        None
    }

    fn longest_prefix<'a>(&self, input: &'a [u8]) -> FsmResult<'a> {
        match self.accepted_prefix(input) {
            Some((len, state)) => FsmResult {
                accepted: true,
                final_states: StateSet::from([state]),
                range: 0..len,
                input,
            },
            None => FsmResult::rejected(input),
        }
    }

    fn longest_substring<'a>(&self, input: &'a [u8]) -> FsmResult<'a> {
        let mut best: Option<(usize, usize, StateId)> = None;
        for start in 0..input.len() {
            if let Some((len, state)) = self.accepted_prefix(&input[start..]) {
                // strictly longer only, so the first occurrence wins ties
                if best.map_or(true, |(_, blen, _)| len > blen) {
                    best = Some((start, len, state));
                }
            }
        }
        match best {
            Some((start, len, state)) => FsmResult {
                accepted: true,
                final_states: StateSet::from([state]),
                range: start..start + len,
                input,
            },
            None => FsmResult::rejected(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // 1 --a--> 2 --b--> 3, accepting "ab"
    fn ab_dfa() -> Dfa {
        let mut table = DfaTable::new();
        table.set(1, b'a', 2);
        table.set(2, b'b', 3);
        Dfa::new(StateSet::from([3]), table).unwrap()
    }

    // integer literals: 1 --digit--> 2 --digit--> 2
    fn digits_dfa() -> Dfa {
        let mut table = DfaTable::new();
        table.set_all(1, b'0'..=b'9', 2);
        table.set_all(2, b'0'..=b'9', 2);
        Dfa::new(StateSet::from([2]), table).unwrap()
    }

    #[test]
    fn empty_final_states_is_an_error() {
        let err = Dfa::new(StateSet::new(), DfaTable::new()).unwrap_err();
        assert_eq!(err, FsmError::EmptyFinalStates);
    }

    #[test]
    fn whole_string_accepts_exact_input() {
        init_logger();
        let dfa = ab_dfa();
        let res = dfa.simulate(b"ab", MatchMode::WholeString);
        assert!(res.accepted);
        assert_eq!(res.range, 0..2);
        assert_eq!(res.final_states, StateSet::from([3]));
    }

    #[test]
    fn whole_string_rejects_longer_input() {
        let dfa = ab_dfa();
        let res = dfa.simulate(b"abb", MatchMode::WholeString);
        assert!(!res.accepted);
        assert_eq!(res.range, 0..0);
        assert!(res.final_states.is_empty());
    }

    #[test]
    fn whole_string_on_empty_input() {
        let dfa = ab_dfa();
        assert!(!dfa.simulate(b"", MatchMode::WholeString).accepted);
    }

    #[test]
    fn longest_prefix_stops_at_last_final_configuration() {
        let dfa = ab_dfa();
        let res = dfa.simulate(b"abab", MatchMode::LongestPrefix);
        assert!(res.accepted);
        assert_eq!(res.lexeme(), b"ab");
    }

    #[test]
    fn longest_prefix_reports_the_accepting_state() {
        // finals {2, 3}: for "a" the accepting configuration is state 2
        let mut table = DfaTable::new();
        table.set(1, b'a', 2);
        table.set(2, b'b', 3);
        let dfa = Dfa::new(StateSet::from([2, 3]), table).unwrap();
        let res = dfa.simulate(b"ac", MatchMode::LongestPrefix);
        assert!(res.accepted);
        assert_eq!(res.range, 0..1);
        assert_eq!(res.final_states, StateSet::from([2]));
    }

    #[test]
    fn longest_prefix_is_maximal() {
        let dfa = digits_dfa();
        for input in [&b"123abc"[..], b"7", b"42x9", b"00012345"] {
            let res = dfa.simulate(input, MatchMode::LongestPrefix);
            let expected = input.iter().take_while(|b| b.is_ascii_digit()).count();
            assert!(res.accepted);
            assert_eq!(res.range, 0..expected, "input {:?}", input);
        }
    }

    #[test]
    fn longest_prefix_rejects_when_no_prefix_matches() {
        let dfa = digits_dfa();
        let res = dfa.simulate(b"x123", MatchMode::LongestPrefix);
        assert!(!res.accepted);
        assert_eq!(res.range, 0..0);
    }

    #[test]
    fn longest_substring_finds_interior_match() {
        let dfa = digits_dfa();
        let res = dfa.simulate(b"ab1234cd56", MatchMode::LongestSubstring);
        assert!(res.accepted);
        assert_eq!(res.lexeme(), b"1234");
    }

    #[test]
    fn longest_substring_ties_break_to_first_occurrence() {
        let dfa = digits_dfa();
        let res = dfa.simulate(b"a12b34", MatchMode::LongestSubstring);
        assert_eq!(res.range, 1..3);
    }
}
