//! Nondeterministic automata, with or without epsilon moves.

use super::{FsmError, FsmResult, MatchMode, StateId, StateSet, START_STATE};

/// Byte value carrying the epsilon moves of an [`NfaKind::Epsilon`]
/// machine. Real input never produces it because the simulation is over
/// raw bytes and byte `0` terminates nothing here; the table simply
/// reserves the column.
pub const EPSILON_BYTE: u8 = 0;

/// A transition table for an NFA: `state x byte -> set of states`.
///
/// Rows grow on demand; an entry that was never written reads as the
/// empty set (the nondeterministic counterpart of [`super::DEAD_STATE`]).
#[derive(Debug, Clone, Default)]
pub struct NfaTable {
    rows: Vec<Vec<StateSet>>,
}

impl NfaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `next` to the targets of `state` on `byte`.
    pub fn add(&mut self, state: StateId, byte: u8, next: StateId) {
        if self.rows.len() <= state {
            self.rows.resize(state + 1, Vec::new());
        }
        let row = &mut self.rows[state];
        let idx = byte as usize;
        if row.len() <= idx {
            row.resize(idx + 1, StateSet::new());
        }
        row[idx].insert(next);
    }

    /// Adds an epsilon move `state --eps--> next`.
    pub fn add_epsilon(&mut self, state: StateId, next: StateId) {
        self.add(state, EPSILON_BYTE, next);
    }

    /// The targets of `state` on `byte`, if any were recorded.
    pub fn targets(&self, state: StateId, byte: u8) -> Option<&StateSet> {
        self.rows
            .get(state)
            .and_then(|row| row.get(byte as usize))
            .filter(|set| !set.is_empty())
    }

    /// The union of the targets of every state in `states` on `byte`.
    pub fn move_set(&self, states: &StateSet, byte: u8) -> StateSet {
        let mut out = StateSet::new();
        for &s in states {
            if let Some(targets) = self.targets(s, byte) {
                out.extend(targets.iter().copied());
            }
        }
        out
    }
}

/// Whether a machine interprets the reserved byte-0 column as epsilon
/// moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfaKind {
    /// Plain NFA; every transition consumes one input byte.
    Plain,
    /// Epsilon NFA; every transition step is followed by an
    /// epsilon-closure expansion.
    Epsilon,
}

/// A nondeterministic finite automaton.
#[derive(Debug, Clone)]
pub struct Nfa {
    finals: StateSet,
    table: NfaTable,
    kind: NfaKind,
}

impl Nfa {
    /// Builds an NFA from its final-state set, transition table and kind.
    ///
    /// Fails with [`FsmError::EmptyFinalStates`] when `finals` is empty.
    pub fn new(finals: StateSet, table: NfaTable, kind: NfaKind) -> Result<Self, FsmError> {
        if finals.is_empty() {
            return Err(FsmError::EmptyFinalStates);
        }
        Ok(Self {
            finals,
            table,
            kind,
        })
    }

    pub fn final_states(&self) -> &StateSet {
        &self.finals
    }

    pub fn kind(&self) -> NfaKind {
        self.kind
    }

    /// The epsilon closure of `set`: all states reachable from it through
    /// epsilon moves alone, `set` included.
    pub fn epsilon_closure(&self, set: &StateSet) -> StateSet {
        let mut closure = set.clone();
        let mut pending: Vec<StateId> = set.iter().copied().collect();
        while let Some(s) = pending.pop() {
            if let Some(targets) = self.table.targets(s, EPSILON_BYTE) {
                for &t in targets {
                    // guard against revisiting a state already in the set
                    if closure.insert(t) {
                        pending.push(t);
                    }
                }
            }
        }
        closure
    }

    /// One simulation step: move on `byte`, then close over epsilon when
    /// the machine is an epsilon NFA.
    fn step(&self, config: &StateSet, byte: u8) -> StateSet {
        let moved = self.table.move_set(config, byte);
        match self.kind {
            NfaKind::Plain => moved,
            NfaKind::Epsilon => self.epsilon_closure(&moved),
        }
    }

    fn reached_finals(&self, config: &StateSet) -> StateSet {
        config.intersection(&self.finals).copied().collect()
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
        let mut config = StateSet::from([START_STATE]);
        for &b in input {
            config = self.step(&config, b);
            if config.is_empty() {
                break;
            }
        }
        let finals = self.reached_finals(&config);
        if finals.is_empty() {
            FsmResult::rejected(input)
        } else {
            FsmResult {
                accepted: true,
                final_states: finals,
                range: 0..input.len(),
                input,
            }
        }
    }

    /// The longest accepted prefix of `input`, as `(length, finals)`.
    fn accepted_prefix(&self, input: &[u8]) -> Option<(usize, StateSet)> {
        let mut path: Vec<StateSet> = Vec::with_capacity(input.len());
        let mut config = StateSet::from([START_STATE]);
        for &b in input {
            config = self.step(&config, b);
            if config.is_empty() {
                break;
            }
            path.push(config.clone());
        }
        for (i, cfg) in path.iter().enumerate().rev() {
            let finals = self.reached_finals(cfg);
            if !finals.is_empty() {
                return Some((i + 1, finals));
            }
        }
        None
    }

    fn longest_prefix<'a>(&self, input: &'a [u8]) -> FsmResult<'a> {
        match self.accepted_prefix(input) {
            Some((len, finals)) => FsmResult {
                accepted: true,
                final_states: finals,
                range: 0..len,
                input,
            },
            None => FsmResult::rejected(input),
        }
    }

    fn longest_substring<'a>(&self, input: &'a [u8]) -> FsmResult<'a> {
        let mut best: Option<(usize, usize, StateSet)> = None;
        for start in 0..input.len() {
            if let Some((len, finals)) = self.accepted_prefix(&input[start..]) {
                if best.as_ref().map_or(true, |(_, blen, _)| len > *blen) {
                    best = Some((start, len, finals));
                }
            }
        }
        match best {
            Some((start, len, finals)) => FsmResult {
                accepted: true,
                final_states: finals,
                range: start..start + len,
                input,
            },
            None => FsmResult::rejected(input),
        }
    }
}
