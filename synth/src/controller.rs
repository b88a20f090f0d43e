//! The partial Mealy machine under construction and the per-edge stacks of
//! candidate extensions that drive the OR nodes of the search.

use std::fmt::{Display, Error, Formatter};

use itertools::Itertools;
use smallvec::{smallvec, SmallVec};

/// A state of the controller: an integer in `[0, bound)`. State 0 is initial.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct CtlState(u32);

impl CtlState {
    pub const INIT: CtlState = CtlState(0);

    pub fn new(i: u32) -> Self {
        CtlState(i)
    }

    pub fn to_int(self) -> u32 {
        self.0
    }
}

impl Display for CtlState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "q{}", self.0)
    }
}

/// Output letter of the controller: an environment action, or the decision to
/// stop acting. Stopping wins exactly when the environment is in a goal state.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Move<A> {
    Do(A),
    Stop,
}

impl<A: Display> Display for Move<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Move::Do(a) => write!(f, "{a}"),
            Move::Stop => write!(f, "stop"),
        }
    }
}

/// An N-bounded Mealy machine under construction.
///
/// Transitions map `(q, observation)` to `(q', move)` and are kept in
/// insertion order: backtracking always undoes the most recent extension, so
/// the store must behave as a stack of definitions.
#[derive(Clone, Debug)]
pub struct Controller<O, A> {
    bound: u32,
    transitions: Vec<((CtlState, O), (CtlState, Move<A>))>,
}

impl<O, A> Controller<O, A> {
    pub fn new(bound: u32) -> Self {
        assert!(bound >= 1, "a controller has at least its initial state");
        Controller {
            bound,
            transitions: Vec::new(),
        }
    }

    pub fn init_state(&self) -> CtlState {
        CtlState::INIT
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Number of states already defined (1 for the empty controller).
    pub fn num_states(&self) -> u32 {
        self.transitions
            .iter()
            .map(|(_, (q_next, _))| q_next.0 + 1)
            .max()
            .unwrap_or(1)
    }

    /// Removes and returns the most recently inserted transition.
    pub fn pop_last(&mut self) -> Option<((CtlState, O), (CtlState, Move<A>))> {
        self.transitions.pop()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Transitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&(CtlState, O), &(CtlState, Move<A>))> {
        self.transitions.iter().map(|(k, v)| (k, v))
    }
}

impl<O: Eq, A> Controller<O, A> {
    pub fn get(&self, q: CtlState, obs: &O) -> Option<&(CtlState, Move<A>)> {
        self.transitions
            .iter()
            .find(|((tq, to), _)| *tq == q && to == obs)
            .map(|(_, ext)| ext)
    }

    /// Appends the transition `(q, obs) -> (q_next, mv)`.
    ///
    /// # Panics
    ///
    /// Panics when the extension would leave the machine inconsistent:
    /// `q` must already exist, `q_next` may at most introduce one new state,
    /// and `q_next` must stay below the bound.
    pub fn set(&mut self, q: CtlState, obs: O, q_next: CtlState, mv: Move<A>) {
        let num_states = self.num_states();
        assert!(
            q.0 < num_states && q_next.0 <= num_states,
            "invalid controller extension {q} -> {q_next} with {num_states} states"
        );
        assert!(q_next.0 < self.bound, "controller extension beyond the state bound");
        debug_assert!(self.get(q, &obs).is_none(), "edge defined twice");
        self.transitions.push(((q, obs), (q_next, mv)));
    }
}

impl<O: Display, A: Display> Display for Controller<O, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(f, "states: {}", self.num_states())?;
        let by_state = self
            .transitions
            .iter()
            .sorted_by_key(|((q, _), (q_next, _))| (q.0, q_next.0));
        for ((q, obs), (q_next, mv)) in by_state {
            writeln!(f, "  ({q}, {obs}) -> ({q_next}, {mv})")?;
        }
        Ok(())
    }
}

pub(crate) type CandidateStack<A> = SmallVec<[(CtlState, Move<A>); 8]>;

/// Per-edge stacks of the remaining candidate extensions for a
/// `(q, observation)` edge.
///
/// The last element is the next candidate to try. A candidate is removed only
/// once refuted, so a stack resumes exactly where it stopped when the search
/// recursion comes back to its edge.
pub(crate) struct Extensions<O, A> {
    slots: Vec<((CtlState, O), CandidateStack<A>)>,
}

impl<O: Eq, A> Extensions<O, A> {
    pub fn new() -> Self {
        Extensions { slots: Vec::new() }
    }

    fn slot(&self, key: &(CtlState, O)) -> Option<usize> {
        self.slots.iter().position(|(k, _)| k == key)
    }

    /// Installs the candidate stack of a fresh choice edge.
    pub fn create(&mut self, key: (CtlState, O), candidates: CandidateStack<A>) {
        debug_assert!(self.slot(&key).is_none(), "candidate stack already open for this edge");
        self.slots.push((key, candidates));
    }

    pub fn peek_last(&self, key: &(CtlState, O)) -> Option<&(CtlState, Move<A>)> {
        self.slot(key).and_then(|i| self.slots[i].1.last())
    }

    pub fn pop_last(&mut self, key: &(CtlState, O)) -> Option<(CtlState, Move<A>)> {
        self.slot(key).and_then(|i| self.slots[i].1.pop())
    }

    pub fn delete(&mut self, key: &(CtlState, O)) {
        if let Some(i) = self.slot(key) {
            self.slots.remove(i);
        }
    }

    #[cfg(test)]
    pub fn len(&self, key: &(CtlState, O)) -> usize {
        self.slot(key).map_or(0, |i| self.slots[i].1.len())
    }
}

/// Candidate extensions for an edge, ordered so that popping from the end
/// tries `(0, stop)` first, then every existing state with every legal move,
/// and introduces a brand new controller state only once the existing ones
/// are exhausted. A goal state admits the single candidate `(0, stop)`.
pub(crate) fn candidate_extensions<A: Clone>(
    goal: bool,
    legal: &[A],
    num_states: u32,
    bound: u32,
) -> CandidateStack<A> {
    if goal {
        return smallvec![(CtlState::INIT, Move::Stop)];
    }
    let mut out = CandidateStack::new();
    let mut push_moves = |out: &mut CandidateStack<A>, q: u32| {
        for a in legal.iter().rev() {
            out.push((CtlState(q), Move::Do(a.clone())));
        }
        out.push((CtlState(q), Move::Stop));
    };
    if num_states < bound {
        push_moves(&mut out, num_states);
    }
    for q in (0..num_states).rev() {
        push_moves(&mut out, q);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_controller_has_one_state() {
        let c: Controller<char, char> = Controller::new(3);
        assert_eq!(c.num_states(), 1);
        assert_eq!(c.init_state(), CtlState::INIT);
        assert!(c.is_empty());
    }

    #[test]
    fn set_get_pop_round_trip() {
        let mut c: Controller<char, char> = Controller::new(2);
        c.set(CtlState::new(0), 'a', CtlState::new(1), Move::Do('x'));
        c.set(CtlState::new(1), 'b', CtlState::new(0), Move::Stop);
        assert_eq!(c.num_states(), 2);
        assert_eq!(c.get(CtlState::new(0), &'a'), Some(&(CtlState::new(1), Move::Do('x'))));
        assert_eq!(c.get(CtlState::new(1), &'b'), Some(&(CtlState::new(0), Move::Stop)));

        let (key, ext) = c.pop_last().unwrap();
        assert_eq!(key, (CtlState::new(1), 'b'));
        assert_eq!(ext, (CtlState::new(0), Move::Stop));
        assert_eq!(c.len(), 1);
        assert!(c.get(CtlState::new(1), &'b').is_none());
    }

    #[test]
    #[should_panic]
    fn rejects_transition_beyond_bound() {
        let mut c: Controller<char, char> = Controller::new(1);
        c.set(CtlState::new(0), 'a', CtlState::new(1), Move::Stop);
    }

    #[test]
    #[should_panic]
    fn rejects_skipping_a_state() {
        let mut c: Controller<char, char> = Controller::new(4);
        c.set(CtlState::new(0), 'a', CtlState::new(2), Move::Stop);
    }

    #[test]
    fn candidates_try_stop_in_the_initial_state_first() {
        let mut cands = candidate_extensions(false, &['u', 'v'], 1, 2);
        assert_eq!(cands.pop(), Some((CtlState::new(0), Move::Stop)));
        assert_eq!(cands.pop(), Some((CtlState::new(0), Move::Do('u'))));
        assert_eq!(cands.pop(), Some((CtlState::new(0), Move::Do('v'))));
        // only then is a new controller state introduced
        assert_eq!(cands.pop(), Some((CtlState::new(1), Move::Stop)));
        assert_eq!(cands.pop(), Some((CtlState::new(1), Move::Do('u'))));
        assert_eq!(cands.pop(), Some((CtlState::new(1), Move::Do('v'))));
        assert_eq!(cands.pop(), None);
    }

    #[test]
    fn candidates_do_not_grow_past_the_bound() {
        let cands = candidate_extensions(false, &['u'], 2, 2);
        assert!(cands.iter().all(|(q, _)| q.to_int() < 2));
        assert_eq!(cands.len(), 4);
    }

    #[test]
    fn candidate_stacks_resume_where_they_stopped() {
        let mut exts: Extensions<char, char> = Extensions::new();
        let key = (CtlState::INIT, 'o');
        exts.create(key, candidate_extensions(false, &['u'], 1, 1));
        assert_eq!(exts.len(&key), 2);
        // peeking does not burn the candidate, popping does
        assert_eq!(exts.peek_last(&key), Some(&(CtlState::INIT, Move::Stop)));
        assert_eq!(exts.peek_last(&key), Some(&(CtlState::INIT, Move::Stop)));
        assert_eq!(exts.pop_last(&key), Some((CtlState::INIT, Move::Stop)));
        assert_eq!(exts.len(&key), 1);
        exts.delete(&key);
        assert_eq!(exts.peek_last(&key), None);
    }

    #[test]
    fn goal_state_candidates_stop_immediately() {
        let cands: CandidateStack<char> = candidate_extensions(true, &['u'], 1, 3);
        assert_eq!(cands.to_vec(), vec![(CtlState::new(0), Move::Stop)]);
    }
}
