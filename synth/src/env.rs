//! The environment side of the search: an opaque domain queried through a
//! small trait, plus the terminal outcomes the search grafts onto it.

use std::fmt::Debug;

use crate::{Prob, SynthError};

/// A partially observable, stochastic, non-deterministic environment.
///
/// The planner only ever sees the environment through this interface: an
/// initial belief, per-action successor distributions, the legal actions of a
/// state, a goal test and an observation function. States themselves stay
/// opaque; the synthesized controller is a function of controller state and
/// observation only.
pub trait Env {
    type State: Clone + PartialEq + Debug;
    type Obs: Clone + Eq + Debug;
    type Action: Clone + PartialEq + Debug;

    /// Initial belief: pairs `(state, probability)` summing to 1.
    fn init_states(&self) -> Vec<(Self::State, Prob)>;

    /// Actions that may be played in `s`. May be empty for a dead end.
    fn legal_actions(&self, s: &Self::State) -> Vec<Self::Action>;

    /// Distribution over the successors of playing `a` in `s`; sums to 1.
    fn next_states(&self, s: &Self::State, a: &Self::Action) -> Vec<(Self::State, Prob)>;

    fn is_goal(&self, s: &Self::State) -> bool;

    fn observe(&self, s: &Self::State) -> Self::Obs;
}

/// What an AND branch leads to: a regular environment state, or one of the
/// two terminals produced by expanding a `stop` move.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum Outcome<S> {
    Next(S),
    Win,
    Fail,
}

/// Sorts a distribution by decreasing probability. The sort is stable, so
/// entries of equal probability keep the environment's order; this shapes
/// which branch is examined first but never the verdict.
pub(crate) fn sort_desc<S>(dist: &mut [(S, Prob)]) {
    dist.sort_by(|a, b| b.1.total_cmp(&a.1));
}

/// Checks that `dist` has non-negative terms summing to 1 (within 1e-9).
pub(crate) fn check_distribution<S>(dist: &[(S, Prob)]) -> Result<(), SynthError> {
    let sum: Prob = dist.iter().map(|(_, p)| *p).sum();
    if dist.iter().any(|(_, p)| *p < 0.0) || (sum - 1.0).abs() > 1e-9 {
        return Err(SynthError::BadDistribution(sum));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_sort_is_stable_on_ties() {
        let mut dist = vec![('a', 0.25), ('b', 0.5), ('c', 0.25)];
        sort_desc(&mut dist);
        assert_eq!(dist, vec![('b', 0.5), ('a', 0.25), ('c', 0.25)]);
    }

    #[test]
    fn rejects_leaky_distributions() {
        assert!(check_distribution(&[('a', 0.5), ('b', 0.5)]).is_ok());
        assert!(check_distribution(&[('a', 0.5), ('b', 0.4)]).is_err());
        assert!(check_distribution(&[('a', 1.5), ('b', -0.5)]).is_err());
    }
}
