//! The exploration path and the snapshots it is unwound to.

use crate::controller::CtlState;
use crate::search::alpha::Alpha;
use crate::Prob;

/// One node of the current AND/OR path: the controller state and environment
/// state reached, and the probability of the transition taken into them.
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct HistoryItem<S> {
    pub q: CtlState,
    pub s: S,
    pub p: Prob,
}

/// Snapshot taken when an OR node first opens a choice: the path down to the
/// node and a clone of the α-accumulator as it was at that point. Reverting
/// to the snapshot undoes everything a refuted extension contributed.
pub(crate) struct Checkpoint<S> {
    pub history: Vec<HistoryItem<S>>,
    pub alpha: Alpha,
}
