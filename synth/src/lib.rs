//! Synthesis of bounded finite-state (Mealy) controllers for partially
//! observable, stochastic environments.
//!
//! The entry point is [`plan`]: given an [`Env`], a bound on the number of
//! controller states and a desired likelihood of plan completion (LPC), it
//! searches for a Mealy controller whose closed loop with the environment
//! reaches a goal state with at least the desired probability.
//!
//! The search interleaves two kinds of nodes: OR nodes pick a controller
//! extension (a next controller state and a move) for the current
//! `(state, observation)` pair, AND nodes branch over the stochastic outcomes
//! of the chosen move. Probability mass discovered below each node is
//! aggregated per depth, and cycles back to earlier nodes are folded in with
//! a geometric-series fixpoint, so that at any point the search knows a lower
//! bound (goal mass) and an upper bound (everything not yet lost) on the LPC
//! of the partial controller. Extensions whose upper bound drops below the
//! threshold are undone through a checkpoint stack.

pub mod controller;
pub mod env;
pub mod search;
pub mod simulate;
pub mod stats;

pub use controller::{Controller, CtlState, Move};
pub use env::Env;
pub use search::{plan, Likelihoods, Synthesis};
pub use stats::Stats;

use thiserror::Error;

/// Probability mass.
pub type Prob = f64;

/// A synthesis request rejected before any search takes place.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The cycle fixpoints divide by `1 - loop mass`; a threshold of 1 would
    /// make that correction meaningless, so the threshold must stay below it.
    #[error("desired likelihood of plan completion must be in [0, 1) (got {0})")]
    ThresholdOutOfRange(Prob),
    /// An environment distribution with negative mass or not summing to 1.
    #[error("probabilities must be non-negative and sum to 1 (sum = {0})")]
    BadDistribution(Prob),
}
