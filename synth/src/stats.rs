//! Search counters.

use std::fmt::{Display, Error, Formatter};

/// Counters of the synthesis run, reported with both verdicts of
/// [`crate::plan`].
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Number of OR nodes entered.
    pub num_steps: u64,
    /// Number of refutations, i.e. times the likelihood upper bound dropped
    /// below the threshold and the search had to backtrack.
    pub num_backtracking: u64,
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(f, "{:<20}: {}", "steps", self.num_steps)?;
        write!(f, "{:<20}: {}", "backtracks", self.num_backtracking)
    }
}
