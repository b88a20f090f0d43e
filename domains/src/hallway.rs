//! A corridor with noisy forward motion.

use std::fmt::{Display, Error, Formatter};

use mealy::{Env, Prob};

/// Probability that a forward step actually advances.
const P_ADVANCE: Prob = 0.8;

/// A corridor of `len` cells. Stepping forward advances with probability
/// 0.8 and slips back to the same cell otherwise. The walker only observes
/// whether it stands at the far end.
pub struct Hallway {
    len: u8,
}

impl Hallway {
    pub fn new(len: u8) -> Self {
        assert!(len >= 1);
        Hallway { len }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HallwayAction {
    Forward,
}

impl Env for Hallway {
    type State = u8;
    type Obs = bool;
    type Action = HallwayAction;

    fn init_states(&self) -> Vec<(u8, Prob)> {
        vec![(0, 1.0)]
    }

    fn legal_actions(&self, s: &u8) -> Vec<HallwayAction> {
        if *s < self.len {
            vec![HallwayAction::Forward]
        } else {
            vec![]
        }
    }

    fn next_states(&self, s: &u8, _a: &HallwayAction) -> Vec<(u8, Prob)> {
        vec![(s + 1, P_ADVANCE), (*s, 1.0 - P_ADVANCE)]
    }

    fn is_goal(&self, s: &u8) -> bool {
        *s == self.len
    }

    fn observe(&self, s: &u8) -> bool {
        *s == self.len
    }
}

impl Display for HallwayAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str("forward")
    }
}
