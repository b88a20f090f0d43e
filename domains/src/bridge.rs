//! A walker crosses a narrow bridge in changing wind.

use std::fmt::{Display, Error, Formatter};

use mealy::{Env, Prob};

/// Probability that the wind turns gusty after a step forward.
const P_GUST: Prob = 0.25;
/// Probability that bracing waits a gust out.
const P_CALM_AFTER_BRACE: Prob = 0.8;
/// Probability of falling when walking through a gust.
const P_FALL_IN_GUST: Prob = 0.5;

/// The bridge walk: a walker must cross `len` segments of a narrow bridge.
/// Wind is either calm or gusty and the walker feels it before moving.
/// Walking in calm weather is safe; walking through a gust drops the walker
/// into the water half of the time. Bracing never moves but usually waits
/// the gust out.
///
/// The walker only observes the wind and whether the far bank is reached,
/// not its position on the bridge.
pub struct BridgeWalk {
    len: u8,
}

impl BridgeWalk {
    pub fn new(len: u8) -> Self {
        assert!(len >= 1);
        BridgeWalk { len }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BridgeState {
    /// On the bridge: position and whether the wind is gusty.
    On { pos: u8, gusty: bool },
    /// In the water. No way back up.
    Water,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BridgeObs {
    Calm,
    Gusty,
    FarBank,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BridgeAction {
    Walk,
    Brace,
}

impl Env for BridgeWalk {
    type State = BridgeState;
    type Obs = BridgeObs;
    type Action = BridgeAction;

    fn init_states(&self) -> Vec<(BridgeState, Prob)> {
        vec![(BridgeState::On { pos: 0, gusty: false }, 1.0)]
    }

    fn legal_actions(&self, s: &BridgeState) -> Vec<BridgeAction> {
        match s {
            BridgeState::On { pos, .. } if *pos < self.len => {
                vec![BridgeAction::Walk, BridgeAction::Brace]
            }
            _ => vec![],
        }
    }

    fn next_states(&self, s: &BridgeState, a: &BridgeAction) -> Vec<(BridgeState, Prob)> {
        let (pos, gusty) = match s {
            BridgeState::On { pos, gusty } => (*pos, *gusty),
            BridgeState::Water => return vec![(BridgeState::Water, 1.0)],
        };
        let ahead = pos + 1;
        match a {
            BridgeAction::Walk => {
                let advanced = [
                    (BridgeState::On { pos: ahead, gusty: false }, 1.0 - P_GUST),
                    (BridgeState::On { pos: ahead, gusty: true }, P_GUST),
                ];
                if gusty {
                    let mut out = vec![(BridgeState::Water, P_FALL_IN_GUST)];
                    out.extend(
                        advanced
                            .into_iter()
                            .map(|(s, p)| (s, p * (1.0 - P_FALL_IN_GUST))),
                    );
                    out
                } else {
                    advanced.to_vec()
                }
            }
            BridgeAction::Brace => vec![
                (BridgeState::On { pos, gusty: false }, P_CALM_AFTER_BRACE),
                (BridgeState::On { pos, gusty: true }, 1.0 - P_CALM_AFTER_BRACE),
            ],
        }
    }

    fn is_goal(&self, s: &BridgeState) -> bool {
        matches!(s, BridgeState::On { pos, .. } if *pos == self.len)
    }

    fn observe(&self, s: &BridgeState) -> BridgeObs {
        match s {
            BridgeState::On { pos, .. } if *pos == self.len => BridgeObs::FarBank,
            BridgeState::On { gusty: false, .. } => BridgeObs::Calm,
            BridgeState::On { gusty: true, .. } => BridgeObs::Gusty,
            BridgeState::Water => BridgeObs::Calm,
        }
    }
}

impl Display for BridgeObs {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let name = match self {
            BridgeObs::Calm => "calm",
            BridgeObs::Gusty => "gusty",
            BridgeObs::FarBank => "far-bank",
        };
        f.write_str(name)
    }
}

impl Display for BridgeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let name = match self {
            BridgeAction::Walk => "walk",
            BridgeAction::Brace => "brace",
        };
        f.write_str(name)
    }
}
