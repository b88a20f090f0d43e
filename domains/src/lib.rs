//! Demonstration environments for the controller synthesizer.
//!
//! Each domain implements [`mealy::Env`] and nothing else; the planner never
//! learns anything about a domain beyond that interface.

mod bridge;
mod hallway;

pub use bridge::{BridgeAction, BridgeObs, BridgeState, BridgeWalk};
pub use hallway::{Hallway, HallwayAction};
