//! Synthesis on the demonstration domains, cross-checked by simulation.

use mealy::{plan, simulate, CtlState, Move};
use mealy_domains::{BridgeAction, BridgeObs, BridgeWalk, Hallway};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[test]
fn hallway_controller_reaches_the_far_end() {
    let env = Hallway::new(3);
    let result = plan(&env, 2, 0.95).unwrap();
    let controller = result.controller().expect("walking forward until the end wins");

    // re-simulate the closed loop: the measured success rate must agree with
    // the proven likelihood up to sampling error
    let mut rng = SmallRng::seed_from_u64(0xB0);
    let rate = simulate::success_rate(&env, controller, 2000, 200, &mut rng);
    assert!(rate >= 0.9, "simulated success rate {rate} too far below the proven bound");
}

#[test]
fn bridge_controller_braces_through_gusts() {
    let env = BridgeWalk::new(4);
    let result = plan(&env, 2, 0.9).unwrap();
    let controller = result.controller().expect("bracing through gusts wins");
    assert!(controller.iter().all(|(_, (q_next, _))| q_next.to_int() < 2));

    let mut rng = SmallRng::seed_from_u64(0xB1);
    let rate = simulate::success_rate(&env, controller, 2000, 200, &mut rng);
    assert!(rate >= 0.85, "simulated success rate {rate} too far below the proven bound");
}

#[test]
fn one_state_suffices_on_the_bridge() {
    // wind and far bank are directly observable, so a single controller
    // state can already encode the safe policy
    let env = BridgeWalk::new(2);
    let result = plan(&env, 1, 0.9).unwrap();
    let controller = result.controller().expect("one state suffices");
    assert_eq!(
        controller.get(CtlState::INIT, &BridgeObs::Gusty),
        Some(&(CtlState::INIT, Move::Do(BridgeAction::Brace)))
    );
    assert_eq!(
        controller.get(CtlState::INIT, &BridgeObs::FarBank),
        Some(&(CtlState::INIT, Move::Stop))
    );
}
