//! Monte-Carlo validation of a synthesized controller.
//!
//! The search proves its likelihood bounds analytically; this module checks
//! them the blunt way, by playing the closed loop of controller and
//! environment many times and counting how often it stops in a goal state.

use rand::Rng;

use crate::controller::{Controller, Move};
use crate::env::Env;
use crate::Prob;

/// Plays `controller` against `env` for `trials` episodes of at most
/// `horizon` moves each and returns the fraction that stopped in a goal
/// state.
///
/// An episode counts as failed when it stops outside a goal, reaches a
/// `(q, observation)` pair the controller leaves undefined, plays an illegal
/// move, or runs out of horizon.
pub fn success_rate<E: Env>(
    env: &E,
    controller: &Controller<E::Obs, E::Action>,
    trials: u32,
    horizon: u32,
    rng: &mut impl Rng,
) -> Prob {
    assert!(trials > 0);
    let mut wins = 0u32;
    'trial: for _ in 0..trials {
        let mut s = sample(&env.init_states(), rng);
        let mut q = controller.init_state();
        for _ in 0..horizon {
            let obs = env.observe(&s);
            let (q_next, mv) = match controller.get(q, &obs) {
                Some(ext) => ext,
                None => continue 'trial,
            };
            match mv {
                Move::Stop => {
                    if env.is_goal(&s) {
                        wins += 1;
                    }
                    continue 'trial;
                }
                Move::Do(a) => {
                    if !env.legal_actions(&s).contains(a) {
                        continue 'trial;
                    }
                    s = sample(&env.next_states(&s, a), rng);
                    q = *q_next;
                }
            }
        }
    }
    f64::from(wins) / f64::from(trials)
}

fn sample<S: Clone>(dist: &[(S, Prob)], rng: &mut impl Rng) -> S {
    let mut x: Prob = rng.random();
    for (s, p) in dist {
        x -= p;
        if x <= 0.0 {
            return s.clone();
        }
    }
    dist.last().expect("empty distribution").0.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CtlState;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Two cells; walking from the first surely reaches the goal cell.
    struct TwoCells;

    impl Env for TwoCells {
        type State = u8;
        type Obs = bool;
        type Action = char;

        fn init_states(&self) -> Vec<(u8, Prob)> {
            vec![(0, 1.0)]
        }
        fn legal_actions(&self, s: &u8) -> Vec<char> {
            if *s == 0 {
                vec!['w']
            } else {
                vec![]
            }
        }
        fn next_states(&self, _s: &u8, _a: &char) -> Vec<(u8, Prob)> {
            vec![(1, 1.0)]
        }
        fn is_goal(&self, s: &u8) -> bool {
            *s == 1
        }
        fn observe(&self, s: &u8) -> bool {
            *s == 1
        }
    }

    #[test]
    fn deterministic_controller_always_succeeds() {
        let mut c: Controller<bool, char> = Controller::new(1);
        c.set(CtlState::INIT, false, CtlState::INIT, Move::Do('w'));
        c.set(CtlState::INIT, true, CtlState::INIT, Move::Stop);
        let mut rng = SmallRng::seed_from_u64(7);
        let rate = success_rate(&TwoCells, &c, 100, 10, &mut rng);
        assert_eq!(rate, 1.0);
    }

    #[test]
    fn undefined_edges_count_as_failure() {
        let mut c: Controller<bool, char> = Controller::new(1);
        c.set(CtlState::INIT, false, CtlState::INIT, Move::Do('w'));
        let mut rng = SmallRng::seed_from_u64(7);
        let rate = success_rate(&TwoCells, &c, 50, 10, &mut rng);
        assert_eq!(rate, 0.0);
    }
}
