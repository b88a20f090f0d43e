//! Folding the α-accumulator into likelihoods at the search root.

use crate::search::alpha::Alpha;
use crate::search::history::HistoryItem;
use crate::Prob;

/// Tolerance under which a subtree's self-loop probability counts as 1.
const EPS: Prob = 1e-6;

/// Current estimate of the closed loop's terminal behaviour: the probability
/// of reaching a goal, of reaching a non-goal terminal, and of provably never
/// terminating. `win` is a lower bound on the LPC of the partial controller;
/// `1 - fail - noter` is an upper bound.
#[derive(Clone, Copy, Debug)]
pub struct Likelihoods {
    pub win: Prob,
    pub fail: Prob,
    pub noter: Prob,
}

/// Folds `alpha` along `history` into likelihoods at the root.
///
/// For each level `k` (deepest first), `l_loop[k]` is the probability that
/// the subtree below `k` comes back to `k`: its direct cycles plus the cycles
/// recorded at deeper levels, weighted by the path probability down to their
/// source and renormalized by the deeper levels' own fixpoints. A level whose
/// `l_loop` reaches 1 is a pure cycle: its entire incoming mass is
/// non-termination, recorded back into `alpha` for good.
pub(crate) fn likelihoods<S>(alpha: &mut Alpha, history: &[HistoryItem<S>]) -> Likelihoods {
    let n = history.len();
    let mut lik = Likelihoods {
        win: alpha.win[n],
        fail: alpha.fail[n],
        noter: alpha.noter[n],
    };
    let mut l_loop = vec![0.0; n + 1];
    for k in (0..n).rev() {
        let mut loop_k = alpha.looping[k][k];
        let mut path = 1.0;
        for m in (k + 1)..n {
            path *= history[m].p;
            loop_k += alpha.looping[k][m] * path / (1.0 - l_loop[m]);
        }
        if loop_k > 1.0 - EPS {
            // the subtree below k never escapes: all of its mass is noter
            l_loop[k] = 0.0;
            alpha.noter[k] += history[k].p;
            for i in k..=n {
                for j in k..=n {
                    alpha.looping[i][j] = 0.0;
                }
            }
            lik = Likelihoods {
                win: alpha.win[k],
                fail: alpha.fail[k],
                noter: alpha.noter[k],
            };
        } else {
            l_loop[k] = loop_k;
            let scale = history[k].p / (1.0 - loop_k);
            lik.win = alpha.win[k] + scale * lik.win;
            lik.fail = alpha.fail[k] + scale * lik.fail;
            lik.noter = alpha.noter[k] + scale * lik.noter;
        }
    }
    debug_assert!((-1e-9..=1.0 + 1e-9).contains(&lik.win));
    debug_assert!((-1e-9..=1.0 + 1e-9).contains(&lik.noter));
    debug_assert!(lik.fail >= -1e-9);
    lik
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CtlState;

    fn item(p: Prob) -> HistoryItem<u8> {
        HistoryItem {
            q: CtlState::INIT,
            s: 0,
            p,
        }
    }

    #[test]
    fn folds_one_level_by_the_transition_probability() {
        let mut a = Alpha::new();
        a.reset(1);
        a.win[1] = 1.0;
        a.win[0] = 0.2;
        let lik = likelihoods(&mut a, &[item(0.5)]);
        assert!((lik.win - 0.7).abs() < 1e-12);
        assert_eq!(lik.fail, 0.0);
    }

    #[test]
    fn self_loops_are_folded_geometrically() {
        let mut a = Alpha::new();
        a.reset(1);
        // the depth-1 subtree wins with 0.8 and comes back to its root with 0.2
        a.win[1] = 0.8;
        a.looping[0][0] = 0.2;
        let lik = likelihoods(&mut a, &[item(1.0)]);
        assert!((lik.win - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sure_cycles_become_non_termination() {
        let mut a = Alpha::new();
        a.reset(1);
        a.win[0] = 0.25;
        a.looping[0][0] = 1.0;
        let lik = likelihoods(&mut a, &[item(0.5)]);
        assert_eq!(lik.win, 0.25);
        assert!((lik.noter - 0.5).abs() < 1e-12);
        // the verdict is recorded permanently
        assert!((a.noter[0] - 0.5).abs() < 1e-12);
        assert_eq!(a.looping[0][0], 0.0);
    }

    #[test]
    fn cross_level_loops_use_the_path_probability() {
        let mut a = Alpha::new();
        a.reset(2);
        // depth-2 branches: 0.5 wins, 0.5 cycles back to the root
        a.win[2] = 0.5;
        a.looping[0][1] = 0.5;
        let h = [item(1.0), item(1.0)];
        let lik = likelihoods(&mut a, &h);
        // fixpoint: win = 0.5 / (1 - 0.5)
        assert!((lik.win - 1.0).abs() < 1e-9);
    }
}
