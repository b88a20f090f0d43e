//! The probabilistic AND-OR search.
//!
//! OR nodes extend the controller (or reuse the edge it already defines) for
//! the current `(q, observation)` pair; AND nodes fan out over the stochastic
//! outcomes of the chosen move. After every branch the α-accumulator is folded
//! into likelihood bounds: a lower bound at or above the desired LPC ends the
//! search with the current controller, an upper bound below it refutes the
//! most recent extension and unwinds the recursion to the checkpoint that
//! introduced it — either "left", resuming the interrupted AND fan-out, or
//! "up", returning one frame towards the checkpoint's ancestor.

mod alpha;
mod history;
mod lambda;

pub use lambda::Likelihoods;

use std::cmp::min;

use tracing::trace;

use crate::controller::{candidate_extensions, Controller, CtlState, Extensions, Move};
use crate::env::{check_distribution, sort_desc, Env, Outcome};
use crate::search::alpha::Alpha;
use crate::search::history::{Checkpoint, HistoryItem};
use crate::search::lambda::likelihoods;
use crate::stats::Stats;
use crate::{Prob, SynthError};

/// Result of a synthesis request.
pub enum Synthesis<O, A> {
    /// A controller whose likelihood of plan completion reaches the desired
    /// threshold.
    Found {
        controller: Controller<O, A>,
        stats: Stats,
    },
    /// No controller within the state bound reaches the threshold.
    NotFound { stats: Stats },
}

impl<O, A> Synthesis<O, A> {
    pub fn is_found(&self) -> bool {
        matches!(self, Synthesis::Found { .. })
    }

    pub fn controller(&self) -> Option<&Controller<O, A>> {
        match self {
            Synthesis::Found { controller, .. } => Some(controller),
            Synthesis::NotFound { .. } => None,
        }
    }

    pub fn stats(&self) -> &Stats {
        match self {
            Synthesis::Found { stats, .. } => stats,
            Synthesis::NotFound { stats } => stats,
        }
    }
}

/// Synthesizes a Mealy controller with at most `states_bound` states whose
/// likelihood of plan completion against `env` is at least `lpc_desired`.
///
/// `lpc_desired` must lie in `[0, 1)`: the fixpoint corrections for cycles
/// need strictly positive escape mass, so a threshold of exactly 1 is not
/// admissible.
pub fn plan<E: Env>(
    env: &E,
    states_bound: u32,
    lpc_desired: Prob,
) -> Result<Synthesis<E::Obs, E::Action>, SynthError> {
    if !(0.0..1.0).contains(&lpc_desired) {
        return Err(SynthError::ThresholdOutOfRange(lpc_desired));
    }
    check_distribution(&env.init_states())?;

    let mut search = Search {
        env,
        contr: Controller::new(states_bound),
        exts: Extensions::new(),
        alpha: Alpha::new(),
        stack: Vec::new(),
        backtracking: false,
        lpc_desired,
        stats: Stats::default(),
    };
    match search.and_step(CtlState::INIT, None, &[]) {
        Err(Stop::Found) => Ok(Synthesis::Found {
            controller: search.contr,
            stats: search.stats,
        }),
        Err(Stop::NotFound) => Ok(Synthesis::NotFound { stats: search.stats }),
        Ok(res) => unreachable!("root AND step returned {res:?} instead of a verdict"),
    }
}

/// Long-range termination signals, propagated through every recursion frame
/// with `?` so that no intermediate node mistakes them for ordinary progress.
enum Stop {
    Found,
    NotFound,
}

/// What an AND node reports to the OR node above it when it does not
/// terminate the search: either nothing is decided yet, or its subtree was
/// refuted and the unwind continues.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum AndOutcome {
    Unknown,
    Failure,
}

/// All mutable search state. Strictly single threaded; the AND/OR recursion
/// is a plain call stack over this context.
struct Search<'e, E: Env> {
    env: &'e E,
    contr: Controller<E::Obs, E::Action>,
    exts: Extensions<E::Obs, E::Action>,
    alpha: Alpha,
    stack: Vec<Checkpoint<E::State>>,
    backtracking: bool,
    lpc_desired: Prob,
    stats: Stats,
}

impl<E: Env> Search<'_, E> {
    /// Expands the stochastic outcomes of playing `mv` in controller state
    /// `q` after `history`. `mv == None` is the root step over the initial
    /// belief.
    fn and_step(
        &mut self,
        q: CtlState,
        mv: Option<&Move<E::Action>>,
        history: &[HistoryItem<E::State>],
    ) -> Result<AndOutcome, Stop> {
        let mut succs: Vec<(Outcome<E::State>, Prob)> = match mv {
            None => self
                .env
                .init_states()
                .into_iter()
                .map(|(s, p)| (Outcome::Next(s), p))
                .collect(),
            Some(Move::Stop) => {
                let s = &history.last().expect("stop move at the root").s;
                if self.env.is_goal(s) {
                    vec![(Outcome::Win, 1.0)]
                } else {
                    vec![(Outcome::Fail, 1.0)]
                }
            }
            Some(Move::Do(a)) => {
                let s = &history.last().expect("move at the root").s;
                let next = self.env.next_states(s, a);
                debug_assert!(check_distribution(&next).is_ok(), "bad successor distribution");
                next.into_iter().map(|(s, p)| (Outcome::Next(s), p)).collect()
            }
        };
        sort_desc(&mut succs);

        self.alpha.reset(history.len());

        let mut idx = if self.backtracking {
            // successors before the checkpointed branch are already proven
            // fine, resume at the branch the checkpoint lies behind
            self.resume_index(&succs, history)
        } else {
            0
        };

        loop {
            if idx >= succs.len() {
                // fell off the branch list: fold this level into the parent
                assert!(!history.is_empty(), "the root AND step always terminates early");
                self.fold_level(history);
                return Ok(AndOutcome::Unknown);
            }
            let (s_k, p_k) = succs[idx].clone();
            idx += 1;

            self.or_step(q, s_k, p_k, history.to_vec())?;

            let lik = likelihoods(&mut self.alpha, history);
            if lik.win >= self.lpc_desired {
                trace!(win = lik.win, "AND: threshold reached");
                return Err(Stop::Found);
            }
            if 1.0 - lik.fail - lik.noter < self.lpc_desired {
                self.backtracking = true;
                self.stats.num_backtracking += 1;
                let Some(top) = self.stack.last() else {
                    trace!("AND: refuted with an empty checkpoint stack");
                    return Err(Stop::NotFound);
                };
                let keep = min(history.len(), top.history.len() - 1);
                if history.len() == keep && history == &top.history[..keep] {
                    // the checkpoint lies below this node: resume the fan-out
                    // at the branch leading to it
                    trace!("AND: backtracking left");
                    if !history.is_empty() {
                        self.fold_level(history);
                    }
                    idx = self.resume_index(&succs, history);
                } else {
                    trace!("AND: backtracking up");
                    self.fold_level(history);
                    return Ok(AndOutcome::Failure);
                }
            }
        }
    }

    /// Cumulates this level's α into the parent level and clears it.
    fn fold_level(&mut self, history: &[HistoryItem<E::State>]) {
        let p = history.last().expect("no level to fold").p;
        self.alpha.cumulate(history.len(), p);
        self.alpha.reset(history.len());
    }

    /// Index of the successor the checkpointed branch descends through.
    fn resume_index(
        &self,
        succs: &[(Outcome<E::State>, Prob)],
        history: &[HistoryItem<E::State>],
    ) -> usize {
        let top = self.stack.last().expect("backtracking without a checkpoint");
        let target = &top.history[history.len()].s;
        succs
            .iter()
            .position(|(o, _)| matches!(o, Outcome::Next(s) if s == target))
            .expect("checkpointed branch vanished from the successor list")
    }

    /// Handles one environment outcome reached with probability `p` while the
    /// controller is in `q`: terminals and cycles are folded into α directly,
    /// anything else either follows the edge the controller already defines
    /// for the observation or opens a choice over candidate extensions.
    fn or_step(
        &mut self,
        q: CtlState,
        outcome: Outcome<E::State>,
        p: Prob,
        mut history: Vec<HistoryItem<E::State>>,
    ) -> Result<(), Stop> {
        self.stats.num_steps += 1;
        let level = history.len();
        let s = match outcome {
            Outcome::Win => {
                trace!(p, "OR: terminated in a goal state");
                self.alpha.win[level] += p;
                return Ok(());
            }
            Outcome::Fail => {
                trace!(p, "OR: terminated outside the goal");
                self.alpha.fail[level] += p;
                return Ok(());
            }
            Outcome::Next(s) => s,
        };

        // back on a (q, s) pair of the current path?
        if let Some(k) = history.iter().position(|it| it.q == q && it.s == s) {
            let l_loop: Prob = p * history[k + 1..].iter().map(|it| it.p).product::<Prob>();
            if l_loop == 1.0 {
                // a sure cycle: guaranteed non-termination
                trace!("OR: deterministic cycle");
                self.alpha.noter[level] += 1.0;
            } else {
                trace!(level = k, "OR: cycle to an earlier level");
                self.alpha.looping[k][level - 1] += p;
            }
            return Ok(());
        }

        history.push(HistoryItem { q, s: s.clone(), p });
        let obs = self.env.observe(&s);

        let defined = self.contr.get(q, &obs).is_some();
        let at_choice = self.stack.iter().any(|cp| cp.history == history);
        if (!self.backtracking && defined) || (self.backtracking && !at_choice) {
            // the controller already answers this observation; follow it
            let (q_next, mv) = self
                .contr
                .get(q, &obs)
                .cloned()
                .expect("backtracking along an undefined edge");
            if let Move::Do(a) = &mv {
                if !self.env.legal_actions(&s).contains(a) {
                    trace!(?a, "OR: defined move is illegal here");
                    self.alpha.fail[history.len() - 1] += p;
                    return Ok(());
                }
            }
            let _ = self.and_step(q_next, Some(&mv), &history)?;
            return Ok(());
        }

        let key = (q, obs.clone());
        if !self.backtracking {
            // a fresh choice node: open its candidate stack and checkpoint
            // everything the chosen extension may have to be rolled back to
            let legal = self.env.legal_actions(&s);
            let candidates =
                candidate_extensions(self.env.is_goal(&s), &legal, self.contr.num_states(), self.contr.bound());
            self.exts.create(key.clone(), candidates);
            self.stack.push(Checkpoint {
                history: history.clone(),
                alpha: self.alpha.clone(),
            });
            trace!(?q, ?obs, depth = history.len(), "OR: checkpoint");
        } else if history.len() == self.stack.last().expect("no checkpoint to return to").history.len() {
            // back at the node whose extension was refuted: undo the
            // extension, burn it, and resume business as usual
            self.backtracking = false;
            self.revert_alpha();
            let (popped_key, popped) = self.contr.pop_last().expect("no extension to undo");
            assert!(popped_key == key, "backtracking desynchronized from the controller");
            debug_assert_eq!(Some(&popped), self.exts.peek_last(&key));
            let _ = self.exts.pop_last(&key);
            trace!(?q, ?obs, ext = ?popped, "OR: refuted extension removed");
        }
        // otherwise we are descending through an earlier choice node towards
        // the checkpoint: its edge and candidate stack are still consistent

        loop {
            let Some((q_next, mv)) = self.exts.peek_last(&key).cloned() else {
                self.exts.delete(&key);
                break;
            };
            if !self.backtracking {
                trace!(?q, ?obs, ?q_next, ?mv, "OR: trying extension");
                self.contr.set(q, obs.clone(), q_next, mv.clone());
            }
            let res = self.and_step(q_next, Some(&mv), &history)?;
            if res == AndOutcome::Unknown && !self.backtracking {
                return Ok(());
            }
            // refuted: roll back to the snapshot and try the next candidate
            self.backtracking = false;
            self.revert_alpha();
            let (popped_key, _) = self.contr.pop_last().expect("no extension to undo");
            debug_assert!(popped_key == key, "undo out of order");
            let _ = self.exts.pop_last(&key);
        }

        // every candidate refuted: drop the checkpoint and make the failure
        // unmistakable to every λ computation above
        self.revert_alpha();
        self.stack.pop();
        self.alpha.fail[0] += 1.0;
        trace!(depth = history.len(), "OR: all extensions refuted");
        Ok(())
    }

    /// Restores α to the snapshot of the most recent checkpoint.
    fn revert_alpha(&mut self) {
        self.alpha = self.stack.last().expect("no checkpoint to revert to").alpha.clone();
    }
}
