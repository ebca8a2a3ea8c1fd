//! # Exploration Policy
//!
//! Epsilon-greedy action selection over a set of legal actions, plus the
//! per-episode decay schedule for epsilon.
//!
//! Greedy ties are broken by the lowest action code so that runs with the same
//! seed pick the same actions.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TheseusError};
use crate::maze::{Action, ActionSet};

/// Estimated value of each action, indexed by action code
pub type ActionValues = [f32; Action::COUNT];

/// Greedy action among `legal`; ties go to the lowest action code.
///
/// An empty `legal` set (an isolated cell) falls back to all four actions.
pub fn greedy_action(values: &ActionValues, legal: ActionSet) -> Action {
    let candidates = if legal.is_empty() { ActionSet::all() } else { legal };
    let mut best = Action::Left;
    let mut best_value = f32::NEG_INFINITY;
    let mut found = false;
    for action in candidates.iter() {
        let value = values[action.index()];
        if !found || value > best_value {
            best = action;
            best_value = value;
            found = true;
        }
    }
    best
}

/// Value of the greedy action, with the same empty-set fallback as `greedy_action`.
pub fn greedy_value(values: &ActionValues, legal: ActionSet) -> f32 {
    values[greedy_action(values, legal).index()]
}

/// With probability `epsilon` a uniformly random legal action, otherwise the
/// greedy one. One uniform draw is always consumed so the random stream does
/// not depend on the outcome.
pub fn select_action<R: Rng + ?Sized>(
    values: &ActionValues,
    legal: ActionSet,
    epsilon: f32,
    rng: &mut R,
) -> Action {
    let candidates = if legal.is_empty() { ActionSet::all() } else { legal };
    if rng.gen::<f32>() < epsilon {
        let pick = rng.gen_range(0..candidates.len());
        candidates.nth(pick).unwrap_or(Action::Left)
    } else {
        greedy_action(values, candidates)
    }
}

/// Epsilon together with its exponential decay schedule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    epsilon: f32,
    decay: f32,
}

impl EpsilonGreedy {
    /// `epsilon` must lie in [0, 1] and `decay` in (0, 1].
    pub fn new(epsilon: f32, decay: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(TheseusError::invalid_parameter(
                "exploration_rate",
                format!("must be in [0, 1], got {}", epsilon),
            ));
        }
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(TheseusError::invalid_parameter(
                "exploration_decay",
                format!("must be in (0, 1], got {}", decay),
            ));
        }
        Ok(EpsilonGreedy { epsilon, decay })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Apply one episode's worth of decay.
    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(0.0);
    }

    pub fn select<R: Rng + ?Sized>(&self, values: &ActionValues, legal: ActionSet, rng: &mut R) -> Action {
        select_action(values, legal, self.epsilon, rng)
    }
}
