use std::path::Path;

use rand::rngs::StdRng;

use crate::error::Result;
use crate::maze::{Action, ActionSet, Cell, Grid, MazeEnvironment};
use crate::policy::{self, ActionValues};
use crate::training::{Trainer, TrainingConfig, TrainingReport};

/// One step of experience.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub state: Cell,
    pub action: Action,
    pub reward: f32,
    pub next_state: Cell,
    pub done: bool,
    /// Legal actions at `next_state`, used by the greedy bootstrap
    pub next_actions: ActionSet,
}

/// Hyperparameters the trainer passes to every update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateParams {
    pub discount: f32,
    pub learning_rate: f32,
}

/// Protocol shared by every maze agent.
///
/// The trainer drives an agent through `begin_episode`, `select_action` and
/// `observe`; `predict` is the greedy policy used for evaluation and play.
pub trait Agent {
    /// Display name
    fn name(&self) -> &str;

    /// Grid the agent was built for
    fn grid(&self) -> &Grid;

    /// Current value estimate of every action in `cell`.
    fn q_values(&self, cell: Cell) -> ActionValues;

    /// Called before the first step of every training episode.
    fn begin_episode(&mut self) {}

    /// Epsilon-greedy choice over the legal actions of `cell`.
    fn select_action(&mut self, cell: Cell, epsilon: f32, rng: &mut StdRng) -> Action {
        policy::select_action(&self.q_values(cell), self.grid().legal_actions(cell), epsilon, rng)
    }

    /// Learn from a transition. `next_action` is the action already chosen for
    /// `transition.next_state`, or `None` when the episode ended.
    fn observe(&mut self, transition: &Transition, next_action: Option<Action>, params: &UpdateParams) -> Result<()>;

    /// Training loss of the most recent `observe`, for agents that fit a model.
    fn last_loss(&self) -> Option<f32> {
        None
    }

    /// Greedy action in `cell`.
    fn predict(&self, cell: Cell) -> Action {
        policy::greedy_action(&self.q_values(cell), self.grid().legal_actions(cell))
    }

    fn save(&self, path: &Path) -> Result<()>;

    /// Train on `env` with a fresh [`Trainer`].
    fn train(&mut self, env: &mut MazeEnvironment, config: &TrainingConfig) -> Result<TrainingReport>
    where
        Self: Sized,
    {
        Trainer::new(config.clone())?.train(self, env)
    }
}
