use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::action::{Action, ActionSet};
use super::grid::{Cell, Grid};
use crate::error::{Result, TheseusError};

/// Reward bands of the maze.
///
/// Exactly one band applies to each step. The bands must stay ordered
/// `exit > 0 > step > revisit > wall_bump`, otherwise wandering can pay
/// better than heading for the exit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Reward for moving onto the exit
    pub exit: f32,
    /// Cost of an ordinary move to a new square
    pub step: f32,
    /// Penalty for moving onto a square already visited this episode
    pub revisit: f32,
    /// Penalty for trying to move into a wall or off the grid
    pub wall_bump: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            exit: 10.0,
            step: -0.05,
            revisit: -0.25,
            wall_bump: -0.75,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<()> {
        let bands = [self.exit, self.step, self.revisit, self.wall_bump];
        if bands.iter().any(|reward| !reward.is_finite()) {
            return Err(TheseusError::invalid_parameter("rewards", "all rewards must be finite"));
        }
        if !(self.exit > 0.0 && 0.0 > self.step && self.step > self.revisit && self.revisit > self.wall_bump) {
            return Err(TheseusError::invalid_parameter(
                "rewards",
                format!(
                    "expected exit > 0 > step > revisit > wall_bump, got {} / {} / {} / {}",
                    self.exit, self.step, self.revisit, self.wall_bump
                ),
            ));
        }
        Ok(())
    }
}

/// Where the current episode stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Won,
    /// The step budget ran out before the exit was reached
    Lost,
}

/// Result of a single `step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub next_state: Cell,
    pub reward: f32,
    pub done: bool,
    pub status: GameStatus,
}

/// Read-only view of the environment for renderers.
#[derive(Clone, Copy, Debug)]
pub struct MazeView<'a> {
    pub grid: &'a Grid,
    pub position: Cell,
    pub visited: &'a BTreeSet<Cell>,
    pub exit: Cell,
    pub steps: usize,
    pub status: GameStatus,
}

/// The maze as a deterministic Markov decision process.
///
/// The state is the agent's cell. Moves into walls or off the grid leave the
/// agent in place but still cost a step. An episode ends on the exit or when
/// the step budget is used up.
///
/// ```
/// use theseus::maze::{Action, Cell, GameStatus, MazeEnvironment, MazeLayout};
///
/// let layout: MazeLayout = "S.E\n.##\n...".parse().unwrap();
/// let mut env = MazeEnvironment::new(layout.grid, Cell::new(2, 0)).unwrap();
/// env.reset(Cell::new(0, 0)).unwrap();
///
/// let first = env.step(Action::Right).unwrap();
/// assert!(!first.done);
/// let second = env.step(Action::Right).unwrap();
/// assert!(second.done);
/// assert_eq!(second.status, GameStatus::Won);
/// assert_eq!(second.reward, 10.0);
/// ```
#[derive(Clone, Debug)]
pub struct MazeEnvironment {
    grid: Arc<Grid>,
    exit: Cell,
    rewards: RewardConfig,
    max_steps: usize,
    position: Cell,
    visited: BTreeSet<Cell>,
    steps: usize,
    status: GameStatus,
}

impl MazeEnvironment {
    /// Steps allowed per episode, per grid square, when no budget is given
    pub const DEFAULT_STEPS_PER_CELL: usize = 4;

    /// Create an environment with the default rewards and step budget.
    pub fn new(grid: Grid, exit: Cell) -> Result<Self> {
        let max_steps = grid.size() * Self::DEFAULT_STEPS_PER_CELL;
        Self::with_config(grid, exit, RewardConfig::default(), max_steps)
    }

    pub fn with_config(grid: Grid, exit: Cell, rewards: RewardConfig, max_steps: usize) -> Result<Self> {
        rewards.validate()?;
        if !grid.contains(exit) {
            return Err(TheseusError::invalid_parameter(
                "exit",
                format!("{} lies outside the {}x{} grid", exit, grid.width(), grid.height()),
            ));
        }
        if !grid.is_free(exit) {
            return Err(TheseusError::invalid_parameter("exit", format!("{} is a wall", exit)));
        }
        if max_steps == 0 {
            return Err(TheseusError::invalid_parameter("max_steps", "must be greater than 0"));
        }
        let initial = grid
            .free_cells()
            .find(|&cell| cell != exit)
            .ok_or_else(|| TheseusError::invalid_parameter("grid", "needs a free cell besides the exit"))?;

        let mut env = MazeEnvironment {
            grid: Arc::new(grid),
            exit,
            rewards,
            max_steps,
            position: initial,
            visited: BTreeSet::new(),
            steps: 0,
            status: GameStatus::Playing,
        };
        env.reset(initial)?;
        Ok(env)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// A shared handle to the (immutable) grid.
    pub fn shared_grid(&self) -> Arc<Grid> {
        Arc::clone(&self.grid)
    }

    pub fn exit(&self) -> Cell {
        self.exit
    }

    pub fn position(&self) -> Cell {
        self.position
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    /// Every free cell an episode may start from, i.e. all free cells but the exit.
    pub fn start_cells(&self) -> Vec<Cell> {
        self.grid.free_cells().filter(|&cell| cell != self.exit).collect()
    }

    /// Put the agent on `start` and clear the per-episode counters.
    pub fn reset(&mut self, start: Cell) -> Result<Cell> {
        if !self.grid.is_free(start) {
            return Err(TheseusError::invalid_parameter(
                "start",
                format!("{} is not a free cell of the grid", start),
            ));
        }
        if start == self.exit {
            return Err(TheseusError::invalid_parameter("start", "start cell must differ from the exit"));
        }
        self.position = start;
        self.steps = 0;
        self.visited.clear();
        self.visited.insert(start);
        self.status = GameStatus::Playing;
        Ok(start)
    }

    pub fn legal_actions(&self, cell: Cell) -> ActionSet {
        self.grid.legal_actions(cell)
    }

    /// Apply `action`. Blocked moves keep the position and earn the wall-bump penalty.
    pub fn step(&mut self, action: Action) -> Result<StepOutcome> {
        if self.status != GameStatus::Playing {
            return Err(TheseusError::EpisodeFinished);
        }
        self.steps += 1;

        let reward = match self.grid.target(self.position, action) {
            Some(next) => {
                self.position = next;
                if next == self.exit {
                    self.rewards.exit
                } else if self.visited.insert(next) {
                    self.rewards.step
                } else {
                    self.rewards.revisit
                }
            }
            None => self.rewards.wall_bump,
        };

        self.status = if self.position == self.exit {
            GameStatus::Won
        } else if self.steps >= self.max_steps {
            GameStatus::Lost
        } else {
            GameStatus::Playing
        };

        Ok(StepOutcome {
            next_state: self.position,
            reward,
            done: self.status != GameStatus::Playing,
            status: self.status,
        })
    }

    /// `step` for a raw action code; codes outside `0..4` fail without touching the state.
    pub fn step_code(&mut self, code: usize) -> Result<StepOutcome> {
        let action = Action::from_index(code)?;
        self.step(action)
    }

    pub fn view(&self) -> MazeView<'_> {
        MazeView {
            grid: &self.grid,
            position: self.position,
            visited: &self.visited,
            exit: self.exit,
            steps: self.steps,
            status: self.status,
        }
    }
}
