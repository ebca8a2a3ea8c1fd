use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::table::check_dimensions;
use super::traits::{Agent, Transition, UpdateParams};
use crate::error::Result;
use crate::maze::{Action, ActionSet, Cell, Grid, MazeEnvironment};
use crate::policy::ActionValues;

#[derive(Serialize, Deserialize)]
struct RandomSnapshot {
    width: usize,
    height: usize,
    seed: u64,
}

/// Baseline that moves uniformly at random among the legal actions and never learns.
#[derive(Debug)]
pub struct RandomAgent {
    grid: Arc<Grid>,
    seed: u64,
    rng: RefCell<StdRng>,
}

impl RandomAgent {
    pub fn new(env: &MazeEnvironment) -> Self {
        Self::with_seed(env, 0)
    }

    /// `seed` drives `predict`; training draws come from the trainer's generator.
    pub fn with_seed(env: &MazeEnvironment, seed: u64) -> Self {
        RandomAgent {
            grid: env.shared_grid(),
            seed,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, env: &MazeEnvironment) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let snapshot: RandomSnapshot = bincode::deserialize(&data)?;
        check_dimensions(env.grid(), snapshot.width, snapshot.height)?;
        Ok(Self::with_seed(env, snapshot.seed))
    }

    fn pick<R: Rng + ?Sized>(&self, cell: Cell, rng: &mut R) -> Action {
        let legal = self.grid.legal_actions(cell);
        let candidates = if legal.is_empty() { ActionSet::all() } else { legal };
        candidates
            .nth(rng.gen_range(0..candidates.len()))
            .unwrap_or(Action::Left)
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "random"
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn q_values(&self, _cell: Cell) -> ActionValues {
        [0.0; Action::COUNT]
    }

    fn select_action(&mut self, cell: Cell, _epsilon: f32, rng: &mut StdRng) -> Action {
        self.pick(cell, rng)
    }

    fn observe(&mut self, _transition: &Transition, _next_action: Option<Action>, _params: &UpdateParams) -> Result<()> {
        Ok(())
    }

    fn predict(&self, cell: Cell) -> Action {
        self.pick(cell, &mut *self.rng.borrow_mut())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot = RandomSnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            seed: self.seed,
        };
        std::fs::write(path, bincode::serialize(&snapshot)?)?;
        Ok(())
    }
}
