use std::path::Path;
use std::sync::Arc;

use super::table::{self, ValueTable};
use super::traits::{Agent, Transition, UpdateParams};
use crate::error::Result;
use crate::maze::{Action, Cell, Grid, MazeEnvironment};
use crate::policy::{self, ActionValues};

/// `r + discount * max Q(s', a')` over the legal next actions, or `r` when the episode ended.
pub(crate) fn greedy_target(table: &ValueTable, transition: &Transition, discount: f32) -> f32 {
    if transition.done {
        transition.reward
    } else {
        let next = table.values(transition.next_state);
        transition.reward + discount * policy::greedy_value(&next, transition.next_actions)
    }
}

/// Tabular Q-learning.
///
/// Off-policy: the update bootstraps from the best next action whatever the
/// behaviour policy does next.
#[derive(Clone, Debug)]
pub struct QTableAgent {
    grid: Arc<Grid>,
    table: ValueTable,
}

impl QTableAgent {
    pub fn new(env: &MazeEnvironment) -> Self {
        QTableAgent {
            grid: env.shared_grid(),
            table: ValueTable::new(),
        }
    }

    /// Load a table saved by [`Agent::save`] for a grid of the same size.
    pub fn load<P: AsRef<Path>>(path: P, env: &MazeEnvironment) -> Result<Self> {
        let grid = env.shared_grid();
        let table = table::load_table(path.as_ref(), &grid)?;
        Ok(QTableAgent { grid, table })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }
}

impl Agent for QTableAgent {
    fn name(&self) -> &str {
        "q-table"
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn q_values(&self, cell: Cell) -> ActionValues {
        self.table.values(cell)
    }

    fn observe(&mut self, transition: &Transition, _next_action: Option<Action>, params: &UpdateParams) -> Result<()> {
        let target = greedy_target(&self.table, transition, params.discount);
        let current = self.table.get(transition.state, transition.action);
        self.table.set(
            transition.state,
            transition.action,
            current + params.learning_rate * (target - current),
        )
    }

    fn save(&self, path: &Path) -> Result<()> {
        table::save_table(path, &self.grid, &self.table)
    }
}
