use std::path::Path;
use std::sync::Arc;

use super::table::{self, ValueTable};
use super::traits::{Agent, Transition, UpdateParams};
use crate::error::Result;
use crate::maze::{Action, Cell, Grid, MazeEnvironment};
use crate::policy::{self, ActionValues};

/// `r + discount * Q(s', a')` for the action the policy already picked in `s'`.
///
/// Without a next action (the caller did not select one) the greedy action stands in.
pub(crate) fn on_policy_target(
    table: &ValueTable,
    transition: &Transition,
    next_action: Option<Action>,
    discount: f32,
) -> f32 {
    if transition.done {
        return transition.reward;
    }
    let next = table.values(transition.next_state);
    let next_value = match next_action {
        Some(action) => next[action.index()],
        None => policy::greedy_value(&next, transition.next_actions),
    };
    transition.reward + discount * next_value
}

/// Tabular SARSA.
///
/// On-policy: the update bootstraps from the value of the action that will
/// actually be taken next, exploration included.
#[derive(Clone, Debug)]
pub struct SarsaTableAgent {
    grid: Arc<Grid>,
    table: ValueTable,
}

impl SarsaTableAgent {
    pub fn new(env: &MazeEnvironment) -> Self {
        SarsaTableAgent {
            grid: env.shared_grid(),
            table: ValueTable::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, env: &MazeEnvironment) -> Result<Self> {
        let grid = env.shared_grid();
        let table = table::load_table(path.as_ref(), &grid)?;
        Ok(SarsaTableAgent { grid, table })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }
}

impl Agent for SarsaTableAgent {
    fn name(&self) -> &str {
        "sarsa-table"
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn q_values(&self, cell: Cell) -> ActionValues {
        self.table.values(cell)
    }

    fn observe(&mut self, transition: &Transition, next_action: Option<Action>, params: &UpdateParams) -> Result<()> {
        let target = on_policy_target(&self.table, transition, next_action, params.discount);
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
