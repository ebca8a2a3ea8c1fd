use std::path::Path;
use std::sync::Arc;

use super::sarsa_table::on_policy_target;
use super::table::{self, TraceKind, TraceTable, ValueTable};
use super::traits::{Agent, Transition, UpdateParams};
use crate::error::Result;
use crate::maze::{Action, Cell, Grid, MazeEnvironment};
use crate::policy::ActionValues;

/// Tabular SARSA(lambda).
///
/// The on-policy error of every step is credited to all pairs still carrying
/// a trace, so a reward reaches the start of the path within one episode.
#[derive(Clone, Debug)]
pub struct SarsaTableTraceAgent {
    grid: Arc<Grid>,
    table: ValueTable,
    traces: TraceTable,
    trace_decay: f32,
}

impl SarsaTableTraceAgent {
    pub const DEFAULT_TRACE_DECAY: f32 = 0.8;

    pub fn new(env: &MazeEnvironment) -> Self {
        SarsaTableTraceAgent {
            grid: env.shared_grid(),
            table: ValueTable::new(),
            traces: TraceTable::new(TraceKind::default()),
            trace_decay: Self::DEFAULT_TRACE_DECAY,
        }
    }

    /// Override lambda and the trace kind. `trace_decay` must lie in [0, 1].
    pub fn with_traces(mut self, trace_decay: f32, kind: TraceKind) -> Result<Self> {
        self.trace_decay = super::validate_trace_decay(trace_decay)?;
        self.traces = TraceTable::new(kind);
        Ok(self)
    }

    pub fn load<P: AsRef<Path>>(path: P, env: &MazeEnvironment) -> Result<Self> {
        let mut agent = Self::new(env);
        agent.table = table::load_table(path.as_ref(), &agent.grid)?;
        Ok(agent)
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn traces(&self) -> &TraceTable {
        &self.traces
    }

    pub fn trace_decay(&self) -> f32 {
        self.trace_decay
    }
}

impl Agent for SarsaTableTraceAgent {
    fn name(&self) -> &str {
        "sarsa-table-trace"
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn q_values(&self, cell: Cell) -> ActionValues {
        self.table.values(cell)
    }

    fn begin_episode(&mut self) {
        self.traces.clear();
    }

    fn observe(&mut self, transition: &Transition, next_action: Option<Action>, params: &UpdateParams) -> Result<()> {
        self.traces.visit(transition.state, transition.action);
        let target = on_policy_target(&self.table, transition, next_action, params.discount);
        let delta = target - self.table.get(transition.state, transition.action);
        table::propagate(&mut self.table, &self.traces, params.learning_rate, delta)?;
        self.traces.decay(params.discount * self.trace_decay);
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        table::save_table(path, &self.grid, &self.table)
    }
}
