use std::path::Path;
use std::sync::Arc;

use super::q_table::greedy_target;
use super::table::{self, TraceKind, TraceTable, ValueTable};
use super::traits::{Agent, Transition, UpdateParams};
use crate::error::Result;
use crate::maze::{Action, Cell, Grid, MazeEnvironment};
use crate::policy::ActionValues;

/// Tabular Q-learning with eligibility traces (Q(lambda) without trace cutting).
///
/// Each temporal-difference error is spread over every pair visited earlier
/// in the episode, weighted by its decaying trace.
#[derive(Clone, Debug)]
pub struct QTableTraceAgent {
    grid: Arc<Grid>,
    table: ValueTable,
    traces: TraceTable,
    trace_decay: f32,
}

impl QTableTraceAgent {
    pub const DEFAULT_TRACE_DECAY: f32 = 0.8;

    pub fn new(env: &MazeEnvironment) -> Self {
        QTableTraceAgent {
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

impl Agent for QTableTraceAgent {
    fn name(&self) -> &str {
        "q-table-trace"
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

    fn observe(&mut self, transition: &Transition, _next_action: Option<Action>, params: &UpdateParams) -> Result<()> {
        self.traces.visit(transition.state, transition.action);
        let target = greedy_target(&self.table, transition, params.discount);
        let delta = target - self.table.get(transition.state, transition.action);
        table::propagate(&mut self.table, &self.traces, params.learning_rate, delta)?;
        self.traces.decay(params.discount * self.trace_decay);
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        table::save_table(path, &self.grid, &self.table)
    }
}
