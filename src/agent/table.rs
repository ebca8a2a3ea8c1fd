//! Sparse storage shared by the tabular agents: action values, eligibility
//! traces and the on-disk snapshot format.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, Result, TheseusError};
use crate::maze::{Action, Cell, Grid};
use crate::policy::ActionValues;

/// Action values keyed by `(cell, action)`. Absent pairs read as 0.0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    values: BTreeMap<(Cell, Action), f32>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: Cell, action: Action) -> f32 {
        self.values.get(&(cell, action)).copied().unwrap_or(0.0)
    }

    /// Store a value, rejecting NaN and infinities.
    pub fn set(&mut self, cell: Cell, action: Action, value: f32) -> Result<()> {
        let value = ensure_finite(value, &format!("Q{} {}", cell, action))?;
        self.values.insert((cell, action), value);
        Ok(())
    }

    /// Add `delta` to the stored value and return the new value.
    pub fn add(&mut self, cell: Cell, action: Action, delta: f32) -> Result<f32> {
        let value = self.get(cell, action) + delta;
        self.set(cell, action, value)?;
        Ok(value)
    }

    /// All four action values of `cell`, indexed by action code.
    pub fn values(&self, cell: Cell) -> ActionValues {
        let mut values = [0.0; Action::COUNT];
        for action in Action::ALL {
            values[action.index()] = self.get(cell, action);
        }
        values
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Cell, Action), &f32)> {
        self.values.iter()
    }
}

/// How a visit refreshes the trace of a pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceKind {
    /// The visited pair's trace is set to 1
    #[default]
    Replacing,
    /// The visited pair's trace grows by 1
    Accumulating,
}

/// Eligibility traces keyed by `(cell, action)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceTable {
    traces: BTreeMap<(Cell, Action), f32>,
    kind: TraceKind,
}

impl TraceTable {
    /// Traces this small are dropped after decaying.
    const PRUNE_BELOW: f32 = 1e-6;

    pub fn new(kind: TraceKind) -> Self {
        TraceTable {
            traces: BTreeMap::new(),
            kind,
        }
    }

    pub fn kind(&self) -> TraceKind {
        self.kind
    }

    pub fn visit(&mut self, cell: Cell, action: Action) {
        let trace = self.traces.entry((cell, action)).or_insert(0.0);
        match self.kind {
            TraceKind::Replacing => *trace = 1.0,
            TraceKind::Accumulating => *trace += 1.0,
        }
    }

    pub fn get(&self, cell: Cell, action: Action) -> f32 {
        self.traces.get(&(cell, action)).copied().unwrap_or(0.0)
    }

    /// Multiply every trace by `factor` and forget the ones that vanished.
    pub fn decay(&mut self, factor: f32) {
        self.traces.retain(|_, trace| {
            *trace *= factor;
            *trace >= Self::PRUNE_BELOW
        });
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Cell, Action), &f32)> {
        self.traces.iter()
    }
}

/// `Q += learning_rate * delta * e` for every traced pair.
///
/// All new values are computed first; if any is non-finite the table is left
/// untouched.
pub(crate) fn propagate(values: &mut ValueTable, traces: &TraceTable, learning_rate: f32, delta: f32) -> Result<()> {
    let updated = traces
        .iter()
        .map(|(&(cell, action), &trace)| {
            let value = values.get(cell, action) + learning_rate * delta * trace;
            ensure_finite(value, &format!("Q{} {}", cell, action)).map(|value| (cell, action, value))
        })
        .collect::<Result<Vec<_>>>()?;
    for (cell, action, value) in updated {
        values.values.insert((cell, action), value);
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct TableSnapshot {
    width: usize,
    height: usize,
    table: ValueTable,
}

pub(crate) fn save_table(path: &Path, grid: &Grid, table: &ValueTable) -> Result<()> {
    let snapshot = TableSnapshot {
        width: grid.width(),
        height: grid.height(),
        table: table.clone(),
    };
    std::fs::write(path, bincode::serialize(&snapshot)?)?;
    Ok(())
}

/// Read a table saved by `save_table`, checking it was trained on a grid of the same size.
pub(crate) fn load_table(path: &Path, grid: &Grid) -> Result<ValueTable> {
    let data = std::fs::read(path)?;
    let snapshot: TableSnapshot = bincode::deserialize(&data)?;
    check_dimensions(grid, snapshot.width, snapshot.height)?;
    Ok(snapshot.table)
}

pub(crate) fn check_dimensions(grid: &Grid, width: usize, height: usize) -> Result<()> {
    if (width, height) != (grid.width(), grid.height()) {
        return Err(TheseusError::dimension_mismatch(
            format!("{}x{} grid", grid.width(), grid.height()),
            format!("{}x{} grid", width, height),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_pairs_read_zero_without_inserting() {
        let table = ValueTable::new();
        assert_eq!(table.get(Cell::new(1, 1), Action::Up), 0.0);
        assert_eq!(table.values(Cell::new(1, 1)), [0.0; 4]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let mut table = ValueTable::new();
        assert!(table.set(Cell::new(0, 0), Action::Left, f32::NAN).is_err());
        assert!(table.add(Cell::new(0, 0), Action::Left, f32::INFINITY).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_replacing_and_accumulating_traces() {
        let cell = Cell::new(2, 0);
        let mut replacing = TraceTable::new(TraceKind::Replacing);
        let mut accumulating = TraceTable::new(TraceKind::Accumulating);
        for _ in 0..3 {
            replacing.visit(cell, Action::Down);
            accumulating.visit(cell, Action::Down);
        }
        assert_eq!(replacing.get(cell, Action::Down), 1.0);
        assert_eq!(accumulating.get(cell, Action::Down), 3.0);
    }

    #[test]
    fn test_decay_prunes_vanished_traces() {
        let mut traces = TraceTable::new(TraceKind::Replacing);
        traces.visit(Cell::new(0, 0), Action::Right);
        traces.decay(0.5);
        assert_eq!(traces.get(Cell::new(0, 0), Action::Right), 0.5);
        traces.decay(0.0);
        assert!(traces.is_empty());
    }

    #[test]
    fn test_propagate_is_all_or_nothing() {
        let mut values = ValueTable::new();
        values.set(Cell::new(1, 0), Action::Right, 3.0e38).unwrap();
        let mut traces = TraceTable::new(TraceKind::Replacing);
        traces.visit(Cell::new(0, 0), Action::Left);
        traces.visit(Cell::new(1, 0), Action::Right);

        let before = values.clone();
        assert!(matches!(
            propagate(&mut values, &traces, 1.0, 1.0e38),
            Err(TheseusError::NumericalError(_))
        ));
        assert_eq!(values, before);

        propagate(&mut values, &traces, 0.5, -2.0).unwrap();
        assert_eq!(values.get(Cell::new(0, 0), Action::Left), -1.0);
    }
}
