use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::action::{Action, ActionSet};
use crate::error::{Result, TheseusError};

/// Contents of a single grid square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Free,
    Wall,
}

/// A grid coordinate: `x` is the column, `y` the row, both 0-indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Parses `"x,y"`.
impl FromStr for Cell {
    type Err = TheseusError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TheseusError::invalid_parameter("cell", format!("expected 'x,y', got '{}'", s));
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(Cell { x, y })
    }
}

/// The maze layout: a row-major array of free and wall squares.
///
/// A grid never changes after construction. The environment shares it with
/// agents behind an `Arc` so they can compute legal moves without touching
/// the live episode state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl Grid {
    /// Smallest accepted width and height
    pub const MIN_SIDE: usize = 3;

    pub fn new(width: usize, height: usize, cells: Vec<CellState>) -> Result<Self> {
        if width < Self::MIN_SIDE || height < Self::MIN_SIDE {
            return Err(TheseusError::invalid_parameter(
                "grid",
                format!(
                    "dimensions must be at least {}x{}, got {}x{}",
                    Self::MIN_SIDE,
                    Self::MIN_SIDE,
                    width,
                    height
                ),
            ));
        }
        if cells.len() != width * height {
            return Err(TheseusError::dimension_mismatch(
                format!("{} cells", width * height),
                format!("{} cells", cells.len()),
            ));
        }
        Ok(Grid { width, height, cells })
    }

    /// Build from numeric rows using 0 for free and 1 for wall, the encoding
    /// produced by maze carvers.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(TheseusError::dimension_mismatch(
                    format!("row {} of width {}", y, width),
                    format!("width {}", row.len()),
                ));
            }
            for (x, &value) in row.iter().enumerate() {
                let state = match value {
                    0 => CellState::Free,
                    1 => CellState::Wall,
                    other => {
                        return Err(TheseusError::invalid_parameter(
                            "grid",
                            format!("cell ({}, {}) has value {}, expected 0 or 1", x, y, other),
                        ))
                    }
                };
                cells.push(state);
            }
        }
        Grid::new(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of squares
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Row-major index of `cell`, if it lies inside the grid.
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        self.contains(cell).then(|| cell.y * self.width + cell.x)
    }

    pub fn get(&self, cell: Cell) -> Option<CellState> {
        self.index_of(cell).map(|index| self.cells[index])
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.get(cell) == Some(CellState::Free)
    }

    /// The free square reached by moving `action` from `cell`, or `None` if
    /// the move would leave the grid or run into a wall.
    pub fn target(&self, cell: Cell, action: Action) -> Option<Cell> {
        let (dx, dy) = action.delta();
        let x = cell.x.checked_add_signed(dx)?;
        let y = cell.y.checked_add_signed(dy)?;
        let next = Cell::new(x, y);
        self.is_free(next).then_some(next)
    }

    /// Moves from `cell` that land on a free square inside the grid.
    pub fn legal_actions(&self, cell: Cell) -> ActionSet {
        if !self.is_free(cell) {
            return ActionSet::empty();
        }
        Action::ALL
            .into_iter()
            .filter(|&action| self.target(cell, action).is_some())
            .collect()
    }

    /// All free squares in row-major order.
    pub fn free_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == CellState::Free)
            .map(move |(index, _)| Cell::new(index % self.width, index / self.width))
    }
}

/// A grid plus the optional start and exit markers of a text layout.
///
/// ```
/// use theseus::maze::{Cell, MazeLayout};
///
/// let layout: MazeLayout = "S.#\n#.#\n#.E".parse().unwrap();
/// assert_eq!(layout.start, Some(Cell::new(0, 0)));
/// assert_eq!(layout.exit, Some(Cell::new(2, 2)));
/// assert_eq!(layout.grid.free_cells().count(), 5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeLayout {
    pub grid: Grid,
    pub start: Option<Cell>,
    pub exit: Option<Cell>,
}

impl MazeLayout {
    /// Read a text layout from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }
}

/// `#` is a wall, `.` or a space is free, `S` marks the start and `E` the exit.
/// Blank lines are skipped.
impl FromStr for MazeLayout {
    type Err = TheseusError;

    fn from_str(s: &str) -> Result<Self> {
        let mut rows: Vec<Vec<u8>> = Vec::new();
        let mut start = None;
        let mut exit = None;

        for line in s.lines().map(|line| line.trim_end_matches('\r')) {
            if line.trim().is_empty() {
                continue;
            }
            let y = rows.len();
            let mut row = Vec::with_capacity(line.len());
            for (x, ch) in line.chars().enumerate() {
                let value = match ch {
                    '#' => 1,
                    '.' | ' ' => 0,
                    'S' | 's' => {
                        start = Some(Cell::new(x, y));
                        0
                    }
                    'E' | 'e' => {
                        exit = Some(Cell::new(x, y));
                        0
                    }
                    other => {
                        return Err(TheseusError::invalid_parameter(
                            "layout",
                            format!("unexpected character '{}' at ({}, {})", other, x, y),
                        ))
                    }
                };
                row.push(value);
            }
            rows.push(row);
        }

        let grid = Grid::from_rows(&rows)?;
        Ok(MazeLayout { grid, start, exit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Grid {
        Grid::from_rows(&[
            vec![0, 0, 0],
            vec![1, 1, 0],
            vec![0, 0, 0],
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_small_or_ragged_grids() {
        assert!(Grid::from_rows(&[vec![0, 0], vec![0, 0]]).is_err());
        assert!(Grid::from_rows(&[vec![0, 0, 0], vec![0, 0], vec![0, 0, 0]]).is_err());
        assert!(Grid::from_rows(&[vec![0, 0, 2], vec![0, 0, 0], vec![0, 0, 0]]).is_err());
        assert!(Grid::new(3, 3, vec![CellState::Free; 8]).is_err());
    }

    #[test]
    fn test_legal_actions_respect_walls_and_bounds() {
        let grid = corridor();
        let corner = grid.legal_actions(Cell::new(0, 0));
        assert_eq!(corner.iter().collect::<Vec<_>>(), vec![Action::Right]);

        let bend = grid.legal_actions(Cell::new(2, 1));
        assert_eq!(bend.iter().collect::<Vec<_>>(), vec![Action::Up, Action::Down]);

        assert!(grid.legal_actions(Cell::new(0, 1)).is_empty());
        assert!(grid.legal_actions(Cell::new(7, 7)).is_empty());
    }

    #[test]
    fn test_free_cells_and_indexing() {
        let grid = corridor();
        let free: Vec<Cell> = grid.free_cells().collect();
        assert_eq!(free.len(), 7);
        assert_eq!(free[0], Cell::new(0, 0));
        assert_eq!(grid.index_of(Cell::new(2, 1)), Some(5));
        assert_eq!(grid.index_of(Cell::new(3, 0)), None);
    }

    #[test]
    fn test_parse_layout() {
        let layout: MazeLayout = "\
S..
##.
E..
"
        .parse()
        .unwrap();
        assert_eq!(layout.grid, corridor());
        assert_eq!(layout.start, Some(Cell::new(0, 0)));
        assert_eq!(layout.exit, Some(Cell::new(0, 2)));

        assert!("S.x\n...\n...".parse::<MazeLayout>().is_err());
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!("4, 1".parse::<Cell>().unwrap(), Cell::new(4, 1));
        assert!("4".parse::<Cell>().is_err());
        assert!("a,b".parse::<Cell>().is_err());
    }
}
