use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TheseusError};

/// One of the four moves available in the maze.
///
/// The discriminants are the action codes used throughout the crate: Q-value
/// arrays are indexed by them and greedy ties resolve to the lowest code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
}

impl Action {
    /// Number of actions
    pub const COUNT: usize = 4;

    /// All actions in ascending code order
    pub const ALL: [Action; Action::COUNT] = [Action::Left, Action::Right, Action::Up, Action::Down];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Convert an integer action code, rejecting anything outside `0..4`.
    pub fn from_index(code: usize) -> Result<Self> {
        Action::ALL
            .get(code)
            .copied()
            .ok_or(TheseusError::InvalidAction {
                action: code,
                max_actions: Action::COUNT,
            })
    }

    /// Column/row offset of the move. Rows grow downwards.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
            Action::Up => (0, -1),
            Action::Down => (0, 1),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Left => "left",
            Action::Right => "right",
            Action::Up => "up",
            Action::Down => "down",
        };
        f.write_str(name)
    }
}

/// A set of actions stored as a bitmask. Iteration is in ascending code order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const fn empty() -> Self {
        ActionSet(0)
    }

    pub const fn all() -> Self {
        ActionSet(0b1111)
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= 1 << action.index();
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & (1 << action.index()) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> {
        let bits = self.0;
        Action::ALL
            .into_iter()
            .filter(move |action| bits & (1 << action.index()) != 0)
    }

    /// The `n`-th member in code order.
    pub fn nth(&self, n: usize) -> Option<Action> {
        self.iter().nth(n)
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}
