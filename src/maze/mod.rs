//! # Maze Module
//!
//! The maze navigation task as a Markov decision process.
//!
//! - **State**: the agent's [`Cell`]
//! - **Actions**: [`Action::Left`], [`Action::Right`], [`Action::Up`], [`Action::Down`]
//! - **Rewards**: see [`RewardConfig`]; reaching the exit pays, every other
//!   move costs, revisits and bumps cost more
//! - **Termination**: the exit is reached or the step budget runs out
//!
//! Maze generation and drawing happen elsewhere. A maze enters the crate as a
//! [`Grid`], either built directly or parsed from a text [`MazeLayout`].

pub mod action;
pub mod environment;
pub mod grid;

pub use action::{Action, ActionSet};
pub use environment::{GameStatus, MazeEnvironment, MazeView, RewardConfig, StepOutcome};
pub use grid::{Cell, CellState, Grid, MazeLayout};
