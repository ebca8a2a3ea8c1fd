//! # Theseus - Maze-Solving Reinforcement Learning
//!
//! Theseus trains agents to find the exit of a grid maze and compares how fast
//! different reinforcement-learning algorithms get there. The maze is a small
//! deterministic Markov decision process: the state is the agent's cell, the
//! actions are the four moves, and the reward bands favour short paths to the
//! exit.
//!
//! ## Key Features
//!
//! - **Tabular agents**: Q-learning and SARSA, each with and without eligibility traces
//! - **Replay agent**: a Q-network fitted on minibatches from a replay memory
//! - **Training loop**: epsilon-greedy exploration with decay, periodic greedy
//!   evaluation and a windowed convergence rule
//! - **Reproducible**: every random draw comes from a seeded generator
//! - **Persistence**: agents save and load with bincode, statistics as JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use theseus::agent::{Agent, QTableAgent};
//! use theseus::maze::{MazeEnvironment, MazeLayout};
//! use theseus::training::TrainingConfig;
//!
//! let layout: MazeLayout = "\
//! S.#..
//! .....
//! .#.#.
//! .#..E
//! "
//! .parse()
//! .unwrap();
//! let exit = layout.exit.unwrap();
//! let start = layout.start.unwrap();
//! let mut env = MazeEnvironment::new(layout.grid, exit).unwrap();
//!
//! let mut agent = QTableAgent::new(&env);
//! let report = agent.train(&mut env, &TrainingConfig::default()).unwrap();
//! println!("{:?} after {} episodes", report.termination, report.episodes_run);
//! println!("first move from {}: {}", start, agent.predict(start));
//! ```
//!
//! ## Module Organization
//!
//! - [`maze`] - Grid, actions and the maze environment
//! - [`policy`] - Epsilon-greedy action selection
//! - [`agent`] - The agent trait and its implementations
//! - [`training`] - Episode loop, evaluation, playback and comparisons
//! - [`metrics`] - Per-episode training statistics
//! - [`network`] - Feed-forward network behind the replay agent
//! - [`layers`] - Dense layers and weight initialisation
//! - [`activations`] - Activation functions (ReLU, Tanh, etc.)
//! - [`optimizer`] - SGD and Adam
//! - [`loss`] - Loss functions for training
//! - [`replay_buffer`] - Bounded experience memory
//! - [`error`] - Error types and result handling

pub mod activations;
pub mod agent;
pub mod error;
pub mod layers;
pub mod loss;
pub mod maze;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod policy;
pub mod replay_buffer;
pub mod training;

#[cfg(test)]
mod tests;
