//! # Training Module
//!
//! Drives agents through episodes of the maze.
//!
//! - [`Trainer`]: the episode loop with epsilon decay, periodic greedy
//!   evaluation, the windowed convergence check, checkpoints and cooperative
//!   cancellation
//! - [`play`] and [`win_rate`]: greedy rollouts for inspection and evaluation
//! - [`compare`]: repeated runs of several agent kinds on the same maze
//!
//! ```rust,no_run
//! use theseus::agent::{self, AgentConfig, AgentKind};
//! use theseus::maze::{Cell, MazeEnvironment, MazeLayout};
//! use theseus::training::{play, StartPolicy, Trainer, TrainingConfig};
//!
//! let layout: MazeLayout = "S..\n##.\nE..".parse().unwrap();
//! let mut env = MazeEnvironment::new(layout.grid, Cell::new(0, 2)).unwrap();
//! let mut agent = agent::build(AgentKind::Sarsa, &env, &AgentConfig::default()).unwrap();
//!
//! let config = TrainingConfig::default()
//!     .with_episodes(100)
//!     .with_start(StartPolicy::Fixed(Cell::new(0, 0)));
//! let report = Trainer::new(config).unwrap().train(agent.as_mut(), &mut env).unwrap();
//! let playback = play(agent.as_ref(), &mut env, Cell::new(0, 0)).unwrap();
//! println!("{:?} after {} episodes: {:?}", report.termination, report.episodes_run, playback.status);
//! ```

pub mod comparison;
pub mod config;
pub mod evaluation;
pub mod trainer;

pub use comparison::{compare, ComparisonSummary};
pub use config::{CheckpointConfig, EvaluationConfig, EvaluationScope, RunConfig, StartPolicy, TrainingConfig};
pub use evaluation::{evaluation_starts, play, win_rate, Playback};
pub use trainer::{Termination, Trainer, TrainingReport};
