//! # Maze Agents Module
//!
//! Agents that learn to reach the exit of a maze. All of them implement the
//! [`Agent`] trait, so the trainer, evaluation rollouts and the command-line
//! tool treat them uniformly.
//!
//! ## Available Agents
//!
//! - **QTableAgent**: tabular Q-learning, bootstrapping from the best next action
//! - **QTableTraceAgent**: Q-learning with eligibility traces
//! - **SarsaTableAgent**: tabular SARSA, bootstrapping from the next action actually taken
//! - **SarsaTableTraceAgent**: SARSA with eligibility traces
//! - **ReplayAgent**: a Q-network trained on minibatches drawn from a replay memory
//! - **RandomAgent**: uniform random baseline
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use theseus::agent::{Agent, QTableAgent};
//! use theseus::maze::{MazeEnvironment, MazeLayout};
//! use theseus::training::TrainingConfig;
//!
//! let layout: MazeLayout = "S..\n.#.\n..E".parse().unwrap();
//! let exit = layout.exit.unwrap();
//! let mut env = MazeEnvironment::new(layout.grid, exit).unwrap();
//!
//! let mut agent = QTableAgent::new(&env);
//! let report = agent.train(&mut env, &TrainingConfig::default()).unwrap();
//! println!("{} episodes, win rate {:?}", report.episodes_run, report.win_history().last());
//! ```

pub mod q_table;
pub mod q_table_trace;
pub mod random;
pub mod replay;
pub mod sarsa_table;
pub mod sarsa_table_trace;
pub mod table;
pub mod traits;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TheseusError};
use crate::maze::MazeEnvironment;

pub use q_table::QTableAgent;
pub use q_table_trace::QTableTraceAgent;
pub use random::RandomAgent;
pub use replay::{ReplayAgent, ReplayConfig};
pub use sarsa_table::SarsaTableAgent;
pub use sarsa_table_trace::SarsaTableTraceAgent;
pub use table::{TraceKind, TraceTable, ValueTable};
pub use traits::{Agent, Transition, UpdateParams};

/// Which learning algorithm to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    QLearning,
    QLearningTrace,
    Sarsa,
    SarsaTrace,
    Replay,
    Random,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::QLearning,
        AgentKind::QLearningTrace,
        AgentKind::Sarsa,
        AgentKind::SarsaTrace,
        AgentKind::Replay,
        AgentKind::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::QLearning => "q-learning",
            AgentKind::QLearningTrace => "q-learning-trace",
            AgentKind::Sarsa => "sarsa",
            AgentKind::SarsaTrace => "sarsa-trace",
            AgentKind::Replay => "replay",
            AgentKind::Random => "random",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = TheseusError;

    fn from_str(s: &str) -> Result<Self> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| {
                TheseusError::invalid_parameter(
                    "agent",
                    format!(
                        "unknown agent '{}', expected one of: {}",
                        s,
                        AgentKind::ALL.map(|kind| kind.as_str()).join(", ")
                    ),
                )
            })
    }
}

/// Agent-specific settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Lambda of the trace agents
    pub trace_decay: f32,
    pub trace_kind: TraceKind,
    pub replay: ReplayConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            trace_decay: QTableTraceAgent::DEFAULT_TRACE_DECAY,
            trace_kind: TraceKind::default(),
            replay: ReplayConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        validate_trace_decay(self.trace_decay)?;
        self.replay.validate()
    }
}

pub(crate) fn validate_trace_decay(trace_decay: f32) -> Result<f32> {
    if !(0.0..=1.0).contains(&trace_decay) {
        return Err(TheseusError::invalid_parameter(
            "trace_decay",
            format!("must be in [0, 1], got {}", trace_decay),
        ));
    }
    Ok(trace_decay)
}

/// Build a fresh agent of `kind` for `env`.
pub fn build(kind: AgentKind, env: &MazeEnvironment, config: &AgentConfig) -> Result<Box<dyn Agent>> {
    config.validate()?;
    let agent: Box<dyn Agent> = match kind {
        AgentKind::QLearning => Box::new(QTableAgent::new(env)),
        AgentKind::QLearningTrace => {
            Box::new(QTableTraceAgent::new(env).with_traces(config.trace_decay, config.trace_kind)?)
        }
        AgentKind::Sarsa => Box::new(SarsaTableAgent::new(env)),
        AgentKind::SarsaTrace => {
            Box::new(SarsaTableTraceAgent::new(env).with_traces(config.trace_decay, config.trace_kind)?)
        }
        AgentKind::Replay => Box::new(ReplayAgent::with_config(env, config.replay.clone())?),
        AgentKind::Random => Box::new(RandomAgent::with_seed(env, config.replay.seed)),
    };
    Ok(agent)
}

/// Load an agent of `kind` saved with [`Agent::save`].
pub fn load<P: AsRef<Path>>(
    kind: AgentKind,
    path: P,
    env: &MazeEnvironment,
    config: &AgentConfig,
) -> Result<Box<dyn Agent>> {
    config.validate()?;
    let path = path.as_ref();
    let agent: Box<dyn Agent> = match kind {
        AgentKind::QLearning => Box::new(QTableAgent::load(path, env)?),
        AgentKind::QLearningTrace => {
            Box::new(QTableTraceAgent::load(path, env)?.with_traces(config.trace_decay, config.trace_kind)?)
        }
        AgentKind::Sarsa => Box::new(SarsaTableAgent::load(path, env)?),
        AgentKind::SarsaTrace => {
            Box::new(SarsaTableTraceAgent::load(path, env)?.with_traces(config.trace_decay, config.trace_kind)?)
        }
        AgentKind::Replay => Box::new(ReplayAgent::load_with_config(path, env, config.replay.clone())?),
        AgentKind::Random => Box::new(RandomAgent::load(path, env)?),
    };
    Ok(agent)
}
