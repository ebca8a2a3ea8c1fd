use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::{AgentConfig, AgentKind};
use crate::error::{Result, TheseusError};
use crate::maze::Cell;

/// Where training episodes start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StartPolicy {
    /// Every episode starts on the same cell
    Fixed(Cell),
    /// Cycle through all free cells except the exit, reshuffled after each pass
    RandomFree,
}

/// Cells the greedy evaluation rollouts start from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EvaluationScope {
    Start(Cell),
    /// Every free cell except the exit
    AllFree,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Evaluate after every `every` episodes
    pub every: usize,
    /// Number of most recent evaluations averaged by the convergence check
    pub window: usize,
    /// Averaged win rate that counts as converged
    pub threshold: f32,
    pub scope: EvaluationScope,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            every: 5,
            window: 1,
            threshold: 1.0,
            scope: EvaluationScope::AllFree,
        }
    }
}

/// Periodic agent snapshots written during training.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub path: PathBuf,
    /// Save after every `every` episodes
    pub every: usize,
}

/// Hyperparameters of a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Gamma, the weight of future rewards
    pub discount: f32,
    /// Initial epsilon
    pub exploration_rate: f32,
    /// Factor applied to epsilon after every episode
    pub exploration_decay: f32,
    /// Alpha of the tabular updates
    pub learning_rate: f32,
    /// Episode budget
    pub episodes: usize,
    pub stop_at_convergence: bool,
    pub seed: u64,
    pub start: StartPolicy,
    pub evaluation: EvaluationConfig,
    pub checkpoint: Option<CheckpointConfig>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            discount: 0.90,
            exploration_rate: 0.10,
            exploration_decay: 1.0,
            learning_rate: 0.10,
            episodes: 200,
            stop_at_convergence: false,
            seed: 0,
            start: StartPolicy::RandomFree,
            evaluation: EvaluationConfig::default(),
            checkpoint: None,
        }
    }
}

impl TrainingConfig {
    pub fn with_discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_exploration(mut self, rate: f32, decay: f32) -> Self {
        self.exploration_rate = rate;
        self.exploration_decay = decay;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn with_stop_at_convergence(mut self, stop: bool) -> Self {
        self.stop_at_convergence = stop;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_start(mut self, start: StartPolicy) -> Self {
        self.start = start;
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: CheckpointConfig) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(TheseusError::invalid_parameter(
                "discount",
                format!("must be in [0, 1], got {}", self.discount),
            ));
        }
        if !(0.0..=1.0).contains(&self.exploration_rate) {
            return Err(TheseusError::invalid_parameter(
                "exploration_rate",
                format!("must be in [0, 1], got {}", self.exploration_rate),
            ));
        }
        if !(self.exploration_decay > 0.0 && self.exploration_decay <= 1.0) {
            return Err(TheseusError::invalid_parameter(
                "exploration_decay",
                format!("must be in (0, 1], got {}", self.exploration_decay),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TheseusError::invalid_parameter(
                "learning_rate",
                format!("must be in (0, 1], got {}", self.learning_rate),
            ));
        }
        if self.episodes == 0 {
            return Err(TheseusError::invalid_parameter("episodes", "must be greater than 0"));
        }
        if self.evaluation.every == 0 {
            return Err(TheseusError::invalid_parameter("evaluation.every", "must be greater than 0"));
        }
        if self.evaluation.window == 0 {
            return Err(TheseusError::invalid_parameter("evaluation.window", "must be greater than 0"));
        }
        if !(self.evaluation.threshold > 0.0 && self.evaluation.threshold <= 1.0) {
            return Err(TheseusError::invalid_parameter(
                "evaluation.threshold",
                format!("must be in (0, 1], got {}", self.evaluation.threshold),
            ));
        }
        if let Some(checkpoint) = &self.checkpoint {
            if checkpoint.every == 0 {
                return Err(TheseusError::invalid_parameter("checkpoint.every", "must be greater than 0"));
            }
        }
        Ok(())
    }
}

/// Everything needed to train one agent, loadable from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub agent: AgentKind,
    pub agent_config: AgentConfig,
    pub training: TrainingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            agent: AgentKind::QLearning,
            agent_config: AgentConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.agent_config.validate()?;
        self.training.validate()
    }
}
