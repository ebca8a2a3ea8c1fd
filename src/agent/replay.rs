use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayViewMut1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::table::check_dimensions;
use super::traits::{Agent, Transition, UpdateParams};
use crate::activations::Activation;
use crate::error::{Result, TheseusError};
use crate::layers::WeightInit;
use crate::maze::{Action, Cell, Grid, MazeEnvironment};
use crate::network::NeuralNetwork;
use crate::optimizer::OptimizerConfig;
use crate::policy::{self, ActionValues};
use crate::replay_buffer::ReplayBuffer;

/// Settings of the replay-memory Q-network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Transitions kept in memory
    pub capacity: usize,
    pub batch_size: usize,
    /// Gradient steps after every observed transition
    pub updates_per_step: usize,
    /// Step size of the network optimizer
    pub learning_rate: f32,
    /// Hidden layer widths; `None` means two layers as wide as the grid has cells
    pub hidden_layers: Option<Vec<usize>>,
    /// Non-linearity of the hidden layers; the output layer is always linear
    pub hidden_activation: Activation,
    pub optimizer: OptimizerConfig,
    /// Seeds weight initialisation and minibatch sampling
    pub seed: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            capacity: 1000,
            batch_size: 32,
            updates_per_step: 1,
            learning_rate: 0.001,
            hidden_layers: None,
            hidden_activation: Activation::Relu,
            optimizer: OptimizerConfig::default(),
            seed: 0,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(TheseusError::invalid_parameter("capacity", "must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(TheseusError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        if self.batch_size > self.capacity {
            return Err(TheseusError::invalid_parameter(
                "batch_size",
                format!("{} exceeds the memory capacity {}", self.batch_size, self.capacity),
            ));
        }
        if self.updates_per_step == 0 {
            return Err(TheseusError::invalid_parameter("updates_per_step", "must be greater than 0"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TheseusError::invalid_parameter(
                "learning_rate",
                format!("must be finite and positive, got {}", self.learning_rate),
            ));
        }
        if let Some(hidden) = &self.hidden_layers {
            if hidden.iter().any(|&size| size == 0) {
                return Err(TheseusError::invalid_parameter("hidden_layers", "layer sizes must be positive"));
            }
        }
        if let Activation::LeakyRelu { alpha } = self.hidden_activation {
            if !(alpha.is_finite() && (0.0..1.0).contains(&alpha)) {
                return Err(TheseusError::invalid_parameter(
                    "hidden_activation",
                    format!("leaky ReLU slope must be in [0, 1), got {}", alpha),
                ));
            }
        }
        self.optimizer.validate()
    }

    fn layer_sizes(&self, grid: &Grid) -> Vec<usize> {
        let inputs = grid.size();
        let hidden = self.hidden_layers.clone().unwrap_or_else(|| vec![inputs, inputs]);
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(inputs);
        sizes.extend(hidden);
        sizes.push(Action::COUNT);
        sizes
    }
}

#[derive(Serialize, Deserialize)]
struct NetworkSnapshot {
    width: usize,
    height: usize,
    network: NeuralNetwork,
}

/// Q-network trained from a replay memory.
///
/// Cells are one-hot encoded. Every observed transition is stored; once the
/// memory holds a full minibatch, each step samples one uniformly and moves
/// the network toward the Q-learning targets of the sampled transitions.
#[derive(Clone, Debug)]
pub struct ReplayAgent {
    grid: Arc<Grid>,
    network: NeuralNetwork,
    memory: ReplayBuffer<Transition>,
    config: ReplayConfig,
    rng: StdRng,
    last_loss: Option<f32>,
}

impl ReplayAgent {
    pub fn new(env: &MazeEnvironment) -> Result<Self> {
        Self::with_config(env, ReplayConfig::default())
    }

    pub fn with_config(env: &MazeEnvironment, config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        let grid = env.shared_grid();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let sizes = config.layer_sizes(&grid);
        let mut activations = vec![config.hidden_activation; sizes.len() - 2];
        activations.push(Activation::Linear);
        let init = WeightInit::for_activation(&config.hidden_activation);
        let network = NeuralNetwork::new(&sizes, &activations, &config.optimizer, init, &mut rng)?;

        Ok(ReplayAgent {
            grid,
            network,
            memory: ReplayBuffer::new(config.capacity)?,
            config,
            rng,
            last_loss: None,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P, env: &MazeEnvironment) -> Result<Self> {
        Self::load_with_config(path, env, ReplayConfig::default())
    }

    /// Restore a saved network; memory and sampling state start fresh from `config`.
    pub fn load_with_config<P: AsRef<Path>>(path: P, env: &MazeEnvironment, config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        let grid = env.shared_grid();
        let data = std::fs::read(path.as_ref())?;
        let snapshot: NetworkSnapshot = bincode::deserialize(&data)?;
        check_dimensions(&grid, snapshot.width, snapshot.height)?;
        if snapshot.network.input_size() != grid.size() || snapshot.network.output_size() != Action::COUNT {
            return Err(TheseusError::dimension_mismatch(
                format!("{} -> {} network", grid.size(), Action::COUNT),
                format!(
                    "{} -> {} network",
                    snapshot.network.input_size(),
                    snapshot.network.output_size()
                ),
            ));
        }

        Ok(ReplayAgent {
            grid,
            network: snapshot.network,
            memory: ReplayBuffer::new(config.capacity)?,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            last_loss: None,
        })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    pub fn memory(&self) -> &ReplayBuffer<Transition> {
        &self.memory
    }

    /// Store a transition without training.
    pub fn remember(&mut self, transition: Transition) {
        self.memory.add(transition);
    }

    fn encode_into(&self, cell: Cell, mut row: ArrayViewMut1<f32>) {
        if let Some(index) = self.grid.index_of(cell) {
            row[index] = 1.0;
        }
    }

    fn encode(&self, cell: Cell) -> Array1<f32> {
        let mut input = Array1::zeros(self.grid.size());
        self.encode_into(cell, input.view_mut());
        input
    }

    /// One gradient step on a sampled minibatch.
    fn replay(&mut self, discount: f32) -> Result<f32> {
        let batch: Vec<Transition> = self
            .memory
            .sample(self.config.batch_size, &mut self.rng)
            .into_iter()
            .copied()
            .collect();

        let inputs = self.grid.size();
        let mut states = Array2::zeros((batch.len(), inputs));
        let mut next_states = Array2::zeros((batch.len(), inputs));
        for (i, transition) in batch.iter().enumerate() {
            self.encode_into(transition.state, states.row_mut(i));
            self.encode_into(transition.next_state, next_states.row_mut(i));
        }

        let mut targets = self.network.predict_batch(states.view());
        let next_values = self.network.predict_batch(next_states.view());

        for (i, transition) in batch.iter().enumerate() {
            let target = if transition.done {
                transition.reward
            } else {
                let row = next_values.row(i);
                let next: ActionValues = [row[0], row[1], row[2], row[3]];
                transition.reward + discount * policy::greedy_value(&next, transition.next_actions)
            };
            targets[[i, transition.action.index()]] = target;
        }

        self.network
            .train_minibatch(states.view(), targets.view(), self.config.learning_rate)
    }
}

impl Agent for ReplayAgent {
    fn name(&self) -> &str {
        "replay-network"
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn q_values(&self, cell: Cell) -> ActionValues {
        let output = self.network.predict(self.encode(cell).view());
        let mut values = [0.0; Action::COUNT];
        for (value, &out) in values.iter_mut().zip(output.iter()) {
            *value = out;
        }
        values
    }

    fn observe(&mut self, transition: &Transition, _next_action: Option<Action>, params: &UpdateParams) -> Result<()> {
        self.remember(*transition);
        self.last_loss = None;
        if self.memory.len() < self.config.batch_size {
            return Ok(());
        }

        let mut total = 0.0;
        for _ in 0..self.config.updates_per_step {
            total += self.replay(params.discount)?;
        }
        self.last_loss = Some(total / self.config.updates_per_step as f32);
        Ok(())
    }

    fn last_loss(&self) -> Option<f32> {
        self.last_loss
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot = NetworkSnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            network: self.network.clone(),
        };
        std::fs::write(path, bincode::serialize(&snapshot)?)?;
        Ok(())
    }
}
