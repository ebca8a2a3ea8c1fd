//! # Optimizers
//!
//! Parameter update rules for the Q-network. Updates are addressed by layer
//! index so stateful optimizers keep one set of moments per layer; `step()`
//! is called once per minibatch, after every layer has been updated.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TheseusError};

pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);

    /// Advance the optimizer's internal clock after a full minibatch update.
    fn step(&mut self) {}
}

/// Serializable choice of optimizer, resolved against the layer shapes by
/// [`OptimizerWrapper::from_config`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum OptimizerConfig {
    SGD,
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if let OptimizerConfig::Adam { beta1, beta2, epsilon } = *self {
            if !(0.0..1.0).contains(&beta1) || !(0.0..1.0).contains(&beta2) {
                return Err(TheseusError::invalid_parameter(
                    "optimizer",
                    format!("Adam betas must be in [0, 1), got {} and {}", beta1, beta2),
                ));
            }
            if !(epsilon > 0.0) {
                return Err(TheseusError::invalid_parameter(
                    "optimizer",
                    format!("Adam epsilon must be positive, got {}", epsilon),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    /// Build the optimizer for layers with the given `(inputs, outputs)` shapes.
    pub fn from_config(config: &OptimizerConfig, shapes: &[(usize, usize)]) -> Self {
        match *config {
            OptimizerConfig::SGD => OptimizerWrapper::SGD(SGD::new()),
            OptimizerConfig::Adam { beta1, beta2, epsilon } => {
                OptimizerWrapper::Adam(Adam::new(shapes, beta1, beta2, epsilon))
            }
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with bias-corrected first and second moments per layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// 1-based count of minibatch updates
    pub t: usize,
}

impl Adam {
    pub fn new(shapes: &[(usize, usize)], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: shapes.iter().map(|&shape| Array2::zeros(shape)).collect(),
            v_weights: shapes.iter().map(|&shape| Array2::zeros(shape)).collect(),
            m_biases: shapes.iter().map(|&(_, out)| Array1::zeros(out)).collect(),
            v_biases: shapes.iter().map(|&(_, out)| Array1::zeros(out)).collect(),
            t: 1,
        }
    }

    fn corrections(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];

        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + epsilon));
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];

        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + epsilon));
    }

    fn step(&mut self) {
        self.t += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sgd_moves_against_gradient() {
        let mut sgd = SGD::new();
        let mut weights = array![[1.0, 2.0]];
        sgd.update_weights(0, &mut weights, &array![[1.0, -1.0]], 0.5);
        assert_eq!(weights, array![[0.5, 2.5]]);
    }

    #[test]
    fn test_adam_first_step_is_learning_rate_sized() {
        let mut adam = Adam::new(&[(1, 2)], 0.9, 0.999, 1e-8);
        let mut weights = array![[0.0, 0.0]];
        let mut biases = array![0.0, 0.0];
        adam.update_weights(0, &mut weights, &array![[4.0, -0.5]], 0.01);
        adam.update_biases(0, &mut biases, &array![2.0, 0.0], 0.01);
        adam.step();

        assert!((weights[[0, 0]] + 0.01).abs() < 1e-5);
        assert!((weights[[0, 1]] - 0.01).abs() < 1e-5);
        assert!((biases[0] + 0.01).abs() < 1e-5);
        assert_eq!(biases[1], 0.0);
        assert_eq!(adam.t, 2);
    }

    #[test]
    fn test_adam_config_validation() {
        assert!(OptimizerConfig::default().validate().is_ok());
        let bad = OptimizerConfig::Adam { beta1: 1.0, beta2: 0.999, epsilon: 1e-8 };
        assert!(bad.validate().is_err());
    }
}
