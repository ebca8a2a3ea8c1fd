use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{ensure_finite, Result, TheseusError};
use crate::layers::{DenseLayer, WeightInit};
use crate::loss::{Loss, MSE};
use crate::optimizer::{Optimizer, OptimizerConfig, OptimizerWrapper};

/// A feed-forward network of dense layers trained with minibatch gradient descent.
///
/// The network maps a state encoding to one value per action. It owns the
/// optimizer state so saving the network also saves the optimizer moments.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
    pub optimizer: OptimizerWrapper,
}

impl NeuralNetwork {
    /// Create a network with the given layer sizes and one activation per layer.
    ///
    /// `layer_sizes` includes the input size, so `activations.len()` must be
    /// `layer_sizes.len() - 1`.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        optimizer: &OptimizerConfig,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(TheseusError::invalid_parameter(
                "layer_sizes",
                "need at least an input and an output size",
            ));
        }
        if layer_sizes.len() - 1 != activations.len() {
            return Err(TheseusError::dimension_mismatch(
                format!("{} activations", layer_sizes.len() - 1),
                format!("{} activations", activations.len()),
            ));
        }
        if layer_sizes.iter().any(|&size| size == 0) {
            return Err(TheseusError::invalid_parameter("layer_sizes", "layer sizes must be positive"));
        }
        optimizer.validate()?;

        let layers: Vec<DenseLayer> = layer_sizes
            .windows(2)
            .zip(activations.iter())
            .map(|(window, &activation)| DenseLayer::new(window[0], window[1], activation, init, rng))
            .collect();
        let shapes: Vec<(usize, usize)> = layers.iter().map(|layer| layer.weights.dim()).collect();

        Ok(NeuralNetwork {
            layers,
            optimizer: OptimizerWrapper::from_config(optimizer, &shapes),
        })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    /// Outputs for a single input vector.
    pub fn predict(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let mut output = input.to_owned();
        for layer in &self.layers {
            output = layer.predict(output.view());
        }
        output
    }

    /// Outputs for a batch of input rows.
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut output = inputs.to_owned();
        for layer in &self.layers {
            output = layer.predict_batch(output.view());
        }
        output
    }

    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &mut self.layers {
            current_output = layer.forward_batch(current_output.view());
        }
        current_output
    }

    /// Gradients for every layer, input layer first.
    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_batch(current_error.view())?;
            gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }

        gradients.reverse();
        Ok(gradients)
    }

    /// One gradient step on a minibatch, returning the loss before the step.
    ///
    /// Fails with `NumericalError` when the loss, an updated parameter or the
    /// updated outputs on `inputs` are not finite; the layers and the optimizer
    /// state are restored to their pre-step values in that case.
    pub fn train_minibatch(
        &mut self,
        inputs: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        learning_rate: f32,
    ) -> Result<f32> {
        if inputs.ncols() != self.input_size() {
            return Err(TheseusError::dimension_mismatch(
                format!("{} input columns", self.input_size()),
                format!("{} input columns", inputs.ncols()),
            ));
        }
        if targets.dim() != (inputs.nrows(), self.output_size()) {
            return Err(TheseusError::dimension_mismatch(
                format!("{:?}", (inputs.nrows(), self.output_size())),
                format!("{:?}", targets.dim()),
            ));
        }

        let outputs = self.forward_batch(inputs);
        let loss = ensure_finite(MSE.compute_batch(outputs.view(), targets), "network loss")?;
        let output_errors = MSE.gradient_batch(outputs.view(), targets);
        let gradients = self.backward_batch(output_errors.view())?;

        let saved_layers = self.layers.clone();
        let saved_optimizer = self.optimizer.clone();
        for (index, (layer, (weight_gradients, bias_gradients))) in
            self.layers.iter_mut().zip(gradients).enumerate()
        {
            self.optimizer
                .update_weights(index, &mut layer.weights, &weight_gradients, learning_rate);
            self.optimizer
                .update_biases(index, &mut layer.biases, &bias_gradients, learning_rate);
        }
        self.optimizer.step();

        if let Err(err) = self.check_finite(inputs) {
            self.layers = saved_layers;
            self.optimizer = saved_optimizer;
            return Err(err);
        }
        Ok(loss)
    }

    fn check_finite(&self, inputs: ArrayView2<f32>) -> Result<()> {
        for (index, layer) in self.layers.iter().enumerate() {
            if !layer.weights.iter().chain(layer.biases.iter()).all(|v| v.is_finite()) {
                return Err(TheseusError::NumericalError(format!(
                    "layer {} parameters became non-finite",
                    index
                )));
            }
        }
        if !self.predict_batch(inputs).iter().all(|v| v.is_finite()) {
            return Err(TheseusError::NumericalError(
                "network outputs became non-finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network(optimizer: OptimizerConfig) -> NeuralNetwork {
        let mut rng = StdRng::seed_from_u64(42);
        NeuralNetwork::new(
            &[3, 8, 2],
            &[Activation::Relu, Activation::Linear],
            &optimizer,
            WeightInit::HeUniform,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn test_shapes() {
        let net = network(OptimizerConfig::SGD);
        assert_eq!(net.input_size(), 3);
        assert_eq!(net.output_size(), 2);
        assert_eq!(net.predict(array![1.0, 0.0, 0.0].view()).len(), 2);
    }

    #[test]
    fn test_rejects_mismatched_activations() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = NeuralNetwork::new(
            &[3, 2],
            &[Activation::Relu, Activation::Linear],
            &OptimizerConfig::SGD,
            WeightInit::HeUniform,
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_training_reduces_loss() {
        for optimizer in [OptimizerConfig::SGD, OptimizerConfig::default()] {
            let mut net = network(optimizer);
            let inputs = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
            let targets = array![[1.0, -1.0], [0.5, 0.0], [-1.0, 2.0]];
            let first = net.train_minibatch(inputs.view(), targets.view(), 0.05).unwrap();
            let mut last = first;
            for _ in 0..300 {
                last = net.train_minibatch(inputs.view(), targets.view(), 0.05).unwrap();
            }
            assert!(last < first, "loss went from {} to {}", first, last);
        }
    }

    #[test]
    fn test_diverging_step_is_rolled_back() {
        let mut net = network(OptimizerConfig::SGD);
        let inputs = array![[1.0, 0.0, 0.0]];
        let targets = array![[1000.0, -1000.0]];
        let before = net.predict_batch(inputs.view());
        let weights: Vec<_> = net.layers.iter().map(|layer| layer.weights.clone()).collect();

        assert!(matches!(
            net.train_minibatch(inputs.view(), targets.view(), 1.0e36),
            Err(TheseusError::NumericalError(_))
        ));
        assert_eq!(net.predict_batch(inputs.view()), before);
        for (layer, saved) in net.layers.iter().zip(&weights) {
            assert_eq!(&layer.weights, saved);
        }

        // The restored network still trains normally.
        assert!(net.train_minibatch(inputs.view(), targets.view(), 1e-3).is_ok());
    }
}
