use ndarray::{Array2, ArrayView2};

/// Trait defining the interface for loss functions
pub trait Loss: Send + Sync {
    /// Compute the loss for a batch of predictions and targets
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32;

    /// Compute the gradient of the loss for a batch
    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32>;
}

/// Mean Squared Error loss
#[derive(Clone, Copy, Debug, Default)]
pub struct MSE;

impl Loss for MSE {
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let diff = &predictions - &targets;
        (&diff * &diff).sum() / (2.0 * predictions.shape()[0] as f32 * predictions.shape()[1] as f32)
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        (&predictions - &targets) / predictions.shape()[0] as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse_zero_when_equal() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(MSE.compute_batch(a.view(), a.view()), 0.0);
        assert_eq!(MSE.gradient_batch(a.view(), a.view()), Array2::<f32>::zeros((2, 2)));
    }

    #[test]
    fn test_mse_gradient_scaled_by_batch() {
        let predictions = array![[2.0, 0.0], [0.0, 0.0]];
        let targets = array![[0.0, 0.0], [0.0, 0.0]];
        assert_eq!(MSE.compute_batch(predictions.view(), targets.view()), 0.5);
        assert_eq!(MSE.gradient_batch(predictions.view(), targets.view()), array![[1.0, 0.0], [0.0, 0.0]]);
    }
}
