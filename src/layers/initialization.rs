use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    XavierUniform,

    /// He/Kaiming uniform initialization (for ReLU)
    HeUniform,

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix from `rng`.
    pub fn initialize_weights<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Array2<f32> {
        let (fan_in, fan_out) = shape;

        match self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }

            WeightInit::HeUniform => {
                let limit = (6.0 / fan_in as f32).sqrt();
                Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }

            WeightInit::Zeros => Array2::zeros(shape),
        }
    }

    /// Biases always start at zero.
    pub fn initialize_biases(&self, size: usize) -> Array1<f32> {
        Array1::zeros(size)
    }

    /// He for the ReLU family, Xavier for the rest.
    pub fn for_activation(activation: &Activation) -> Self {
        match activation {
            Activation::Relu | Activation::LeakyRelu { .. } => WeightInit::HeUniform,
            Activation::Tanh | Activation::Linear => WeightInit::XavierUniform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_he_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = WeightInit::HeUniform.initialize_weights((24, 8), &mut rng);
        let limit = (6.0f32 / 24.0).sqrt();
        assert_eq!(weights.dim(), (24, 8));
        assert!(weights.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = WeightInit::XavierUniform.initialize_weights((5, 5), &mut StdRng::seed_from_u64(1));
        let b = WeightInit::XavierUniform.initialize_weights((5, 5), &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
