//! # Activation Functions Module
//!
//! Element-wise non-linearities for the dense layers of the Q-network.
//!
//! - **ReLU**: `max(0, x)`, the default for hidden layers
//! - **Linear**: identity, used for the Q-value output layer
//! - **Tanh**: bounded alternative for hidden layers
//! - **LeakyReLU**: ReLU with a small negative slope to avoid dead units

pub mod functions;

pub use functions::Activation;
