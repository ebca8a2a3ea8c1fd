//! Loss functions used to fit the Q-network to its bootstrap targets.

pub mod functions;

pub use functions::{Loss, MSE};
