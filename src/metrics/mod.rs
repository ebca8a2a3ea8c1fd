//! Per-episode statistics collected while training.

pub mod tracker;

pub use tracker::{MetricsTracker, TrainingMetrics};
