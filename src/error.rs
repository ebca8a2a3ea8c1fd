use std::fmt;

/// Result type for theseus operations
pub type Result<T> = std::result::Result<T, TheseusError>;

/// Main error type for the theseus library
#[derive(Debug, Clone, PartialEq)]
pub enum TheseusError {
    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// A value update produced a non-finite number
    NumericalError(String),

    /// A training run was aborted because an update went non-finite
    NumericalInstability {
        episode: usize,
        step: usize,
        detail: String,
    },

    /// Invalid action
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// `step` was called after the episode reached a terminal state
    EpisodeFinished,
}

impl fmt::Display for TheseusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TheseusError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            TheseusError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            TheseusError::IoError(msg) => write!(f, "IO error: {}", msg),
            TheseusError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            TheseusError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            TheseusError::NumericalInstability { episode, step, detail } => {
                write!(
                    f,
                    "Numerical instability at episode {}, step {}: {}",
                    episode, step, detail
                )
            }
            TheseusError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            TheseusError::EpisodeFinished => {
                write!(f, "Episode already finished: call reset() before stepping again")
            }
        }
    }
}

impl std::error::Error for TheseusError {}

// Conversion from std::io::Error
impl From<std::io::Error> for TheseusError {
    fn from(err: std::io::Error) -> Self {
        TheseusError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for TheseusError {
    fn from(err: bincode::Error) -> Self {
        TheseusError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for TheseusError {
    fn from(err: serde_json::Error) -> Self {
        TheseusError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl TheseusError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        TheseusError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        TheseusError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Attach the position in the training run to an agent-level numerical error.
    pub fn at_step(self, episode: usize, step: usize) -> Self {
        match self {
            TheseusError::NumericalError(detail) => {
                TheseusError::NumericalInstability { episode, step, detail }
            }
            other => other,
        }
    }
}

/// Fail with a `NumericalError` when `value` is NaN or infinite.
pub(crate) fn ensure_finite(value: f32, what: &str) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TheseusError::NumericalError(format!("{} became {}", what, value)))
    }
}
