//! Error types for model training and persistence.

use thiserror::Error;

/// Failures of the latent-factor model lifecycle.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Training was invoked with nothing to learn from
    #[error("Cannot train on an empty train set")]
    EmptyTrainSet,

    /// The optimizer produced a non-finite error; learning rate too high
    /// or degenerate input
    #[error("Training diverged at epoch {epoch}")]
    Diverged { epoch: usize },

    /// I/O failure while persisting or loading a model
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialized model state could not be read or written
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ModelError>;
