//! Error taxonomy for the learning and routing core.

use uuid::Uuid;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the skill-discovery core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Pattern not found: {0}")]
    NotFound(Uuid),

    /// Persisted Fisher matrix does not match the store dimension.
    /// The matrix is reset before this error is reported.
    #[error("Corrupt Fisher matrix: expected {expected} bytes, got {actual}")]
    CorruptMatrix { expected: usize, actual: usize },

    /// Persisted embedding blob decodes to the wrong dimension.
    #[error("Corrupt embedding: expected dimension {expected}, got {actual}")]
    CorruptEmbedding { expected: usize, actual: usize },

    #[error("Routing error: {0}")]
    Routing(String),

    /// Primary executor failed and fallback was disabled or also failed.
    #[error("Execution failed on expert '{expert_id}': {message}")]
    ExecutorFailed { expert_id: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is recoverable (can retry with backoff)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Transient classes: worth another attempt
            Error::Storage(_) | Error::Fetch(_) | Error::RateLimitExceeded(_) | Error::Io(_) => {
                true
            }
            // Corrupt state is handled by reset, not retry
            Error::CorruptMatrix { .. } | Error::CorruptEmbedding { .. } => false,
            // Invariant violations and terminal failures
            Error::NotFound(_)
            | Error::Routing(_)
            | Error::ExecutorFailed { .. }
            | Error::InvalidInput(_)
            | Error::InvalidState(_)
            | Error::Configuration(_)
            | Error::Serialization(_) => false,
        }
    }

    /// Check if this error indicates corrupt persisted state
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptMatrix { .. } | Error::CorruptEmbedding { .. }
        )
    }
}
