//! Error types for the Vitrine personalization engine
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for error propagation.
//!
//! Most of the engine never surfaces these errors to callers: cache reads
//! degrade to "absent", remote failures fall back to local state, and
//! fire-and-forget writes swallow and log. The variants below exist for
//! the seams where a failure is still meaningful (device store setup,
//! collaborator implementations, configuration loading).

use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Local device store operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Remote collaborator call failed (catalog, preferences, interactions)
    #[error("Remote error: {0}")]
    Remote(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Convert anyhow::Error to EngineError
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Remote("catalog unavailable".to_string());
        assert_eq!(err.to_string(), "Remote error: catalog unavailable");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: EngineError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, EngineError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
