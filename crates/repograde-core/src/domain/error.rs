//! Domain-level error taxonomy for repograde.

use chat_endpoint::ChatError;

use crate::recovery::RecoveryError;

/// repograde domain errors.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("repository root not found: {0}")]
    RootNotFound(String),

    #[error("invalid prompt template: {0}")]
    InvalidTemplate(String),

    #[error("chat endpoint error: {0}")]
    Chat(#[from] ChatError),

    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for repograde domain operations.
pub type Result<T> = std::result::Result<T, GradeError>;
