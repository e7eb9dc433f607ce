//! Centralized error types for Fleet.

use thiserror::Error;

/// Main error type for Fleet operations.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Instance already exists: {0}")]
    DuplicateId(String),

    #[error("Missing instance id for action '{0}'")]
    MissingId(String),

    #[error("Malformed command payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for Fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

impl FleetError {
    /// Create a missing id error for the given action.
    pub fn missing_id(action: impl Into<String>) -> Self {
        Self::MissingId(action.into())
    }
}
