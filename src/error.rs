//! Crate-level error type.
//!
//! Layer-specific errors (`MessagingError`, `StoreError`, `ExtractionError`, ...)
//! live next to the code that raises them and convert into [`BillflowError`]
//! at the outer boundaries (configuration loading, worker bootstrap).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillflowError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Messaging error: {0}")]
    MessagingError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Extraction error: {0}")]
    ExtractionError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<serde_json::Error> for BillflowError {
    fn from(error: serde_json::Error) -> Self {
        BillflowError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

impl From<sqlx::Error> for BillflowError {
    fn from(err: sqlx::Error) -> Self {
        BillflowError::DatabaseError(err.to_string())
    }
}

impl From<config::ConfigError> for BillflowError {
    fn from(err: config::ConfigError) -> Self {
        BillflowError::ConfigurationError(err.to_string())
    }
}

impl From<crate::messaging::MessagingError> for BillflowError {
    fn from(error: crate::messaging::MessagingError) -> Self {
        BillflowError::MessagingError(error.to_string())
    }
}

impl From<crate::persistence::StoreError> for BillflowError {
    fn from(error: crate::persistence::StoreError) -> Self {
        BillflowError::DatabaseError(error.to_string())
    }
}

impl From<crate::persistence::ObjectStoreError> for BillflowError {
    fn from(error: crate::persistence::ObjectStoreError) -> Self {
        BillflowError::StorageError(error.to_string())
    }
}

impl From<crate::extraction::ExtractionError> for BillflowError {
    fn from(error: crate::extraction::ExtractionError) -> Self {
        BillflowError::ExtractionError(error.to_string())
    }
}

impl From<crate::state_machine::StateMachineError> for BillflowError {
    fn from(error: crate::state_machine::StateMachineError) -> Self {
        BillflowError::StateTransitionError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BillflowError>;
