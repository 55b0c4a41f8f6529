use super::WarehouseRowError;
use thiserror::Error;

/// Job store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid {field} value in stored record: {value}")]
    InvalidRecord { field: String, value: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn invalid_record(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Object store failures
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Object not found: {path}")]
    NotFound { path: String },

    #[error("Upload failed for {path}: {message}")]
    Upload { path: String, message: String },

    #[error("Download failed for {path}: {message}")]
    Download { path: String, message: String },
}

/// Analytics warehouse failures
#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Warehouse insert errors: {0:?}")]
    RowErrors(Vec<WarehouseRowError>),

    #[error("Warehouse unavailable: {message}")]
    Unavailable { message: String },
}

/// Failure in either sink of the persistence fan-out
#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("Relational write failed: {0}")]
    Relational(#[from] StoreError),

    #[error("Warehouse write failed: {0}")]
    Warehouse(#[from] WarehouseError),
}
