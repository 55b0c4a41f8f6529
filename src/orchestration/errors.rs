//! # Stage Errors
//!
//! Every failure a pipeline stage can raise, with its reason code and whether
//! redelivery could help.

use crate::connectors::ConnectorError;
use crate::extraction::ExtractionError;
use crate::models::FailureReason;
use crate::persistence::{FanoutError, ObjectStoreError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fanout(#[from] FanoutError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Raw bill at {path} is not valid UTF-8: {message}")]
    InvalidUtf8 { path: String, message: String },

    #[error("Failed to serialize normalized bill: {message}")]
    Serialization { message: String },

    #[error("No artifact recorded for utility account {utility_account_id}")]
    ArtifactNotFound { utility_account_id: i64 },

    #[error("Utility account {utility_account_id} not found")]
    AccountNotFound { utility_account_id: i64 },

    #[error("Unsupported job type: {job_type}")]
    UnsupportedJobType { job_type: String },

    #[error("Stage {stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

impl StageError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Extraction(_) => FailureReason::Extraction,
            Self::ArtifactNotFound { .. }
            | Self::AccountNotFound { .. }
            | Self::ObjectStore(ObjectStoreError::NotFound { .. }) => FailureReason::NotFound,
            Self::UnsupportedJobType { .. } => FailureReason::UnsupportedJobType,
            Self::Timeout { .. } => FailureReason::Timeout,
            Self::Connector(_)
            | Self::ObjectStore(_)
            | Self::Store(_)
            | Self::Fanout(_)
            | Self::InvalidUtf8 { .. }
            | Self::Serialization { .. } => FailureReason::Infrastructure,
        }
    }

    /// Whether the message should be redelivered after this failure.
    ///
    /// Missing records, missing raw bill objects and unsupported job types
    /// cannot change between deliveries; everything else is retried within
    /// the attempt budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ArtifactNotFound { .. }
                | Self::AccountNotFound { .. }
                | Self::ObjectStore(ObjectStoreError::NotFound { .. })
                | Self::UnsupportedJobType { .. }
        )
    }
}
