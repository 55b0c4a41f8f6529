//! # Job Messages
//!
//! Wire format of the jobs published to the ingest subscription:
//!
//! ```json
//! {"job_id": 1, "utility_account_id": 5, "job_type": "FULL_PIPELINE",
//!  "customer_id": 9, "artifact_path": "raw/bills/1.txt"}
//! ```
//!
//! `job_type` stays a plain string on the wire so an unknown type still
//! decodes and reaches the handler, which fails the job explicitly.

use super::MessagingError;
use crate::models::JobType;
use serde::{Deserialize, Serialize};

/// Message describing one queued job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: i64,
    pub utility_account_id: i64,
    pub job_type: String,
    /// Overrides the account's customer when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    /// Raw bill location for PARSE_BILL jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
}

impl JobMessage {
    pub fn new(job_id: i64, utility_account_id: i64, job_type: JobType) -> Self {
        Self {
            job_id,
            utility_account_id,
            job_type: job_type.as_str().to_string(),
            customer_id: None,
            artifact_path: None,
        }
    }

    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_artifact_path(mut self, artifact_path: impl Into<String>) -> Self {
        self.artifact_path = Some(artifact_path.into());
        self
    }

    pub fn decode(payload: &[u8]) -> Result<Self, MessagingError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self)
            .map_err(|e| MessagingError::message_serialization(e.to_string()))
    }

    /// Typed job type, or the parse error for an unsupported one
    pub fn parsed_job_type(&self) -> Result<JobType, String> {
        self.job_type.parse()
    }
}
