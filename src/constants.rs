//! # System Constants
//!
//! Operational boundaries of the bill ingestion orchestrator: retry budget,
//! error truncation, storage layout and the fixed messages written to job
//! records.

/// Default number of processing attempts before a job is forced to FAILED
pub const DEFAULT_MAX_JOB_ATTEMPTS: u32 = 3;

/// Maximum number of characters persisted in `Job::error_message`
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Error message recorded when the retry budget is exhausted
pub const RETRY_LIMIT_EXCEEDED_MESSAGE: &str = "Exceeded retry limit";

/// Artifact type tag for raw bills uploaded by the ingest stage
pub const RAW_BILL_ARTIFACT_TYPE: &str = "raw_bill";

/// Prefix under which raw bills are stored in the object store
pub const RAW_BILL_PREFIX: &str = "raw/bills";

/// Provider whose connector also serves providers with no registered connector
pub const DEFAULT_PROVIDER: &str = "MOCK_A";

/// Deterministic object path for the raw bill fetched by a job
pub fn raw_bill_path(job_id: i64) -> String {
    format!("{RAW_BILL_PREFIX}/{job_id}.txt")
}

/// Truncate an error text to [`MAX_ERROR_MESSAGE_CHARS`] characters.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn truncate_error_message(message: &str) -> String {
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

/// Queue and storage identifiers used when nothing is configured
pub mod defaults {
    pub const SUBSCRIPTION: &str = "bill-ingest-jobs";
    pub const STORAGE_BUCKET: &str = "billflow-raw-bills";
    pub const STAGE_TIMEOUT_SECS: u64 = 120;
    pub const MAX_CONCURRENT_MESSAGES: usize = 4;
    pub const VISIBILITY_TIMEOUT_SECS: u64 = 300;
    pub const POLL_INTERVAL_MS: u64 = 500;
    pub const RECEIVE_BATCH_SIZE: usize = 10;
}
