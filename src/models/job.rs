//! # Job Model
//!
//! One unit of queued bill-processing work and its lifecycle state.
//!
//! Jobs are created PENDING by an external enqueue action, mutated only by the
//! orchestrator, and never deleted here. `attempt_count` only ever grows, by
//! exactly one per accepted delivery.

use crate::state_machine::JobState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline routed by a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    /// Fetch the raw bill and store it
    IngestBill,
    /// Extract and persist a normalized bill from a stored raw bill
    ParseBill,
    /// Ingest then parse in one delivery
    FullPipeline,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IngestBill => "INGEST_BILL",
            Self::ParseBill => "PARSE_BILL",
            Self::FullPipeline => "FULL_PIPELINE",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INGEST_BILL" => Ok(Self::IngestBill),
            "PARSE_BILL" => Ok(Self::ParseBill),
            "FULL_PIPELINE" => Ok(Self::FullPipeline),
            _ => Err(format!("Unsupported job type: {s}")),
        }
    }
}

/// Typed reason code stored next to the flat error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Job, account or artifact could not be found
    NotFound,
    /// attempt_count reached the configured maximum
    RetryBudgetExceeded,
    /// LLM call failed or its output did not validate
    Extraction,
    /// Storage, warehouse, relational store or connector failure
    Infrastructure,
    /// A stage exceeded its time bound
    Timeout,
    /// Message named a job type this worker does not route
    UnsupportedJobType,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RetryBudgetExceeded => "retry_budget_exceeded",
            Self::Extraction => "extraction",
            Self::Infrastructure => "infrastructure",
            Self::Timeout => "timeout",
            Self::UnsupportedJobType => "unsupported_job_type",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found" => Ok(Self::NotFound),
            "retry_budget_exceeded" => Ok(Self::RetryBudgetExceeded),
            "extraction" => Ok(Self::Extraction),
            "infrastructure" => Ok(Self::Infrastructure),
            "timeout" => Ok(Self::Timeout),
            "unsupported_job_type" => Ok(Self::UnsupportedJobType),
            _ => Err(format!("Invalid failure reason: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    pub utility_account_id: i64,
    pub job_type: JobType,
    pub status: JobState,
    pub attempt_count: u32,
    pub error_message: Option<String>,
    pub failure_reason: Option<FailureReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A freshly enqueued job
    pub fn pending(job_id: i64, utility_account_id: i64, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            utility_account_id,
            job_type,
            status: JobState::Pending,
            attempt_count: 0,
            error_message: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update in place. Returns `false` without touching the record
    /// when the job has already SUCCEEDED.
    pub fn apply(&mut self, update: &JobUpdate, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = update.status;
        self.updated_at = now;

        if update.increment_attempt {
            self.attempt_count += 1;
        }

        match &update.error_message {
            Some(message) => {
                self.error_message = Some(message.clone());
                self.failure_reason = update.failure_reason;
            }
            None if matches!(update.status, JobState::Running | JobState::Succeeded) => {
                self.error_message = None;
                self.failure_reason = None;
            }
            None => {}
        }

        true
    }
}

/// Mutation requested on a job record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: JobState,
    /// New error text; `None` clears it when moving to RUNNING or SUCCEEDED
    pub error_message: Option<String>,
    pub failure_reason: Option<FailureReason>,
    pub increment_attempt: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_parsing() {
        assert_eq!("FULL_PIPELINE".parse::<JobType>(), Ok(JobType::FullPipeline));
        assert!("full_pipeline".parse::<JobType>().is_err());
        assert!("REFUND_BILL".parse::<JobType>().is_err());
    }

    #[test]
    fn test_apply_running_clears_error_and_counts_attempt() {
        let mut job = Job::pending(1, 5, JobType::IngestBill);
        job.status = JobState::Failed;
        job.error_message = Some("previous".to_string());
        job.failure_reason = Some(FailureReason::Extraction);

        let applied = job.apply(
            &JobUpdate {
                status: JobState::Running,
                error_message: None,
                failure_reason: None,
                increment_attempt: true,
            },
            Utc::now(),
        );

        assert!(applied);
        assert_eq!(job.attempt_count, 1);
        assert_eq!(job.error_message, None);
        assert_eq!(job.failure_reason, None);
    }

    #[test]
    fn test_apply_refused_once_succeeded() {
        let mut job = Job::pending(1, 5, JobType::IngestBill);
        job.status = JobState::Succeeded;
        job.attempt_count = 1;

        let applied = job.apply(
            &JobUpdate {
                status: JobState::Running,
                error_message: None,
                failure_reason: None,
                increment_attempt: true,
            },
            Utc::now(),
        );

        assert!(!applied);
        assert_eq!(job.status, JobState::Succeeded);
        assert_eq!(job.attempt_count, 1);
    }
}
