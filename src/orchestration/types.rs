//! # Orchestration Types
//!
//! Explicit results passed between the router, the handler and the worker.
//! Retry is signalled through these values, never through unwinding.

use super::StageError;
use crate::models::FailureReason;

/// Result of running the routed pipeline for one delivery
#[derive(Debug)]
pub enum StageOutcome {
    Done,
    /// Redelivery may succeed; consumes an attempt
    RetryableFailure(StageError),
    /// Redelivery cannot help
    TerminalFailure(StageError),
}

impl StageOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl<T> From<Result<T, StageError>> for StageOutcome {
    fn from(result: Result<T, StageError>) -> Self {
        match result {
            Ok(_) => Self::Done,
            Err(error) if error.is_retryable() => Self::RetryableFailure(error),
            Err(error) => Self::TerminalFailure(error),
        }
    }
}

/// What the worker does with the delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Remove the message; it is never redelivered
    Ack,
    /// Return the message to the queue for redelivery
    Nack,
}

/// How a delivery was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Nothing to update: undecodable payload or unknown job
    Dropped { reason: String },
    /// Duplicate delivery of a finished job
    AlreadySucceeded,
    /// Attempt budget spent; job marked FAILED
    RetryBudgetExceeded,
    Succeeded,
    /// Job marked FAILED with the stored (truncated) message
    Failed {
        reason: FailureReason,
        error_message: String,
        retryable: bool,
    },
    /// The job record could not be read or written; try the delivery again
    Deferred { error: String },
}

impl HandlerOutcome {
    pub fn acknowledgement(&self) -> Acknowledgement {
        match self {
            Self::Failed {
                retryable: true, ..
            }
            | Self::Deferred { .. } => Acknowledgement::Nack,
            _ => Acknowledgement::Ack,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dropped { .. } => "dropped",
            Self::AlreadySucceeded => "already_succeeded",
            Self::RetryBudgetExceeded => "retry_budget_exceeded",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Deferred { .. } => "deferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledgement_mapping() {
        let retryable = HandlerOutcome::Failed {
            reason: FailureReason::Extraction,
            error_message: "bad json".to_string(),
            retryable: true,
        };
        let terminal = HandlerOutcome::Failed {
            reason: FailureReason::UnsupportedJobType,
            error_message: "Unsupported job type: X".to_string(),
            retryable: false,
        };

        assert_eq!(retryable.acknowledgement(), Acknowledgement::Nack);
        assert_eq!(terminal.acknowledgement(), Acknowledgement::Ack);
        assert_eq!(
            HandlerOutcome::Deferred {
                error: "db down".to_string()
            }
            .acknowledgement(),
            Acknowledgement::Nack
        );
        assert_eq!(
            HandlerOutcome::RetryBudgetExceeded.acknowledgement(),
            Acknowledgement::Ack
        );
        assert_eq!(HandlerOutcome::AlreadySucceeded.acknowledgement(), Acknowledgement::Ack);
    }

    #[test]
    fn test_stage_outcome_from_result() {
        assert!(StageOutcome::from(Ok::<_, StageError>(())).is_done());
        assert!(matches!(
            StageOutcome::from(Err::<(), _>(StageError::Timeout {
                stage: "ingest",
                secs: 1
            })),
            StageOutcome::RetryableFailure(_)
        ));
        assert!(matches!(
            StageOutcome::from(Err::<(), _>(StageError::ArtifactNotFound {
                utility_account_id: 1
            })),
            StageOutcome::TerminalFailure(_)
        ));
    }
}
