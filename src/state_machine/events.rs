use crate::models::FailureReason;
use serde::{Deserialize, Serialize};

/// Events that can trigger job state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// A delivery passed the idempotency and retry gates
    Start,
    /// Every stage of the routed pipeline completed
    Succeed,
    /// A stage (or the pre-dispatch lookup) failed
    Fail {
        message: String,
        reason: FailureReason,
    },
    /// The attempt budget is spent; stop redelivery
    ExhaustRetries,
}

impl JobEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Succeed => "succeed",
            Self::Fail { .. } => "fail",
            Self::ExhaustRetries => "exhaust_retries",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Create a failure event with the given error message and reason code
    pub fn fail_with_error(error: impl Into<String>, reason: FailureReason) -> Self {
        Self::Fail {
            message: error.into(),
            reason,
        }
    }
}
