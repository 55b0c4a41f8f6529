use crate::messaging::JobMessage;
use tracing::Span;
use uuid::Uuid;

/// Per-delivery logging context.
///
/// Carried explicitly through the handler and entered as a span, so
/// concurrent deliveries never share tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: i64,
    pub job_type: String,
    pub utility_account_id: i64,
    pub correlation_id: Uuid,
}

impl JobContext {
    pub fn from_message(message: &JobMessage) -> Self {
        Self {
            job_id: message.job_id,
            job_type: message.job_type.clone(),
            utility_account_id: message.utility_account_id,
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = self.job_id,
            job_type = %self.job_type,
            utility_account_id = self.utility_account_id,
            correlation_id = %self.correlation_id,
        )
    }
}
