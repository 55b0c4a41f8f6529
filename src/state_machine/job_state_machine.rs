use super::{
    errors::{StateMachineError, StateMachineResult},
    events::JobEvent,
    states::JobState,
};
use crate::constants::{truncate_error_message, RETRY_LIMIT_EXCEEDED_MESSAGE};
use crate::models::{FailureReason, Job, JobUpdate};
use crate::persistence::{JobStore, UpdateOutcome};
use std::sync::Arc;

/// Job lifecycle state machine backed by a [`JobStore`].
///
/// The machine works on the snapshot read at the start of a delivery. Two
/// deliveries of the same job may hold independent machines for the same
/// record; the store's refusal to leave SUCCEEDED is the only cross-delivery
/// guarantee.
pub struct JobStateMachine {
    job: Job,
    store: Arc<dyn JobStore>,
}

impl JobStateMachine {
    pub fn new(job: Job, store: Arc<dyn JobStore>) -> Self {
        Self { job, store }
    }

    pub fn current_state(&self) -> JobState {
        self.job.status
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn job_id(&self) -> i64 {
        self.job.job_id
    }

    /// Validate the event against the current state and persist the result
    pub async fn transition(&mut self, event: JobEvent) -> StateMachineResult<JobState> {
        let target = Self::determine_target_state(self.job.status, &event)?;
        let update = update_for(target, &event);

        match self.store.update_job(self.job.job_id, &update).await? {
            UpdateOutcome::Applied(job) => {
                tracing::debug!(
                    job_id = job.job_id,
                    event = event.event_type(),
                    from = %self.job.status,
                    to = %job.status,
                    attempt_count = job.attempt_count,
                    "Job transition persisted"
                );
                self.job = job;
                Ok(target)
            }
            UpdateOutcome::Terminal(job) => {
                let state = job.status.to_string();
                self.job = job;
                Err(StateMachineError::TerminalState {
                    job_id: self.job.job_id,
                    state,
                })
            }
            UpdateOutcome::Missing => Err(StateMachineError::JobMissing {
                job_id: self.job.job_id,
            }),
        }
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: JobState,
        event: &JobEvent,
    ) -> StateMachineResult<JobState> {
        let target = match (current_state, event) {
            // A RUNNING job can be restarted by a concurrent or post-crash redelivery
            (JobState::Pending | JobState::Running | JobState::Failed, JobEvent::Start) => {
                JobState::Running
            }

            (JobState::Running, JobEvent::Succeed) => JobState::Succeeded,

            (JobState::Pending | JobState::Running | JobState::Failed, JobEvent::Fail { .. }) => {
                JobState::Failed
            }

            (
                JobState::Pending | JobState::Running | JobState::Failed,
                JobEvent::ExhaustRetries,
            ) => JobState::Failed,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

fn update_for(target: JobState, event: &JobEvent) -> JobUpdate {
    match event {
        JobEvent::Start => JobUpdate {
            status: target,
            error_message: None,
            failure_reason: None,
            increment_attempt: true,
        },
        JobEvent::Succeed => JobUpdate {
            status: target,
            error_message: None,
            failure_reason: None,
            increment_attempt: false,
        },
        JobEvent::Fail { message, reason } => JobUpdate {
            status: target,
            error_message: Some(truncate_error_message(message)),
            failure_reason: Some(*reason),
            increment_attempt: false,
        },
        JobEvent::ExhaustRetries => JobUpdate {
            status: target,
            error_message: Some(RETRY_LIMIT_EXCEEDED_MESSAGE.to_string()),
            failure_reason: Some(FailureReason::RetryBudgetExceeded),
            increment_attempt: false,
        },
    }
}
