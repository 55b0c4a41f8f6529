//! # Job Message Handler
//!
//! Entry point for one delivered message. Per delivery:
//!
//! 1. Missing job: drop (ack), there is nothing to update.
//! 2. Job already SUCCEEDED: ack without touching anything.
//! 3. `attempt_count >= max_job_attempts`: mark FAILED with the retry limit
//!    message and ack, which stops redelivery.
//! 4. Unsupported job type or missing account: mark FAILED and ack.
//! 5. Mark RUNNING (attempt_count + 1, error cleared) and route.
//! 6. Success: mark SUCCEEDED and ack. Failure: mark FAILED with the
//!    truncated error; nack when redelivery could help.
//!
//! ## Concurrent redelivery
//!
//! The queue delivers at least once, and nothing serializes deliveries of one
//! job. Two deliveries can both pass steps 2 and 3, both increment
//! `attempt_count` and both run the pipeline, producing duplicate artifacts
//! or normalized bills. Stage side effects are append-only, so the duplicates
//! are harmless history. The job store refuses to move a job out of
//! SUCCEEDED, so whichever delivery finishes first wins and a later one can
//! only observe the terminal state and ack.

use super::{
    HandlerOutcome, JobContext, PipelineRequest, PipelineStageRouter, StageError, StageOutcome,
};
use crate::constants::truncate_error_message;
use crate::logging::log_job_operation;
use crate::messaging::JobMessage;
use crate::models::Account;
use crate::persistence::{JobStore, StoreError};
use crate::state_machine::{JobEvent, JobState, JobStateMachine, StateMachineError};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

#[derive(Clone)]
pub struct JobMessageHandler {
    store: Arc<dyn JobStore>,
    router: PipelineStageRouter,
    max_job_attempts: u32,
}

impl std::fmt::Debug for JobMessageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobMessageHandler")
            .field("router", &self.router)
            .field("max_job_attempts", &self.max_job_attempts)
            .finish()
    }
}

impl JobMessageHandler {
    pub fn new(
        store: Arc<dyn JobStore>,
        router: PipelineStageRouter,
        max_job_attempts: u32,
    ) -> Self {
        Self {
            store,
            router,
            max_job_attempts,
        }
    }

    pub fn max_job_attempts(&self) -> u32 {
        self.max_job_attempts
    }

    /// Decode and handle a raw queue payload.
    ///
    /// A payload that does not decode names no job to update and is dropped.
    pub async fn handle_payload(&self, payload: &[u8]) -> HandlerOutcome {
        match JobMessage::decode(payload) {
            Ok(message) => self.handle(&message).await,
            Err(e) => {
                warn!(error = %e, bytes = payload.len(), "Dropping undecodable job message");
                HandlerOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub async fn handle(&self, message: &JobMessage) -> HandlerOutcome {
        let context = JobContext::from_message(message);
        let span = context.span();
        let outcome = self.process(message).instrument(span.clone()).await;

        span.in_scope(|| {
            log_job_operation(
                "handle_message",
                context.job_id,
                Some(context.job_type.as_str()),
                outcome.as_str(),
                match &outcome {
                    HandlerOutcome::Failed { error_message, .. } => Some(error_message.as_str()),
                    HandlerOutcome::Dropped { reason } => Some(reason.as_str()),
                    HandlerOutcome::Deferred { error } => Some(error.as_str()),
                    _ => None,
                },
            )
        });
        outcome
    }

    async fn process(&self, message: &JobMessage) -> HandlerOutcome {
        let job = match self.store.get_job(message.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Job not found, dropping message");
                return HandlerOutcome::Dropped {
                    reason: format!("Job {} not found", message.job_id),
                };
            }
            Err(e) => return deferred("get_job", e),
        };

        if job.status == JobState::Succeeded {
            info!("Job already succeeded, acknowledging duplicate delivery");
            return HandlerOutcome::AlreadySucceeded;
        }

        let mut machine = JobStateMachine::new(job, self.store.clone());

        if machine.job().attempt_count >= self.max_job_attempts {
            warn!(
                attempt_count = machine.job().attempt_count,
                max_job_attempts = self.max_job_attempts,
                "Retry budget exhausted"
            );
            return match machine.transition(JobEvent::ExhaustRetries).await {
                Ok(_) => HandlerOutcome::RetryBudgetExceeded,
                Err(e) => transition_failed(e),
            };
        }

        let job_type = match message.parsed_job_type() {
            Ok(job_type) => job_type,
            Err(_) => {
                let error = StageError::UnsupportedJobType {
                    job_type: message.job_type.clone(),
                };
                return record_failure(&mut machine, error).await;
            }
        };

        let account = match self.resolve_account(message.utility_account_id).await {
            Ok(account) => account,
            Err(AccountLookup::Missing(error)) => return record_failure(&mut machine, error).await,
            Err(AccountLookup::Unavailable(e)) => return deferred("get_account", e),
        };

        let request = PipelineRequest {
            job_id: message.job_id,
            utility_account_id: message.utility_account_id,
            customer_id: message.customer_id.unwrap_or(account.customer_id),
            provider: account.provider,
            artifact_path: message.artifact_path.clone(),
        };

        if let Err(e) = machine.transition(JobEvent::Start).await {
            return transition_failed(e);
        }
        debug!(
            attempt_count = machine.job().attempt_count,
            customer_id = request.customer_id,
            "Job running"
        );

        match self.router.route(job_type, &request).await {
            StageOutcome::Done => match machine.transition(JobEvent::Succeed).await {
                Ok(_) => {
                    info!("Job succeeded");
                    HandlerOutcome::Succeeded
                }
                Err(e) => transition_failed(e),
            },
            StageOutcome::RetryableFailure(error) | StageOutcome::TerminalFailure(error) => {
                record_failure(&mut machine, error).await
            }
        }
    }

    async fn resolve_account(&self, utility_account_id: i64) -> Result<Account, AccountLookup> {
        match self.store.get_account(utility_account_id).await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(AccountLookup::Missing(StageError::AccountNotFound {
                utility_account_id,
            })),
            Err(e) => Err(AccountLookup::Unavailable(e)),
        }
    }
}

enum AccountLookup {
    Missing(StageError),
    Unavailable(StoreError),
}

/// Mark the job FAILED with the error's reason code
async fn record_failure(machine: &mut JobStateMachine, error: StageError) -> HandlerOutcome {
    let reason = error.reason();
    let retryable = error.is_retryable();
    let error_message = truncate_error_message(&error.to_string());
    error!(error = %error, reason = %reason, retryable, "Job failed");

    match machine
        .transition(JobEvent::fail_with_error(error_message.clone(), reason))
        .await
    {
        Ok(_) => HandlerOutcome::Failed {
            reason,
            error_message,
            retryable,
        },
        Err(e) => transition_failed(e),
    }
}

fn transition_failed(error: StateMachineError) -> HandlerOutcome {
    match error {
        // Another delivery finished the job first
        StateMachineError::TerminalState { .. } => {
            info!("Job succeeded in a concurrent delivery");
            HandlerOutcome::AlreadySucceeded
        }
        StateMachineError::JobMissing { job_id } => HandlerOutcome::Dropped {
            reason: format!("Job {job_id} not found"),
        },
        StateMachineError::InvalidTransition { .. } | StateMachineError::Persistence(_) => {
            error!(error = %error, "Job transition failed");
            HandlerOutcome::Deferred {
                error: error.to_string(),
            }
        }
    }
}

fn deferred(operation: &str, error: impl std::fmt::Display) -> HandlerOutcome {
    error!(operation, error = %error, "Job store unavailable, deferring delivery");
    HandlerOutcome::Deferred {
        error: format!("{operation}: {error}"),
    }
}
