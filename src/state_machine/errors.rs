use crate::persistence::StoreError;
use thiserror::Error;

/// Error types for job state machine operations
#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Job {job_id} is already in terminal state {state}")]
    TerminalState { job_id: i64, state: String },

    #[error("Job {job_id} disappeared while transitioning")]
    JobMissing { job_id: i64 },

    #[error("Persistence operation failed: {0}")]
    Persistence(#[from] StoreError),
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
