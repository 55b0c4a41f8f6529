//! # Orchestration
//!
//! Message-driven job processing:
//!
//! - [`JobWorker`]: polls the subscription and settles each delivery
//! - [`JobMessageHandler`]: idempotency and retry gates, state transitions
//! - [`PipelineStageRouter`]: ingest and parse stages by job type
//! - [`JobContext`]: per-delivery logging span
//!
//! Retry is driven entirely by redelivery. The handler turns each
//! [`StageOutcome`] into a [`HandlerOutcome`], whose [`Acknowledgement`]
//! tells the worker to ack or nack.

pub mod context;
pub mod errors;
pub mod handler;
pub mod pipeline;
pub mod types;
pub mod worker;

pub use context::JobContext;
pub use errors::StageError;
pub use handler::JobMessageHandler;
pub use pipeline::{PipelineRequest, PipelineStageRouter};
pub use types::{Acknowledgement, HandlerOutcome, StageOutcome};
pub use worker::JobWorker;
