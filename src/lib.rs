#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Billflow Core
//!
//! Queue-driven ingestion and normalization of utility bills.
//!
//! ## Overview
//!
//! A message naming a job arrives on the ingest subscription. The worker
//! fetches or locates the raw bill, extracts the billing period, total and
//! line items through a language model, and persists the normalized result to
//! the relational store and the warehouse.
//!
//! Delivery is at least once. Jobs are processed exactly once in effect: a
//! SUCCEEDED job is never reprocessed, failures are retried by redelivery
//! until the attempt budget is spent, and then the job is forced to FAILED.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Worker loop, message handler, pipeline stage router
//! - [`state_machine`] - Job states, events and guarded transitions
//! - [`extraction`] - Model prompt, response validation, regex fallback
//! - [`connectors`] - Provider to bill source resolution
//! - [`persistence`] - Job store, object store, warehouse, fan-out
//! - [`messaging`] - Queue abstraction and job message format
//! - [`models`] - Jobs, accounts, artifacts and normalized bills
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate-level error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use billflow_core::config::BillflowConfig;
//! use billflow_core::connectors::ConnectorRegistry;
//! use billflow_core::extraction::{ExtractionStrategy, LanguageModel};
//! use billflow_core::messaging::InMemoryMessagingService;
//! use billflow_core::orchestration::{JobMessageHandler, JobWorker, PipelineStageRouter};
//! use billflow_core::persistence::{
//!     InMemoryJobStore, InMemoryObjectStore, InMemoryWarehouse, PersistenceFanout,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(model: Arc<dyn LanguageModel>) -> Result<(), Box<dyn std::error::Error>> {
//! billflow_core::logging::init_structured_logging();
//! let config = BillflowConfig::from_env()?;
//!
//! let store = Arc::new(InMemoryJobStore::new());
//! let fanout = PersistenceFanout::new(store.clone(), Arc::new(InMemoryWarehouse::new()));
//! let router = PipelineStageRouter::new(
//!     ConnectorRegistry::default(),
//!     Arc::new(InMemoryObjectStore::new(config.storage_bucket.clone())),
//!     store.clone(),
//!     ExtractionStrategy::new(model),
//!     fanout,
//!     config.stage_timeout(),
//! );
//! let handler = JobMessageHandler::new(store, router, config.max_job_attempts);
//!
//! let worker = JobWorker::new(
//!     Arc::new(InMemoryMessagingService::new()),
//!     Arc::new(handler),
//!     &config,
//! );
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! worker.run(shutdown_rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connectors;
pub mod constants;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod state_machine;

pub use config::BillflowConfig;
pub use error::{BillflowError, Result};
pub use messaging::JobMessage;
pub use models::{Account, Artifact, BillExtraction, Job, JobType, NormalizedBill};
pub use orchestration::{HandlerOutcome, JobMessageHandler, JobWorker, PipelineStageRouter};
pub use state_machine::{JobEvent, JobState, JobStateMachine};
