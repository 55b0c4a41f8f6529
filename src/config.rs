//! # Configuration
//!
//! Process-level settings for the bill ingestion worker. Nothing here is part
//! of the message protocol.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `BILLFLOW_*` environment variables
//! (`BILLFLOW_MAX_JOB_ATTEMPTS=5`, `BILLFLOW_STORAGE_BUCKET=...`).

use crate::constants::{defaults, DEFAULT_MAX_JOB_ATTEMPTS};
use crate::error::{BillflowError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "BILLFLOW";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillflowConfig {
    /// Processing attempts allowed before a job is forced to FAILED
    pub max_job_attempts: u32,
    /// Queue subscription the worker consumes
    pub subscription: String,
    /// Object storage bucket for raw bills
    pub storage_bucket: String,
    /// Upper bound on a single pipeline stage
    pub stage_timeout_secs: u64,
    /// Handler invocations allowed to run at once
    pub max_concurrent_messages: usize,
    /// How long a received message stays invisible to other consumers
    pub visibility_timeout_secs: u64,
    /// Sleep between empty polls
    pub poll_interval_ms: u64,
    /// Messages requested per receive call
    pub receive_batch_size: usize,
    /// Relational store connection string, when a Postgres job store is used
    pub database_url: Option<String>,
}

impl Default for BillflowConfig {
    fn default() -> Self {
        Self {
            max_job_attempts: DEFAULT_MAX_JOB_ATTEMPTS,
            subscription: defaults::SUBSCRIPTION.to_string(),
            storage_bucket: defaults::STORAGE_BUCKET.to_string(),
            stage_timeout_secs: defaults::STAGE_TIMEOUT_SECS,
            max_concurrent_messages: defaults::MAX_CONCURRENT_MESSAGES,
            visibility_timeout_secs: defaults::VISIBILITY_TIMEOUT_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            receive_batch_size: defaults::RECEIVE_BATCH_SIZE,
            database_url: None,
        }
    }
}

impl BillflowConfig {
    /// Load defaults, then `path` (if it exists), then `BILLFLOW_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Defaults overridden by `BILLFLOW_*` environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::load_with_env(None, None)
    }

    /// Same as [`load`](Self::load) with an explicit environment map instead of
    /// the process environment. Keys use the `BILLFLOW_` prefix.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config: BillflowConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            max_job_attempts = config.max_job_attempts,
            subscription = %config.subscription,
            storage_bucket = %config.storage_bucket,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Reject settings the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_job_attempts == 0 {
            return Err(invalid("max_job_attempts must be at least 1"));
        }
        if self.subscription.trim().is_empty() {
            return Err(invalid("subscription must not be empty"));
        }
        if self.storage_bucket.trim().is_empty() {
            return Err(invalid("storage_bucket must not be empty"));
        }
        if self.stage_timeout_secs == 0 {
            return Err(invalid("stage_timeout_secs must be greater than zero"));
        }
        if self.max_concurrent_messages == 0 {
            return Err(invalid("max_concurrent_messages must be at least 1"));
        }
        if self.visibility_timeout_secs == 0 {
            return Err(invalid("visibility_timeout_secs must be greater than zero"));
        }
        if self.receive_batch_size == 0 {
            return Err(invalid("receive_batch_size must be at least 1"));
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn invalid(message: &str) -> BillflowError {
    BillflowError::ConfigurationError(message.to_string())
}
