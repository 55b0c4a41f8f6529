//! # Persistence
//!
//! Contracts for the collaborators the orchestrator writes through, plus the
//! fan-out that records a normalized bill in both sinks.
//!
//! - [`JobStore`]: jobs, accounts, artifacts and relational normalized bills
//! - [`ObjectStore`]: raw bill bytes
//! - [`WarehouseSink`]: analytics copy of each normalized bill
//!
//! In-memory implementations back development and tests; [`PgJobStore`] is the
//! relational job store.

pub mod errors;
pub mod fanout;
pub mod in_memory;
pub mod postgres;

pub use errors::{FanoutError, ObjectStoreError, StoreError, StoreResult, WarehouseError};
pub use fanout::PersistenceFanout;
pub use in_memory::{InMemoryJobStore, InMemoryObjectStore, InMemoryWarehouse};
pub use postgres::PgJobStore;

use crate::models::{Account, Artifact, Job, JobUpdate, NewNormalizedBill, NormalizedBill};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Result of a conditional job update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The update was written; carries the record after the write
    Applied(Job),
    /// The job had already SUCCEEDED; nothing was written
    Terminal(Job),
    /// No job with that id
    Missing,
}

/// Accessor for job and account records.
///
/// `update_job` must never move a job out of SUCCEEDED: implementations apply
/// the update conditionally and report [`UpdateOutcome::Terminal`] instead.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_job(&self, job_id: i64) -> StoreResult<Option<Job>>;

    async fn get_account(&self, utility_account_id: i64) -> StoreResult<Option<Account>>;

    async fn update_job(&self, job_id: i64, update: &JobUpdate) -> StoreResult<UpdateOutcome>;

    async fn save_artifact(
        &self,
        job_id: i64,
        utility_account_id: i64,
        storage_path: &str,
        artifact_type: &str,
    ) -> StoreResult<Artifact>;

    /// Most recently recorded artifact for an account
    async fn latest_artifact(&self, utility_account_id: i64) -> StoreResult<Option<Artifact>>;

    async fn save_normalized_bill(&self, bill: &NewNormalizedBill) -> StoreResult<NormalizedBill>;

    /// The account's current result: its most recently created normalized bill
    async fn latest_normalized_bill(
        &self,
        utility_account_id: i64,
    ) -> StoreResult<Option<NormalizedBill>>;
}

/// Blob storage for raw bills
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` at `path`, returning the object's URI
    async fn upload(&self, content: &[u8], path: &str) -> Result<String, ObjectStoreError>;

    /// Fetch an object by URI or by bare path
    async fn download(&self, uri_or_path: &str) -> Result<Vec<u8>, ObjectStoreError>;
}

/// Row inserted into the analytics warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRow {
    pub customer_id: i64,
    pub utility_account_id: i64,
    pub bill_period_start: NaiveDate,
    pub bill_period_end: NaiveDate,
    pub total_amount: f64,
    pub json_payload: String,
    pub created_at: DateTime<Utc>,
}

impl WarehouseRow {
    pub fn from_bill(bill: &NewNormalizedBill, created_at: DateTime<Utc>) -> Self {
        Self {
            customer_id: bill.customer_id,
            utility_account_id: bill.utility_account_id,
            bill_period_start: bill.billing_period_start,
            bill_period_end: bill.billing_period_end,
            total_amount: bill.total_amount,
            json_payload: bill.json_payload.clone(),
            created_at,
        }
    }
}

/// Per-row error reported by a warehouse insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRowError {
    pub row_index: usize,
    pub message: String,
}

/// Analytics warehouse sink
#[async_trait]
pub trait WarehouseSink: Send + Sync {
    /// Insert rows; an empty vector means every row was accepted
    async fn insert(
        &self,
        rows: &[WarehouseRow],
    ) -> Result<Vec<WarehouseRowError>, WarehouseError>;
}
