//! # In-Memory Persistence
//!
//! Thread-safe in-memory collaborators for development and testing.
//!
//! Job updates are applied under the job's map entry lock, so concurrent
//! deliveries of one job serialize at the record level exactly like a single
//! conditional `UPDATE` would.

use super::{
    JobStore, ObjectStore, ObjectStoreError, StoreError, StoreResult, UpdateOutcome,
    WarehouseError, WarehouseRow, WarehouseRowError, WarehouseSink,
};
use crate::models::{
    Account, Artifact, Job, JobType, JobUpdate, NewNormalizedBill, NormalizedBill,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// In-memory [`JobStore`]
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: DashMap<i64, Job>,
    accounts: DashMap<i64, Account>,
    artifacts: Mutex<Vec<Artifact>>,
    normalized_bills: Mutex<Vec<NormalizedBill>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            accounts: DashMap::new(),
            artifacts: Mutex::new(Vec::new()),
            normalized_bills: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Enqueue a PENDING job (the external enqueue action)
    pub fn insert_job(&self, job_id: i64, utility_account_id: i64, job_type: JobType) -> Job {
        let job = Job::pending(job_id, utility_account_id, job_type);
        self.jobs.insert(job_id, job.clone());
        job
    }

    /// Insert or replace a job record as-is
    pub fn put_job(&self, job: Job) {
        self.jobs.insert(job.job_id, job);
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts.insert(account.utility_account_id, account);
    }

    /// Snapshot of a job record
    pub fn job(&self, job_id: i64) -> Option<Job> {
        self.jobs.get(&job_id).map(|entry| entry.clone())
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().clone()
    }

    pub fn normalized_bills(&self) -> Vec<NormalizedBill> {
        self.normalized_bills.lock().clone()
    }

    /// Make every subsequent operation fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory job store marked unavailable"));
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get_job(&self, job_id: i64) -> StoreResult<Option<Job>> {
        self.check_available()?;
        Ok(self.job(job_id))
    }

    async fn get_account(&self, utility_account_id: i64) -> StoreResult<Option<Account>> {
        self.check_available()?;
        Ok(self
            .accounts
            .get(&utility_account_id)
            .map(|entry| entry.clone()))
    }

    async fn update_job(&self, job_id: i64, update: &JobUpdate) -> StoreResult<UpdateOutcome> {
        self.check_available()?;
        let Some(mut job) = self.jobs.get_mut(&job_id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if job.apply(update, Utc::now()) {
            Ok(UpdateOutcome::Applied(job.clone()))
        } else {
            Ok(UpdateOutcome::Terminal(job.clone()))
        }
    }

    async fn save_artifact(
        &self,
        job_id: i64,
        utility_account_id: i64,
        storage_path: &str,
        artifact_type: &str,
    ) -> StoreResult<Artifact> {
        self.check_available()?;
        let artifact = Artifact {
            artifact_id: self.next_id(),
            job_id,
            utility_account_id,
            storage_path: storage_path.to_string(),
            artifact_type: artifact_type.to_string(),
            created_at: Utc::now(),
        };
        self.artifacts.lock().push(artifact.clone());
        Ok(artifact)
    }

    async fn latest_artifact(&self, utility_account_id: i64) -> StoreResult<Option<Artifact>> {
        self.check_available()?;
        Ok(self
            .artifacts
            .lock()
            .iter()
            .filter(|a| a.utility_account_id == utility_account_id)
            .max_by_key(|a| (a.created_at, a.artifact_id))
            .cloned())
    }

    async fn save_normalized_bill(&self, bill: &NewNormalizedBill) -> StoreResult<NormalizedBill> {
        self.check_available()?;
        let saved = NormalizedBill {
            normalized_bill_id: self.next_id(),
            customer_id: bill.customer_id,
            utility_account_id: bill.utility_account_id,
            billing_period_start: bill.billing_period_start,
            billing_period_end: bill.billing_period_end,
            total_amount: bill.total_amount,
            json_payload: bill.json_payload.clone(),
            created_at: Utc::now(),
        };
        self.normalized_bills.lock().push(saved.clone());
        Ok(saved)
    }

    async fn latest_normalized_bill(
        &self,
        utility_account_id: i64,
    ) -> StoreResult<Option<NormalizedBill>> {
        self.check_available()?;
        Ok(self
            .normalized_bills
            .lock()
            .iter()
            .filter(|b| b.utility_account_id == utility_account_id)
            .max_by_key(|b| (b.created_at, b.normalized_bill_id))
            .cloned())
    }
}

/// In-memory [`ObjectStore`] addressing objects as `memory://{bucket}/{path}`
#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: DashMap<String, Vec<u8>>,
    fail_uploads: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: DashMap::new(),
            fail_uploads: AtomicBool::new(false),
        }
    }

    pub fn uri_for(&self, path: &str) -> String {
        format!("memory://{}/{}", self.bucket, path)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Store an object directly, bypassing the upload path
    pub fn put(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        self.objects.insert(path.to_string(), content.into());
        self.uri_for(path)
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    fn key_for<'a>(&self, uri_or_path: &'a str) -> &'a str {
        uri_or_path
            .strip_prefix("memory://")
            .and_then(|rest| rest.strip_prefix(self.bucket.as_str()))
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(uri_or_path)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, content: &[u8], path: &str) -> Result<String, ObjectStoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Upload {
                path: path.to_string(),
                message: "upload rejected".to_string(),
            });
        }
        Ok(self.put(path, content))
    }

    async fn download(&self, uri_or_path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let key = self.key_for(uri_or_path);
        self.objects
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| ObjectStoreError::NotFound {
                path: uri_or_path.to_string(),
            })
    }
}

/// In-memory [`WarehouseSink`]
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    rows: Mutex<Vec<WarehouseRow>>,
    pending_rejection: Mutex<Option<String>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<WarehouseRow> {
        self.rows.lock().clone()
    }

    /// Report a per-row error for every row of the next insert
    pub fn reject_next_insert(&self, message: impl Into<String>) {
        *self.pending_rejection.lock() = Some(message.into());
    }
}

#[async_trait]
impl WarehouseSink for InMemoryWarehouse {
    async fn insert(
        &self,
        rows: &[WarehouseRow],
    ) -> Result<Vec<WarehouseRowError>, WarehouseError> {
        if let Some(message) = self.pending_rejection.lock().take() {
            return Ok((0..rows.len())
                .map(|row_index| WarehouseRowError {
                    row_index,
                    message: message.clone(),
                })
                .collect());
        }
        self.rows.lock().extend_from_slice(rows);
        Ok(Vec::new())
    }
}
