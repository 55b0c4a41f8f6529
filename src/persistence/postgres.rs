//! # PostgreSQL Job Store
//!
//! [`JobStore`] over the relational tables shared with the enqueue API:
//!
//! - `utility_accounts`: read-only here
//! - `ingestion_jobs`: status, attempt_count and error columns are written here
//! - `artifacts`, `normalized_bills`: append-only
//!
//! Status writes are a single conditional `UPDATE ... WHERE status <> 'SUCCEEDED'`
//! so a late duplicate delivery can never regress a finished job.

use super::{JobStore, StoreError, StoreResult, UpdateOutcome};
use crate::models::{
    Account, Artifact, FailureReason, Job, JobType, JobUpdate, NewNormalizedBill, NormalizedBill,
};
use crate::state_machine::JobState;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

/// Table definitions, applied idempotently by [`PgJobStore::ensure_schema`]
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS utility_accounts (
    id BIGSERIAL PRIMARY KEY,
    customer_id BIGINT NOT NULL,
    provider TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS ingestion_jobs (
    id BIGSERIAL PRIMARY KEY,
    utility_account_id BIGINT NOT NULL REFERENCES utility_accounts(id),
    job_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    error_message TEXT,
    failure_reason TEXT,
    attempt_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS artifacts (
    id BIGSERIAL PRIMARY KEY,
    job_id BIGINT NOT NULL REFERENCES ingestion_jobs(id),
    utility_account_id BIGINT NOT NULL REFERENCES utility_accounts(id),
    storage_path TEXT NOT NULL,
    artifact_type TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_artifacts_account_created
    ON artifacts (utility_account_id, created_at DESC);

CREATE TABLE IF NOT EXISTS normalized_bills (
    id BIGSERIAL PRIMARY KEY,
    customer_id BIGINT NOT NULL,
    utility_account_id BIGINT NOT NULL REFERENCES utility_accounts(id),
    billing_period_start DATE NOT NULL,
    billing_period_end DATE NOT NULL,
    total_amount DOUBLE PRECISION NOT NULL,
    json_payload TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_normalized_bills_account_created
    ON normalized_bills (utility_account_id, created_at DESC);
"#;

const JOB_COLUMNS: &str = "id, utility_account_id, job_type, status, error_message, \
     failure_reason, attempt_count, created_at, updated_at";

const ARTIFACT_COLUMNS: &str =
    "id AS artifact_id, job_id, utility_account_id, storage_path, artifact_type, created_at";

const NORMALIZED_BILL_COLUMNS: &str = "id AS normalized_bill_id, customer_id, \
     utility_account_id, billing_period_start, billing_period_end, total_amount, json_payload, \
     created_at";

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

fn job_from_row(row: &PgRow) -> StoreResult<Job> {
    let job_type: String = row.try_get("job_type")?;
    let status: String = row.try_get("status")?;
    let attempt_count: i32 = row.try_get("attempt_count")?;
    let failure_reason: Option<String> = row.try_get("failure_reason")?;

    Ok(Job {
        job_id: row.try_get("id")?,
        utility_account_id: row.try_get("utility_account_id")?,
        job_type: job_type
            .parse::<JobType>()
            .map_err(|_| StoreError::invalid_record("job_type", job_type.clone()))?,
        status: status
            .parse::<JobState>()
            .map_err(|_| StoreError::invalid_record("status", status.clone()))?,
        attempt_count: u32::try_from(attempt_count)
            .map_err(|_| StoreError::invalid_record("attempt_count", attempt_count.to_string()))?,
        error_message: row.try_get("error_message")?,
        failure_reason: failure_reason
            .map(|reason| {
                reason
                    .parse::<FailureReason>()
                    .map_err(|_| StoreError::invalid_record("failure_reason", reason.clone()))
            })
            .transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get_job(&self, job_id: i64) -> StoreResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM ingestion_jobs WHERE id = $1");
        sqlx::query(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(job_from_row)
            .transpose()
    }

    async fn get_account(&self, utility_account_id: i64) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, provider, customer_id FROM utility_accounts WHERE id = $1",
        )
        .bind(utility_account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn update_job(&self, job_id: i64, update: &JobUpdate) -> StoreResult<UpdateOutcome> {
        let sql = format!(
            r#"
            UPDATE ingestion_jobs SET
                status = $2,
                updated_at = now(),
                attempt_count = attempt_count + CASE WHEN $3 THEN 1 ELSE 0 END,
                error_message = CASE
                    WHEN $4::text IS NOT NULL THEN $4::text
                    WHEN $2 IN ('RUNNING', 'SUCCEEDED') THEN NULL
                    ELSE error_message END,
                failure_reason = CASE
                    WHEN $4::text IS NOT NULL THEN $5::text
                    WHEN $2 IN ('RUNNING', 'SUCCEEDED') THEN NULL
                    ELSE failure_reason END
            WHERE id = $1 AND status <> 'SUCCEEDED'
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(job_id)
            .bind(update.status.as_str())
            .bind(update.increment_attempt)
            .bind(update.error_message.as_deref())
            .bind(update.failure_reason.map(|reason| reason.as_str()))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(UpdateOutcome::Applied(job_from_row(&row)?)),
            None => match self.get_job(job_id).await? {
                Some(job) => Ok(UpdateOutcome::Terminal(job)),
                None => Ok(UpdateOutcome::Missing),
            },
        }
    }

    async fn save_artifact(
        &self,
        job_id: i64,
        utility_account_id: i64,
        storage_path: &str,
        artifact_type: &str,
    ) -> StoreResult<Artifact> {
        let sql = format!(
            "INSERT INTO artifacts (job_id, utility_account_id, storage_path, artifact_type) \
             VALUES ($1, $2, $3, $4) RETURNING {ARTIFACT_COLUMNS}"
        );
        let artifact = sqlx::query_as::<_, Artifact>(&sql)
            .bind(job_id)
            .bind(utility_account_id)
            .bind(storage_path)
            .bind(artifact_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(artifact)
    }

    async fn latest_artifact(&self, utility_account_id: i64) -> StoreResult<Option<Artifact>> {
        let sql = format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE utility_account_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let artifact = sqlx::query_as::<_, Artifact>(&sql)
            .bind(utility_account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(artifact)
    }

    async fn save_normalized_bill(&self, bill: &NewNormalizedBill) -> StoreResult<NormalizedBill> {
        let sql = format!(
            "INSERT INTO normalized_bills (customer_id, utility_account_id, billing_period_start, \
             billing_period_end, total_amount, json_payload) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {NORMALIZED_BILL_COLUMNS}"
        );
        let saved = sqlx::query_as::<_, NormalizedBill>(&sql)
            .bind(bill.customer_id)
            .bind(bill.utility_account_id)
            .bind(bill.billing_period_start)
            .bind(bill.billing_period_end)
            .bind(bill.total_amount)
            .bind(&bill.json_payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(saved)
    }

    async fn latest_normalized_bill(
        &self,
        utility_account_id: i64,
    ) -> StoreResult<Option<NormalizedBill>> {
        let sql = format!(
            "SELECT {NORMALIZED_BILL_COLUMNS} FROM normalized_bills WHERE utility_account_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let bill = sqlx::query_as::<_, NormalizedBill>(&sql)
            .bind(utility_account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(bill)
    }
}
