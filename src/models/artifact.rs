use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Location of a raw bill stored by a successful ingest stage.
///
/// Append-only; one record per successful ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artifact {
    pub artifact_id: i64,
    pub job_id: i64,
    pub utility_account_id: i64,
    /// Object store URI returned by the upload
    pub storage_path: String,
    pub artifact_type: String,
    pub created_at: DateTime<Utc>,
}
