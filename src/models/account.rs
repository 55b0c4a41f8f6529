use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Utility account owned by a customer. Read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    #[sqlx(rename = "id")]
    pub utility_account_id: i64,
    /// Provider key used to pick a connector (`MOCK_A`, `SCE`, ...)
    pub provider: String,
    pub customer_id: i64,
}

impl Account {
    pub fn new(utility_account_id: i64, provider: impl Into<String>, customer_id: i64) -> Self {
        Self {
            utility_account_id,
            provider: provider.into(),
            customer_id,
        }
    }
}
