//! # Connectors
//!
//! Strategies for obtaining a raw bill from a utility provider, and the
//! registry that picks one for a provider identifier.

pub mod mock;
pub mod registry;

pub use mock::{MockUtilityAConnector, MockUtilityBConnector};
pub use registry::ConnectorRegistry;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Failed to fetch bill for account {utility_account_id}: {message}")]
    Fetch {
        utility_account_id: i64,
        message: String,
    },
}

/// Produces raw bill content for a utility account
#[async_trait]
pub trait BillConnector: Send + Sync {
    /// Returns the bill bytes and a suggested file name
    async fn fetch_bill_artifact(
        &self,
        utility_account_id: i64,
    ) -> Result<(Vec<u8>, String), ConnectorError>;

    /// Connector name for logging
    fn name(&self) -> &'static str;
}
