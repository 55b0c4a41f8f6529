//! # Connector Registry
//!
//! Maps provider identifiers to connectors. Lookups never fail: an unknown
//! provider resolves to the default connector so that unconfigured providers
//! still produce a bill to inspect.

use super::{BillConnector, MockUtilityAConnector, MockUtilityBConnector};
use crate::constants::DEFAULT_PROVIDER;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn BillConnector>>,
    default: Arc<dyn BillConnector>,
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&String> = self.connectors.keys().collect();
        providers.sort();
        f.debug_struct("ConnectorRegistry")
            .field("providers", &providers)
            .field("default", &self.default.name())
            .finish()
    }
}

impl Default for ConnectorRegistry {
    /// Registry with the built-in providers; unknown providers get the
    /// [`DEFAULT_PROVIDER`] connector
    fn default() -> Self {
        let utility_a: Arc<dyn BillConnector> = Arc::new(MockUtilityAConnector);
        let utility_b: Arc<dyn BillConnector> = Arc::new(MockUtilityBConnector);

        Self::new(utility_a.clone())
            .with_connector(DEFAULT_PROVIDER, utility_a.clone())
            .with_connector("MOCK_B", utility_b.clone())
            .with_connector("PG&E", utility_a)
            .with_connector("SCE", utility_b)
    }
}

impl ConnectorRegistry {
    /// Empty registry resolving every provider to `default`
    pub fn new(default: Arc<dyn BillConnector>) -> Self {
        Self {
            connectors: HashMap::new(),
            default,
        }
    }

    pub fn with_connector(
        mut self,
        provider: impl Into<String>,
        connector: Arc<dyn BillConnector>,
    ) -> Self {
        self.register(provider, connector);
        self
    }

    pub fn register(&mut self, provider: impl Into<String>, connector: Arc<dyn BillConnector>) {
        self.connectors.insert(provider.into(), connector);
    }

    pub fn is_registered(&self, provider: &str) -> bool {
        self.connectors.contains_key(provider)
    }

    pub fn resolve(&self, provider: &str) -> Arc<dyn BillConnector> {
        match self.connectors.get(provider) {
            Some(connector) => connector.clone(),
            None => {
                warn!(
                    provider = provider,
                    connector = self.default.name(),
                    "No connector registered for provider, using default"
                );
                self.default.clone()
            }
        }
    }
}
