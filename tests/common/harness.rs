use super::ScriptedModel;
use billflow_core::config::BillflowConfig;
use billflow_core::connectors::ConnectorRegistry;
use billflow_core::extraction::ExtractionStrategy;
use billflow_core::messaging::JobMessage;
use billflow_core::models::{Account, Job, JobType};
use billflow_core::orchestration::{HandlerOutcome, JobMessageHandler, PipelineStageRouter};
use billflow_core::persistence::{
    InMemoryJobStore, InMemoryObjectStore, InMemoryWarehouse, PersistenceFanout,
};
use std::sync::Arc;

pub const ACCOUNT_ID: i64 = 5;
pub const CUSTOMER_ID: i64 = 9;

/// Handler wired to in-memory collaborators
pub struct Harness {
    pub config: BillflowConfig,
    pub store: Arc<InMemoryJobStore>,
    pub objects: Arc<InMemoryObjectStore>,
    pub warehouse: Arc<InMemoryWarehouse>,
    pub model: Arc<ScriptedModel>,
    pub handler: Arc<JobMessageHandler>,
}

impl Harness {
    /// Default configuration and a `MOCK_A` account 5 owned by customer 9
    pub fn new(model: ScriptedModel) -> Self {
        Self::with_config(model, BillflowConfig::default())
    }

    pub fn with_config(model: ScriptedModel, config: BillflowConfig) -> Self {
        let store = Arc::new(InMemoryJobStore::new());
        let objects = Arc::new(InMemoryObjectStore::new(config.storage_bucket.clone()));
        let warehouse = Arc::new(InMemoryWarehouse::new());
        let model = Arc::new(model);

        let router = PipelineStageRouter::new(
            ConnectorRegistry::default(),
            objects.clone(),
            store.clone(),
            ExtractionStrategy::new(model.clone()),
            PersistenceFanout::new(store.clone(), warehouse.clone()),
            config.stage_timeout(),
        );
        let handler = Arc::new(JobMessageHandler::new(
            store.clone(),
            router,
            config.max_job_attempts,
        ));

        store.insert_account(Account::new(ACCOUNT_ID, "MOCK_A", CUSTOMER_ID));

        Self {
            config,
            store,
            objects,
            warehouse,
            model,
            handler,
        }
    }

    /// Enqueue a PENDING job and return the matching message
    pub fn enqueue(&self, job_id: i64, job_type: JobType) -> JobMessage {
        self.store.insert_job(job_id, ACCOUNT_ID, job_type);
        JobMessage::new(job_id, ACCOUNT_ID, job_type)
    }

    pub async fn deliver(&self, message: &JobMessage) -> HandlerOutcome {
        self.handler.handle(message).await
    }

    pub fn job(&self, job_id: i64) -> Job {
        self.store
            .job(job_id)
            .unwrap_or_else(|| panic!("job {job_id} should exist"))
    }
}
