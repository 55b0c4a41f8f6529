//! # Pipeline Stage Router
//!
//! Dispatches a job to its stages:
//!
//! - `INGEST_BILL`: connector fetch, upload to `raw/bills/{job_id}.txt`,
//!   artifact record
//! - `PARSE_BILL`: download, extraction, persistence fan-out
//! - `FULL_PIPELINE`: ingest, then parse the artifact just uploaded
//!
//! Each stage runs under the configured stage timeout. Stages never retry;
//! failures are returned to the handler as a [`StageOutcome`].

use super::{StageError, StageOutcome};
use crate::connectors::ConnectorRegistry;
use crate::constants::{raw_bill_path, RAW_BILL_ARTIFACT_TYPE};
use crate::extraction::ExtractionStrategy;
use crate::models::{JobType, NewNormalizedBill, NormalizedBill};
use crate::persistence::{JobStore, ObjectStore, PersistenceFanout};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Inputs to the stages of one job, resolved by the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub job_id: i64,
    pub utility_account_id: i64,
    /// Message-provided customer, else the account's
    pub customer_id: i64,
    pub provider: String,
    pub artifact_path: Option<String>,
}

#[derive(Clone)]
pub struct PipelineStageRouter {
    connectors: ConnectorRegistry,
    object_store: Arc<dyn ObjectStore>,
    store: Arc<dyn JobStore>,
    extraction: ExtractionStrategy,
    fanout: PersistenceFanout,
    stage_timeout: Duration,
}

impl std::fmt::Debug for PipelineStageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStageRouter")
            .field("connectors", &self.connectors)
            .field("extraction", &self.extraction)
            .field("stage_timeout", &self.stage_timeout)
            .finish()
    }
}

impl PipelineStageRouter {
    pub fn new(
        connectors: ConnectorRegistry,
        object_store: Arc<dyn ObjectStore>,
        store: Arc<dyn JobStore>,
        extraction: ExtractionStrategy,
        fanout: PersistenceFanout,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            connectors,
            object_store,
            store,
            extraction,
            fanout,
            stage_timeout,
        }
    }

    pub async fn route(&self, job_type: JobType, request: &PipelineRequest) -> StageOutcome {
        match job_type {
            JobType::IngestBill => self.ingest(request).await.into(),
            JobType::ParseBill => self.parse(request).await.into(),
            JobType::FullPipeline => self.full_pipeline(request).await.into(),
        }
    }

    /// Fetch the raw bill and store it, returning its object URI
    #[instrument(skip(self, request), fields(provider = %request.provider))]
    pub async fn ingest(&self, request: &PipelineRequest) -> Result<String, StageError> {
        self.with_timeout("ingest", async {
            let connector = self.connectors.resolve(&request.provider);
            info!(connector = connector.name(), "Using connector for provider");

            let (content, _filename) = connector
                .fetch_bill_artifact(request.utility_account_id)
                .await?;
            let uri = self
                .object_store
                .upload(&content, &raw_bill_path(request.job_id))
                .await?;
            self.store
                .save_artifact(
                    request.job_id,
                    request.utility_account_id,
                    &uri,
                    RAW_BILL_ARTIFACT_TYPE,
                )
                .await?;

            info!(uri = %uri, bytes = content.len(), "Uploaded raw bill");
            Ok::<_, StageError>(uri)
        })
        .await
    }

    /// Parse the message's artifact, or the account's latest one.
    ///
    /// The artifact lookup counts against the stage timeout.
    pub async fn parse(&self, request: &PipelineRequest) -> Result<NormalizedBill, StageError> {
        self.with_timeout("parse", async {
            let artifact_path = match &request.artifact_path {
                Some(path) => path.clone(),
                None => self
                    .store
                    .latest_artifact(request.utility_account_id)
                    .await?
                    .map(|artifact| artifact.storage_path)
                    .ok_or(StageError::ArtifactNotFound {
                        utility_account_id: request.utility_account_id,
                    })?,
            };
            self.parse_artifact(request, &artifact_path).await
        })
        .await
    }

    pub async fn full_pipeline(
        &self,
        request: &PipelineRequest,
    ) -> Result<NormalizedBill, StageError> {
        let uri = self.ingest(request).await?;
        self.with_timeout("parse", self.parse_artifact(request, &uri))
            .await
    }

    /// Download, extract and persist. Callers apply the stage timeout.
    #[instrument(skip(self, request))]
    async fn parse_artifact(
        &self,
        request: &PipelineRequest,
        artifact_path: &str,
    ) -> Result<NormalizedBill, StageError> {
        let bytes = self.object_store.download(artifact_path).await?;
        let bill_text = String::from_utf8(bytes).map_err(|e| StageError::InvalidUtf8 {
            path: artifact_path.to_string(),
            message: e.to_string(),
        })?;
        info!(chars = bill_text.chars().count(), "Downloaded raw bill");

        let extraction = self
            .extraction
            .extract(&bill_text, Some(request.provider.as_str()))
            .await?;

        let bill = NewNormalizedBill::from_extraction(
            request.customer_id,
            request.utility_account_id,
            &extraction,
        )
        .map_err(|e| StageError::Serialization {
            message: e.to_string(),
        })?;
        Ok(self.fanout.persist(&bill).await?)
    }

    async fn with_timeout<T, F>(&self, stage: &'static str, future: F) -> Result<T, StageError>
    where
        F: Future<Output = Result<T, StageError>>,
    {
        tokio::time::timeout(self.stage_timeout, future)
            .await
            .map_err(|_| StageError::Timeout {
                stage,
                secs: self.stage_timeout.as_secs(),
            })?
    }
}
