//! # Extraction
//!
//! Turns raw bill text into a validated [`BillExtraction`](crate::models::BillExtraction).
//!
//! The primary path asks a [`LanguageModel`] for strict JSON and validates the
//! answer. When that fails, a regex search for the amount due is run and
//! logged for operators, and the primary failure is returned unchanged. A
//! fallback value never completes a job.

pub mod evaluation;
pub mod fallback;
pub mod prompt;
pub mod strategy;
pub mod validation;

pub use evaluation::{evaluate_extraction, EvaluationReport, ExpectedBill};
pub use fallback::extract_total_fallback;
pub use prompt::{build_extraction_prompt, strip_code_fences, EXTRACTION_PROMPT};
pub use strategy::ExtractionStrategy;
pub use validation::parse_extraction;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Extraction model call failed: {message}")]
    Model { message: String },

    #[error("Extraction response is not valid JSON: {message}")]
    MalformedJson { message: String },

    #[error("Extraction response does not match the bill schema: {message}")]
    Schema { message: String },

    #[error("Billing period start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

impl ExtractionError {
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }
}

/// Text generation capability backing the primary extraction path
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
