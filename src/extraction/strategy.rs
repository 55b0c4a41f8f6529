use super::{build_extraction_prompt, extract_total_fallback, parse_extraction};
use super::{ExtractionError, LanguageModel};
use crate::models::BillExtraction;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Primary model extraction with a diagnostic regex fallback
#[derive(Clone)]
pub struct ExtractionStrategy {
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionStrategy")
            .field("model", &self.model.model_name())
            .finish()
    }
}

impl ExtractionStrategy {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Extract a validated bill.
    ///
    /// On failure the fallback total is logged and the primary error is
    /// returned; the fallback never produces a result.
    pub async fn extract(
        &self,
        bill_text: &str,
        provider: Option<&str>,
    ) -> Result<BillExtraction, ExtractionError> {
        match self.extract_primary(bill_text, provider).await {
            Ok(bill) => {
                info!(
                    total_amount = bill.total_amount,
                    line_items = bill.line_items.len(),
                    "Extracted bill"
                );
                Ok(bill)
            }
            Err(error) => {
                warn!(error = %error, "Model extraction failed, trying fallback");
                match extract_total_fallback(bill_text) {
                    Some(total_amount) => {
                        info!(total_amount, "Fallback extracted total amount (not persisted)")
                    }
                    None => debug!("Fallback found no total amount"),
                }
                Err(error)
            }
        }
    }

    async fn extract_primary(
        &self,
        bill_text: &str,
        provider: Option<&str>,
    ) -> Result<BillExtraction, ExtractionError> {
        let prompt = build_extraction_prompt(bill_text, provider);
        let response = self.model.generate(&prompt).await?;
        parse_extraction(&response)
    }
}
