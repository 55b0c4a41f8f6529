use async_trait::async_trait;
use billflow_core::extraction::{ExtractionError, LanguageModel};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Valid model answer for the Utility A sample bill, fenced like a chat reply
pub const SAMPLE_A_RESPONSE: &str = r#"```json
{
  "billing_period_start": "2025-12-01",
  "billing_period_end": "2025-12-31",
  "total_amount": 106.40,
  "line_items": [
    {"name": "Basic Service Charge", "amount": 12.00},
    {"name": "Energy Charge", "amount": 79.44},
    {"name": "Fuel Cost Adjustment", "amount": 6.62},
    {"name": "Taxes & Fees", "amount": 8.34}
  ]
}
```"#;

type Reply = (Duration, Result<String, ExtractionError>);

/// Language model answering from a script.
///
/// Queued replies are consumed first, in order; afterwards every call gets
/// the fallback reply. Every prompt is recorded.
pub struct ScriptedModel {
    queued: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(response: impl Into<String>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: (Duration::ZERO, Ok(response.into())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn sample_a() -> Self {
        Self::replying(SAMPLE_A_RESPONSE)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: (Duration::ZERO, Err(ExtractionError::model(message))),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Delay every fallback reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fallback.0 = delay;
        self
    }

    /// Queue a one-off reply ahead of the fallback
    pub fn then(self, delay: Duration, reply: Result<String, ExtractionError>) -> Self {
        self.queued.lock().push_back((delay, reply));
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        self.prompts.lock().push(prompt.to_string());
        let (delay, reply) = self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
