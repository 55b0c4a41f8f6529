/// Instruction sent ahead of every bill
pub const EXTRACTION_PROMPT: &str = r#"Extract the following information from this utility bill text and return ONLY valid JSON matching this schema:

{
  "billing_period_start": "YYYY-MM-DD",
  "billing_period_end": "YYYY-MM-DD",
  "total_amount": <number>,
  "line_items": [
    {"name": "<charge name>", "amount": <number>}
  ]
}

Rules:
- Return ONLY the JSON, no other text
- For dates, use ISO format YYYY-MM-DD
- For amounts, use numbers (not strings)
- Include all line items/charges from the bill
"#;

pub fn build_extraction_prompt(bill_text: &str, provider: Option<&str>) -> String {
    let mut prompt = String::from(EXTRACTION_PROMPT);
    if let Some(provider) = provider.filter(|p| !p.is_empty()) {
        prompt.push_str(&format!("\nProvider: {provider}\n"));
    }
    prompt.push_str("\nBill text:\n");
    prompt.push_str(bill_text);
    prompt
}

/// Unwrap a response fenced as a markdown code block.
///
/// Only the content of the first fenced block is kept, and a leading `json`
/// language tag is dropped. Unfenced responses are returned trimmed.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let inner = trimmed.split("```").nth(1).unwrap_or_default();
    inner.strip_prefix("json").unwrap_or(inner).trim()
}
