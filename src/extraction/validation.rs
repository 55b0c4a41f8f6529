use super::{strip_code_fences, ExtractionError};
use crate::models::BillExtraction;

/// Parse a model response into a validated bill.
///
/// Missing fields and wrong types are schema errors; a period that ends
/// before it starts is rejected.
pub fn parse_extraction(response: &str) -> Result<BillExtraction, ExtractionError> {
    let body = strip_code_fences(response);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ExtractionError::MalformedJson {
            message: e.to_string(),
        })?;

    let bill: BillExtraction =
        serde_json::from_value(value).map_err(|e| ExtractionError::Schema {
            message: e.to_string(),
        })?;

    if bill.billing_period_start > bill.billing_period_end {
        return Err(ExtractionError::InvalidPeriod {
            start: bill.billing_period_start,
            end: bill.billing_period_end,
        });
    }

    Ok(bill)
}
