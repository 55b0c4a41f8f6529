//! # Normalized Bill Model
//!
//! The structured result of parsing a raw bill, plus the persisted record
//! written by the persistence fan-out.
//!
//! Records are append-only: an account accumulates history and its current
//! result is the most recently created record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Single charge on a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub amount: f64,
}

/// Validated extraction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillExtraction {
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub total_amount: f64,
    pub line_items: Vec<LineItem>,
}

/// Row to be written to the relational store and the warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNormalizedBill {
    pub customer_id: i64,
    pub utility_account_id: i64,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub total_amount: f64,
    /// Full extraction serialized as JSON, line items included
    pub json_payload: String,
}

impl NewNormalizedBill {
    pub fn from_extraction(
        customer_id: i64,
        utility_account_id: i64,
        extraction: &BillExtraction,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            customer_id,
            utility_account_id,
            billing_period_start: extraction.billing_period_start,
            billing_period_end: extraction.billing_period_end,
            total_amount: extraction.total_amount,
            json_payload: serde_json::to_string(extraction)?,
        })
    }
}

/// Persisted normalized bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NormalizedBill {
    pub normalized_bill_id: i64,
    pub customer_id: i64,
    pub utility_account_id: i64,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub total_amount: f64,
    pub json_payload: String,
    pub created_at: DateTime<Utc>,
}

impl NormalizedBill {
    /// Decode the stored payload back into the extraction it was built from
    pub fn extraction(&self) -> Result<BillExtraction, serde_json::Error> {
        serde_json::from_str(&self.json_payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_keeps_line_items() {
        let extraction = BillExtraction {
            billing_period_start: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            billing_period_end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            total_amount: 106.40,
            line_items: vec![LineItem {
                name: "Basic Service Charge".to_string(),
                amount: 12.00,
            }],
        };

        let record = NewNormalizedBill::from_extraction(9, 5, &extraction).unwrap();
        assert!(record.json_payload.contains("\"line_items\""));
        assert!(record.json_payload.contains("\"2025-12-01\""));

        let decoded: BillExtraction = serde_json::from_str(&record.json_payload).unwrap();
        assert_eq!(decoded, extraction);
    }
}
