//! Accuracy check of an extraction against known values.

use crate::models::BillExtraction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Relative tolerance on the total amount
pub const TOTAL_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedBill {
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EvaluationReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub total_amount: Option<f64>,
}

/// Compare an extraction with expected values: total within 1%, dates exact
pub fn evaluate_extraction(bill: &BillExtraction, expected: &ExpectedBill) -> EvaluationReport {
    let mut errors = Vec::new();

    if (bill.total_amount - expected.total_amount).abs() > expected.total_amount * TOTAL_TOLERANCE
    {
        errors.push(format!(
            "total: {} vs expected {}",
            bill.total_amount, expected.total_amount
        ));
    }
    if bill.billing_period_start != expected.billing_period_start {
        errors.push(format!("start: {}", bill.billing_period_start));
    }
    if bill.billing_period_end != expected.billing_period_end {
        errors.push(format!("end: {}", bill.billing_period_end));
    }

    EvaluationReport {
        passed: errors.is_empty(),
        errors,
        total_amount: Some(bill.total_amount),
    }
}
