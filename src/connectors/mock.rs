//! Fixed-sample connectors for two bill layouts.

use super::{BillConnector, ConnectorError};
use async_trait::async_trait;

const UTILITY_A_SAMPLE_BILL: &str = r#"
========================================
        UTILITY COMPANY A
        Monthly Statement
========================================

Account Number: 12345-67890
Service Address: 123 Main Street
Billing Period: Dec 1 - Dec 31, 2025

----------------------------------------
USAGE SUMMARY
----------------------------------------
Previous Reading:     45,230 kWh
Current Reading:      45,892 kWh
Total Usage:             662 kWh

----------------------------------------
CHARGES
----------------------------------------
Basic Service Charge:        $12.00
Energy Charge (662 kWh):    $79.44
  @ $0.12/kWh
Fuel Cost Adjustment:         $6.62
Taxes & Fees:                 $8.34
----------------------------------------
TOTAL DUE:                  $106.40

Due Date: January 15, 2026

Thank you for being our customer!
========================================
"#;

const UTILITY_B_SAMPLE_BILL: &str = r#"
*******************************************
*      UTILITY PROVIDER B - INVOICE       *
*******************************************

Customer #: UA-98765
Location: 456 Oak Avenue, Suite 100
Period: 01/01/2025 - 31/01/2025

----- CONSUMPTION -----
Start Meter: 12,450 kWh
End Meter: 13,125 kWh
Used: 675 kWh

----- BREAKDOWN -----
Service Fee.............. $15.50
Usage (675 kWh x $0.11).. $74.25
Grid Maintenance......... $4.20
Environmental Surcharge.. $2.80
State Tax (5%)........... $4.84

===========================
AMOUNT DUE: $101.59
===========================

Pay by: Feb 15, 2025
*******************************************
"#;

/// Monthly statement layout with a `TOTAL DUE` line
#[derive(Debug, Default, Clone, Copy)]
pub struct MockUtilityAConnector;

impl MockUtilityAConnector {
    pub fn sample_bill() -> &'static str {
        UTILITY_A_SAMPLE_BILL.trim()
    }
}

#[async_trait]
impl BillConnector for MockUtilityAConnector {
    async fn fetch_bill_artifact(
        &self,
        utility_account_id: i64,
    ) -> Result<(Vec<u8>, String), ConnectorError> {
        Ok((
            Self::sample_bill().as_bytes().to_vec(),
            format!("bill_account_{utility_account_id}.txt"),
        ))
    }

    fn name(&self) -> &'static str {
        "mock_utility_a"
    }
}

/// Compact invoice layout with an `AMOUNT DUE` line
#[derive(Debug, Default, Clone, Copy)]
pub struct MockUtilityBConnector;

impl MockUtilityBConnector {
    pub fn sample_bill() -> &'static str {
        UTILITY_B_SAMPLE_BILL.trim()
    }
}

#[async_trait]
impl BillConnector for MockUtilityBConnector {
    async fn fetch_bill_artifact(
        &self,
        utility_account_id: i64,
    ) -> Result<(Vec<u8>, String), ConnectorError> {
        Ok((
            Self::sample_bill().as_bytes().to_vec(),
            format!("bill_b_account_{utility_account_id}.txt"),
        ))
    }

    fn name(&self) -> &'static str {
        "mock_utility_b"
    }
}
