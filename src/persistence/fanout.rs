use super::{FanoutError, JobStore, WarehouseError, WarehouseRow, WarehouseSink};
use crate::models::{NewNormalizedBill, NormalizedBill};
use chrono::Utc;
use std::sync::Arc;

/// Writes a normalized bill to the relational store, then to the warehouse.
///
/// The two writes are independent and not transactional: a warehouse failure
/// after a successful relational insert leaves the relational row in place.
#[derive(Clone)]
pub struct PersistenceFanout {
    store: Arc<dyn JobStore>,
    warehouse: Arc<dyn WarehouseSink>,
}

impl PersistenceFanout {
    pub fn new(store: Arc<dyn JobStore>, warehouse: Arc<dyn WarehouseSink>) -> Self {
        Self { store, warehouse }
    }

    pub async fn persist(&self, bill: &NewNormalizedBill) -> Result<NormalizedBill, FanoutError> {
        let saved = self.store.save_normalized_bill(bill).await?;
        tracing::info!(
            normalized_bill_id = saved.normalized_bill_id,
            utility_account_id = saved.utility_account_id,
            "Saved normalized bill to relational store"
        );

        let row = WarehouseRow::from_bill(bill, Utc::now());
        let row_errors = self.warehouse.insert(std::slice::from_ref(&row)).await?;
        if !row_errors.is_empty() {
            return Err(WarehouseError::RowErrors(row_errors).into());
        }
        tracing::info!(
            utility_account_id = bill.utility_account_id,
            "Saved normalized bill to warehouse"
        );

        Ok(saved)
    }
}
