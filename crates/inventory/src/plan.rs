//! Planning for receipt, expiry write-off, and manual adjustment.
//!
//! A plan is the full set of rows an operation will write, decided from
//! state the store has locked for the duration of the operation. Planning
//! never performs IO; the store executes the plan in one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use lotledger_catalog::ProductId;
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId, uuid_id};

use crate::lot::{LotId, ReceivedProduct};
use crate::transaction::{InventoryTransaction, TransactionId, TransactionKind};

uuid_id!(
    /// Expired-product record identifier.
    ExpiredProductId
);

/// Write-off record for a lot removed at/after expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredProduct {
    pub id: ExpiredProductId,
    pub lot_id: LotId,
    pub product_id: ProductId,
    /// Quantity written off (the lot's remaining quantity at removal).
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub removed_at: DateTime<Utc>,
    pub removed_by: UserId,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Everything `mark_expired` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPlan {
    pub transaction: InventoryTransaction,
    pub record: ExpiredProduct,
}

/// Plan the receipt transaction for a freshly-received lot.
///
/// The lot itself carries the validation (`ReceivedProduct::receive`); this
/// derives the matching positive ledger entry.
pub fn plan_receipt(
    lot: &ReceivedProduct,
    recorded_by: UserId,
    occurred_at: DateTime<Utc>,
) -> LedgerResult<InventoryTransaction> {
    InventoryTransaction::new(
        TransactionId::new(),
        lot.product_id(),
        Some(*lot.id()),
        TransactionKind::Receipt,
        lot.quantity_received(),
        occurred_at,
        Some(*lot.id().as_uuid()),
        recorded_by,
        None,
    )
}

/// Plan the write-off of an expired lot.
///
/// Legal only when the lot still has stock on hand and the calendar date
/// has reached its expiry date; otherwise `InvalidState` and nothing is
/// planned.
pub fn plan_expiry(
    lot: &ReceivedProduct,
    as_of: NaiveDate,
    removed_by: UserId,
    occurred_at: DateTime<Utc>,
    category: Option<String>,
    notes: Option<String>,
) -> LedgerResult<ExpiryPlan> {
    if lot.is_exhausted() {
        return Err(LedgerError::invalid_state(format!(
            "lot {} has no remaining quantity to write off",
            lot.id()
        )));
    }
    if !lot.is_expired(as_of) {
        return Err(LedgerError::invalid_state(format!(
            "lot {} does not expire until {}",
            lot.id(),
            lot.expiry_date()
        )));
    }

    let remaining = lot.quantity_remaining();
    let transaction = InventoryTransaction::new(
        TransactionId::new(),
        lot.product_id(),
        Some(*lot.id()),
        TransactionKind::ExpiryWriteoff,
        -remaining,
        occurred_at,
        Some(*lot.id().as_uuid()),
        removed_by,
        notes.clone(),
    )?;
    let record = ExpiredProduct {
        id: ExpiredProductId::new(),
        lot_id: *lot.id(),
        product_id: lot.product_id(),
        quantity: remaining,
        expiry_date: lot.expiry_date(),
        removed_at: occurred_at,
        removed_by,
        category,
        notes,
    };
    Ok(ExpiryPlan {
        transaction,
        record,
    })
}

/// Plan a manual stock adjustment (stocktake correction).
///
/// Positive deltas always pass; negative deltas must not take the product's
/// balance below zero.
pub fn plan_adjustment(
    product_id: ProductId,
    product_sku: &str,
    available: i64,
    delta: i64,
    recorded_by: UserId,
    occurred_at: DateTime<Utc>,
    notes: Option<String>,
) -> LedgerResult<InventoryTransaction> {
    if delta == 0 {
        return Err(LedgerError::validation("adjustment delta cannot be zero"));
    }
    if delta < 0 && available + delta < 0 {
        return Err(LedgerError::insufficient(product_sku, -delta, available));
    }
    InventoryTransaction::new(
        TransactionId::new(),
        product_id,
        None,
        TransactionKind::Adjustment,
        delta,
        occurred_at,
        None,
        recorded_by,
        notes,
    )
}
