use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use lotledger_catalog::{ProductId, SupplierId};
use lotledger_core::{Entity, LedgerError, LedgerResult, uuid_id};

uuid_id!(
    /// Lot identifier (one received batch of a product).
    LotId
);

/// A received lot: one batch of a product delivered by a supplier.
///
/// Immutable once created except for `quantity_remaining`, which is a
/// materialized balance the store maintains in the same transaction as
/// every ledger write touching the lot. The received quantity, dates, and
/// references never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedProduct {
    id: LotId,
    product_id: ProductId,
    supplier_id: SupplierId,
    received_date: NaiveDate,
    expiry_date: NaiveDate,
    quantity_received: i64,
    quantity_remaining: i64,
    supplier_invoice: Option<String>,
    storage_location: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReceivedProduct {
    /// Build a freshly-received lot. The remaining quantity starts equal to
    /// the received quantity; the matching receipt transaction is planned
    /// separately (`plan::plan_receipt`).
    #[allow(clippy::too_many_arguments)]
    pub fn receive(
        id: LotId,
        product_id: ProductId,
        supplier_id: SupplierId,
        received_date: NaiveDate,
        expiry_date: NaiveDate,
        quantity: i64,
        supplier_invoice: Option<String>,
        storage_location: Option<String>,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        if quantity <= 0 {
            return Err(LedgerError::validation("received quantity must be positive"));
        }
        if expiry_date < received_date {
            return Err(LedgerError::validation(
                "expiry date cannot be before the receipt date",
            ));
        }
        if let Some(inv) = &supplier_invoice {
            if inv.trim().is_empty() {
                return Err(LedgerError::validation(
                    "supplier invoice number cannot be blank",
                ));
            }
        }
        Ok(Self {
            id,
            product_id,
            supplier_id,
            received_date,
            expiry_date,
            quantity_received: quantity,
            quantity_remaining: quantity,
            supplier_invoice,
            storage_location,
            created_at,
        })
    }

    /// Rehydrate a lot from stored state (store layer only).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: LotId,
        product_id: ProductId,
        supplier_id: SupplierId,
        received_date: NaiveDate,
        expiry_date: NaiveDate,
        quantity_received: i64,
        quantity_remaining: i64,
        supplier_invoice: Option<String>,
        storage_location: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id,
            supplier_id,
            received_date,
            expiry_date,
            quantity_received,
            quantity_remaining,
            supplier_invoice,
            storage_location,
            created_at,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn received_date(&self) -> NaiveDate {
        self.received_date
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn quantity_received(&self) -> i64 {
        self.quantity_received
    }

    pub fn quantity_remaining(&self) -> i64 {
        self.quantity_remaining
    }

    pub fn supplier_invoice(&self) -> Option<&str> {
        self.supplier_invoice.as_deref()
    }

    pub fn storage_location(&self) -> Option<&str> {
        self.storage_location.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True once the calendar date has reached the lot's expiry date.
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        as_of >= self.expiry_date
    }

    pub fn is_exhausted(&self) -> bool {
        self.quantity_remaining == 0
    }

    /// Apply a ledger delta to the materialized remaining quantity.
    ///
    /// Remaining stays within `0..=quantity_received`; anything else means
    /// the caller computed a plan against stale state.
    pub fn apply_delta(&mut self, delta: i64) -> LedgerResult<()> {
        let next = self.quantity_remaining + delta;
        if next < 0 {
            return Err(LedgerError::invalid_state(format!(
                "lot {} cannot go below zero (remaining {}, delta {})",
                self.id, self.quantity_remaining, delta
            )));
        }
        if next > self.quantity_received {
            return Err(LedgerError::invalid_state(format!(
                "lot {} cannot exceed its received quantity (received {}, delta {})",
                self.id, self.quantity_received, delta
            )));
        }
        self.quantity_remaining = next;
        Ok(())
    }
}

impl Entity for ReceivedProduct {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(quantity: i64) -> ReceivedProduct {
        ReceivedProduct::receive(
            LotId::new(),
            ProductId::new(),
            SupplierId::new(),
            date(2025, 6, 1),
            date(2025, 6, 11),
            quantity,
            Some("INV-1001".to_string()),
            Some("Cold Storage".to_string()),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_nonpositive_quantity() {
        let err = ReceivedProduct::receive(
            LotId::new(),
            ProductId::new(),
            SupplierId::new(),
            date(2025, 6, 1),
            date(2025, 6, 11),
            0,
            None,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn rejects_expiry_before_receipt() {
        let err = ReceivedProduct::receive(
            LotId::new(),
            ProductId::new(),
            SupplierId::new(),
            date(2025, 6, 10),
            date(2025, 6, 1),
            5,
            None,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn expiry_is_inclusive_of_the_expiry_date() {
        let l = lot(10);
        assert!(!l.is_expired(date(2025, 6, 10)));
        assert!(l.is_expired(date(2025, 6, 11)));
        assert!(l.is_expired(date(2025, 7, 1)));
    }

    #[test]
    fn remaining_is_bounded_by_zero_and_received() {
        let mut l = lot(10);
        l.apply_delta(-4).unwrap();
        assert_eq!(l.quantity_remaining(), 6);
        assert!(l.apply_delta(-7).is_err());
        assert!(l.apply_delta(5).is_err());
        l.apply_delta(-6).unwrap();
        assert!(l.is_exhausted());
    }
}
