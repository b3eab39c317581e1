use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lotledger_catalog::ProductId;
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId, uuid_id};

use crate::lot::LotId;

uuid_id!(
    /// Inventory transaction identifier.
    TransactionId
);

/// What kind of stock movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Receipt,
    Sale,
    ProductionConsumption,
    ProductionOutput,
    Adjustment,
    ExpiryWriteoff,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Receipt => "receipt",
            TransactionKind::Sale => "sale",
            TransactionKind::ProductionConsumption => "production_consumption",
            TransactionKind::ProductionOutput => "production_output",
            TransactionKind::Adjustment => "adjustment",
            TransactionKind::ExpiryWriteoff => "expiry_writeoff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(TransactionKind::Receipt),
            "sale" => Some(TransactionKind::Sale),
            "production_consumption" => Some(TransactionKind::ProductionConsumption),
            "production_output" => Some(TransactionKind::ProductionOutput),
            "adjustment" => Some(TransactionKind::Adjustment),
            "expiry_writeoff" => Some(TransactionKind::ExpiryWriteoff),
            _ => None,
        }
    }

    /// Sign contract per kind. `None` means either sign is legal.
    fn required_sign(&self) -> Option<i8> {
        match self {
            TransactionKind::Receipt | TransactionKind::ProductionOutput => Some(1),
            TransactionKind::Sale
            | TransactionKind::ProductionConsumption
            | TransactionKind::ExpiryWriteoff => Some(-1),
            TransactionKind::Adjustment => None,
        }
    }
}

/// One append-only ledger entry.
///
/// Transactions are immutable once written: there are no setters, and the
/// store layer only ever inserts. Corrections are new offsetting entries.
/// `reference_id` points at the originating event (sale, production, or the
/// lot itself for receipts and write-offs); `kind` says which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    id: TransactionId,
    product_id: ProductId,
    lot_id: Option<LotId>,
    kind: TransactionKind,
    delta: i64,
    occurred_at: DateTime<Utc>,
    reference_id: Option<Uuid>,
    recorded_by: UserId,
    notes: Option<String>,
}

impl InventoryTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TransactionId,
        product_id: ProductId,
        lot_id: Option<LotId>,
        kind: TransactionKind,
        delta: i64,
        occurred_at: DateTime<Utc>,
        reference_id: Option<Uuid>,
        recorded_by: UserId,
        notes: Option<String>,
    ) -> LedgerResult<Self> {
        if delta == 0 {
            return Err(LedgerError::validation("transaction delta cannot be zero"));
        }
        match kind.required_sign() {
            Some(1) if delta < 0 => {
                return Err(LedgerError::validation(format!(
                    "{} transactions must have a positive delta",
                    kind.as_str()
                )));
            }
            Some(-1) if delta > 0 => {
                return Err(LedgerError::validation(format!(
                    "{} transactions must have a negative delta",
                    kind.as_str()
                )));
            }
            _ => {}
        }
        Ok(Self {
            id,
            product_id,
            lot_id,
            kind,
            delta,
            occurred_at,
            reference_id,
            recorded_by,
            notes,
        })
    }

    /// Rehydrate from stored state (store layer only). Stored rows already
    /// passed the sign contract when they were written.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        product_id: ProductId,
        lot_id: Option<LotId>,
        kind: TransactionKind,
        delta: i64,
        occurred_at: DateTime<Utc>,
        reference_id: Option<Uuid>,
        recorded_by: UserId,
        notes: Option<String>,
    ) -> Self {
        Self {
            id,
            product_id,
            lot_id,
            kind,
            delta,
            occurred_at,
            reference_id,
            recorded_by,
            notes,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn lot_id(&self) -> Option<LotId> {
        self.lot_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn reference_id(&self) -> Option<Uuid> {
        self.reference_id
    }

    pub fn recorded_by(&self) -> UserId {
        self.recorded_by
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Entity for InventoryTransaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(kind: TransactionKind, delta: i64) -> LedgerResult<InventoryTransaction> {
        InventoryTransaction::new(
            TransactionId::new(),
            ProductId::new(),
            None,
            kind,
            delta,
            Utc::now(),
            None,
            UserId::new(),
            None,
        )
    }

    #[test]
    fn zero_delta_is_rejected() {
        assert!(tx(TransactionKind::Adjustment, 0).is_err());
    }

    #[test]
    fn sign_contract_is_enforced_per_kind() {
        assert!(tx(TransactionKind::Receipt, 10).is_ok());
        assert!(tx(TransactionKind::Receipt, -10).is_err());
        assert!(tx(TransactionKind::Sale, -3).is_ok());
        assert!(tx(TransactionKind::Sale, 3).is_err());
        assert!(tx(TransactionKind::ExpiryWriteoff, -7).is_ok());
        assert!(tx(TransactionKind::ExpiryWriteoff, 7).is_err());
        assert!(tx(TransactionKind::ProductionOutput, 5).is_ok());
        assert!(tx(TransactionKind::ProductionConsumption, -5).is_ok());
        assert!(tx(TransactionKind::Adjustment, -2).is_ok());
        assert!(tx(TransactionKind::Adjustment, 2).is_ok());
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            TransactionKind::Receipt,
            TransactionKind::Sale,
            TransactionKind::ProductionConsumption,
            TransactionKind::ProductionOutput,
            TransactionKind::Adjustment,
            TransactionKind::ExpiryWriteoff,
        ] {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::parse("other"), None);
    }
}
