//! FEFO lot allocation.
//!
//! Consumption policy: earliest expiry date first, ties broken by earliest
//! received date, then lot id. Stock that entered without a lot (production
//! output, positive adjustments) is drained last, after every open lot.
//! The policy lives here and nowhere else.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use lotledger_core::{LedgerError, LedgerResult};

use crate::lot::{LotId, ReceivedProduct};

/// A lot with stock still on hand, as seen by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLot {
    pub lot_id: LotId,
    pub expiry_date: NaiveDate,
    pub received_date: NaiveDate,
    pub remaining: i64,
}

impl From<&ReceivedProduct> for OpenLot {
    fn from(lot: &ReceivedProduct) -> Self {
        Self {
            lot_id: *lotledger_core::Entity::id(lot),
            expiry_date: lot.expiry_date(),
            received_date: lot.received_date(),
            remaining: lot.quantity_remaining(),
        }
    }
}

/// One slice of an allocation: take `quantity` from `lot_id`, or from the
/// unlotted remainder when `lot_id` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub lot_id: Option<LotId>,
    pub quantity: i64,
}

/// The available stock of a single product, ordered for FEFO consumption.
///
/// A pool is built once per operation from the rows locked inside the
/// operation's transaction; successive `allocate` calls (e.g. two sale items
/// for the same product) draw down the same pool so the availability check
/// covers the whole operation, not each item in isolation.
#[derive(Debug, Clone)]
pub struct LotPool {
    lots: Vec<OpenLot>,
    unlotted: i64,
}

impl LotPool {
    /// `unlotted` is stock with no lot reference (production output,
    /// positive adjustments): product balance minus the lot remainders.
    pub fn new(mut lots: Vec<OpenLot>, unlotted: i64) -> Self {
        lots.retain(|l| l.remaining > 0);
        lots.sort_by(|a, b| {
            a.expiry_date
                .cmp(&b.expiry_date)
                .then(a.received_date.cmp(&b.received_date))
                .then(a.lot_id.cmp(&b.lot_id))
        });
        Self {
            lots,
            unlotted: unlotted.max(0),
        }
    }

    /// Total quantity still available in the pool.
    pub fn available(&self) -> i64 {
        self.unlotted + self.lots.iter().map(|l| l.remaining).sum::<i64>()
    }

    /// Allocate `requested` units FEFO, draining the pool as it goes.
    ///
    /// Fails with `InsufficientInventory` naming `product` (the sku shown to
    /// the caller) without consuming anything from the pool.
    pub fn allocate(&mut self, product: &str, requested: i64) -> LedgerResult<Vec<Allocation>> {
        if requested <= 0 {
            return Err(LedgerError::validation("requested quantity must be positive"));
        }
        let available = self.available();
        if available < requested {
            return Err(LedgerError::insufficient(product, requested, available));
        }

        let mut allocations = Vec::new();
        let mut outstanding = requested;
        for lot in self.lots.iter_mut() {
            if outstanding == 0 {
                break;
            }
            let take = lot.remaining.min(outstanding);
            if take == 0 {
                continue;
            }
            lot.remaining -= take;
            outstanding -= take;
            allocations.push(Allocation {
                lot_id: Some(lot.lot_id),
                quantity: take,
            });
        }
        if outstanding > 0 {
            self.unlotted -= outstanding;
            allocations.push(Allocation {
                lot_id: None,
                quantity: outstanding,
            });
        }
        self.lots.retain(|l| l.remaining > 0);
        Ok(allocations)
    }
}
