//! Inventory domain module: lots and the transaction ledger.
//!
//! This crate contains the business rules of the traceability ledger as
//! deterministic domain logic (no IO, no HTTP, no storage): received lots,
//! immutable inventory transactions, FEFO lot allocation, and the planning
//! functions that decide which transactions an operation writes. The store
//! layer executes a plan atomically or not at all.

pub mod allocation;
pub mod lot;
pub mod plan;
pub mod replay;
pub mod transaction;

pub use allocation::{Allocation, LotPool, OpenLot};
pub use lot::{LotId, ReceivedProduct};
pub use plan::{
    ExpiredProduct, ExpiredProductId, ExpiryPlan, plan_adjustment, plan_expiry, plan_receipt,
};
pub use replay::{replay_balance, replay_lot_remaining, sort_trace};
pub use transaction::{InventoryTransaction, TransactionId, TransactionKind};
