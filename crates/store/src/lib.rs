//! Storage layer for the traceability ledger.
//!
//! The `ledger` module defines the `Catalog` and `TraceabilityLedger`
//! service traits plus two implementations: `PostgresStore` (one SQL
//! transaction per operation, row locks for the check-then-write sequences)
//! and `MemoryStore` (tests/dev). SQL migrations live under `migrations/`.

pub mod ledger;
mod retry;

#[cfg(test)]
mod integration_tests;

pub use ledger::memory::MemoryStore;
pub use ledger::postgres::PostgresStore;
pub use ledger::r#trait::{
    AdjustStock, Catalog, DashboardSummary, InventoryRow, InvoiceSummary, MarkExpired,
    ProduceRecipe, ProductReportRow, ReceiveStock, RecordQualityCheck, RecordSale,
    TraceabilityLedger, TransactionFilter,
};
