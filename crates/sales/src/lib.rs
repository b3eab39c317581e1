//! Sales domain module.
//!
//! A sale is an event record: items are validated and allocated against
//! inventory as one unit, and the resulting consumption transactions are
//! what the ledger remembers. Nothing here performs IO.

pub mod sale;

pub use sale::{Sale, SaleId, SaleItem, SaleItemInput, SalePlan, plan_sale};
