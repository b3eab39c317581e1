//! `lotledger-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): the shared error taxonomy, typed identifiers, and the entity
//! marker trait.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{LedgerError, LedgerResult};
pub use id::UserId;

// Re-exported so `uuid_id!` can expand in downstream crates without them
// naming the uuid crate in the macro body.
#[doc(hidden)]
pub use uuid;
