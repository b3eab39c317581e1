//! Quality control domain module.
//!
//! Quality checks are pure append records with no inventory effect: an
//! inspection of a received lot or a catalog product against a typed check
//! category, with a PASSED/FAILED/PENDING outcome.

pub mod check;

pub use check::{
    CheckStatus, CheckTarget, QualityCheck, QualityCheckId, QualityCheckType, QualityCheckTypeId,
};
