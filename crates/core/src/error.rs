//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// availability, state legality). `Storage` is the one escape hatch for
/// infrastructure faults so callers see a single error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed input: non-positive quantity, past/invalid dates.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An availability check failed; names the short product.
    #[error("insufficient inventory for {product}: requested {requested}, available {available}")]
    InsufficientInventory {
        product: String,
        requested: i64,
        available: i64,
    },

    /// Operation is not legal for the entity's current state
    /// (e.g. expiring a lot that is already fully consumed).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Transaction aborted due to a concurrent conflicting write.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Infrastructure fault (pool, IO, serialization).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn insufficient(product: impl Into<String>, requested: i64, available: i64) -> Self {
        Self::InsufficientInventory {
            product: product.into(),
            requested,
            available,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for errors the store layer may retry transparently.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_inventory_names_the_short_product() {
        let err = LedgerError::insufficient("FLOUR-01", 80, 70);
        assert_eq!(
            err.to_string(),
            "insufficient inventory for FLOUR-01: requested 80, available 70"
        );
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(LedgerError::conflict("serialization failure").is_retryable());
        assert!(!LedgerError::validation("bad input").is_retryable());
        assert!(!LedgerError::insufficient("P", 1, 0).is_retryable());
        assert!(!LedgerError::invalid_state("lot empty").is_retryable());
    }
}
