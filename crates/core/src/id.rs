//! Strongly-typed identifiers.
//!
//! Every entity id is a uuid newtype minted as UUIDv7 (time-ordered), so id
//! order roughly follows creation order. The `uuid_id!` macro lets each
//! domain crate define its own ids with identical semantics.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Define a uuid-backed identifier newtype.
///
/// Generates `new()` (UUIDv7), `from_uuid`, `as_uuid`, `Display`, `FromStr`
/// (parse failures map to `LedgerError::Validation`), and `Uuid` conversions.
#[macro_export]
macro_rules! uuid_id {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t($crate::uuid::Uuid);

        impl $t {
            /// Mint a new identifier (UUIDv7, time-ordered). Prefer passing
            /// ids explicitly in tests for determinism.
            pub fn new() -> Self {
                Self($crate::uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: $crate::uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &$crate::uuid::Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::uuid::Uuid> for $t {
            fn from(value: $crate::uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for $crate::uuid::Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = s.parse::<$crate::uuid::Uuid>().map_err(|e| {
                    $crate::LedgerError::validation(format!(
                        concat!(stringify!($t), ": {}"),
                        e
                    ))
                })?;
                Ok(Self(uuid))
            }
        }
    };
}

/// Identifier of a user (acting identity, for audit attribution).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Mint a new identifier (UUIDv7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<UserId> for Uuid {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl FromStr for UserId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| LedgerError::validation(format!("UserId: {}", e)))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    uuid_id!(TestId);

    #[test]
    fn ids_round_trip_through_display_and_parse() {
        let id = TestId::new();
        let parsed: TestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_failure_is_a_validation_error() {
        let err = "not-a-uuid".parse::<TestId>().unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn v7_ids_are_time_ordered() {
        let a = UserId::new();
        let b = UserId::new();
        assert!(a.as_uuid() <= b.as_uuid());
    }
}
