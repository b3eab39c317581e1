use serde::{Deserialize, Serialize};

use lotledger_core::{Entity, LedgerError, LedgerResult, uuid_id};

uuid_id!(
    /// Packaging identifier.
    PackagingId
);

/// Packaging format a product can ship in (e.g. "vacuum pack 500g").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packaging {
    id: PackagingId,
    description: String,
    /// Units of the product contained per package.
    units_per_package: i64,
}

impl Packaging {
    pub fn new(
        id: PackagingId,
        description: impl Into<String>,
        units_per_package: i64,
    ) -> LedgerResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(LedgerError::validation(
                "packaging description cannot be empty",
            ));
        }
        if units_per_package <= 0 {
            return Err(LedgerError::validation(
                "units_per_package must be positive",
            ));
        }
        Ok(Self {
            id,
            description,
            units_per_package,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn units_per_package(&self) -> i64 {
        self.units_per_package
    }
}

impl Entity for Packaging {
    type Id = PackagingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
