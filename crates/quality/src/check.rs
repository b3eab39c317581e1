use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_catalog::{DepartmentId, ProductId};
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId, uuid_id};
use lotledger_inventory::LotId;

uuid_id!(
    /// Quality check type identifier.
    QualityCheckTypeId
);

uuid_id!(
    /// Quality check identifier.
    QualityCheckId
);

/// Outcome of a quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pending,
    Passed,
    Failed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pending => "PENDING",
            CheckStatus::Passed => "PASSED",
            CheckStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(CheckStatus::Pending),
            "PASSED" => Some(CheckStatus::Passed),
            "FAILED" => Some(CheckStatus::Failed),
            _ => None,
        }
    }
}

/// What a quality check inspects: a received lot or a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CheckTarget {
    Lot(LotId),
    Product(ProductId),
}

/// A typed check category (e.g. temperature on receipt, label audit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckType {
    id: QualityCheckTypeId,
    name: String,
    description: Option<String>,
    /// Department the check applies to, if scoped.
    department_id: Option<DepartmentId>,
    created_at: DateTime<Utc>,
}

impl QualityCheckType {
    pub fn new(
        id: QualityCheckTypeId,
        name: impl Into<String>,
        description: Option<String>,
        department_id: Option<DepartmentId>,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("check type name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            description,
            department_id,
            created_at,
        })
    }

    /// Rehydrate from stored state (store layer only).
    pub fn from_parts(
        id: QualityCheckTypeId,
        name: String,
        description: Option<String>,
        department_id: Option<DepartmentId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            department_id,
            created_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for QualityCheckType {
    type Id = QualityCheckTypeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One inspection record. Pure append: a re-check is a new record, never an
/// edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheck {
    id: QualityCheckId,
    check_type_id: QualityCheckTypeId,
    target: CheckTarget,
    status: CheckStatus,
    notes: Option<String>,
    checked_at: DateTime<Utc>,
    checked_by: UserId,
}

impl QualityCheck {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QualityCheckId,
        check_type_id: QualityCheckTypeId,
        target: CheckTarget,
        status: CheckStatus,
        notes: Option<String>,
        checked_at: DateTime<Utc>,
        checked_by: UserId,
    ) -> Self {
        Self {
            id,
            check_type_id,
            target,
            status,
            notes,
            checked_at,
            checked_by,
        }
    }

    pub fn check_type_id(&self) -> QualityCheckTypeId {
        self.check_type_id
    }

    pub fn target(&self) -> CheckTarget {
        self.target
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    pub fn checked_by(&self) -> UserId {
        self.checked_by
    }
}

impl Entity for QualityCheck {
    type Id = QualityCheckId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_type_requires_a_name() {
        let err = QualityCheckType::new(
            QualityCheckTypeId::new(),
            "   ",
            None,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [CheckStatus::Pending, CheckStatus::Passed, CheckStatus::Failed] {
            assert_eq!(CheckStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CheckStatus::parse("MIXED"), None);
    }

    #[test]
    fn check_records_its_target() {
        let lot = LotId::new();
        let check = QualityCheck::new(
            QualityCheckId::new(),
            QualityCheckTypeId::new(),
            CheckTarget::Lot(lot),
            CheckStatus::Passed,
            Some("temp 3.4C".to_string()),
            Utc::now(),
            UserId::new(),
        );
        assert_eq!(check.target(), CheckTarget::Lot(lot));
        assert_eq!(check.status(), CheckStatus::Passed);
    }
}
