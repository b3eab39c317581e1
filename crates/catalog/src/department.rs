use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_core::{Entity, LedgerError, LedgerResult, uuid_id};

uuid_id!(
    /// Department identifier.
    DepartmentId
);

/// Department: reference data grouping products (e.g. Butchery, Bakery).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    id: DepartmentId,
    code: String,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Department {
    pub fn new(
        id: DepartmentId,
        code: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let code = code.into();
        let name = name.into();
        if code.trim().is_empty() {
            return Err(LedgerError::validation("department code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::validation("department name cannot be empty"));
        }
        Ok(Self {
            id,
            code,
            name,
            active: true,
            created_at,
        })
    }

    /// Rehydrate from stored state (store layer only).
    pub fn from_parts(
        id: DepartmentId,
        code: String,
        name: String,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            name,
            active,
            created_at,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Soft-deactivate; departments are never deleted.
    pub fn deactivate(&mut self) -> LedgerResult<()> {
        if !self.active {
            return Err(LedgerError::invalid_state("department already deactivated"));
        }
        self.active = false;
        Ok(())
    }
}

impl Entity for Department {
    type Id = DepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_code_and_name() {
        let now = Utc::now();
        assert!(Department::new(DepartmentId::new(), "  ", "Bakery", now).is_err());
        assert!(Department::new(DepartmentId::new(), "BAK", "", now).is_err());
    }

    #[test]
    fn deactivate_is_one_way() {
        let mut dept =
            Department::new(DepartmentId::new(), "BAK", "Bakery", Utc::now()).unwrap();
        assert!(dept.is_active());
        dept.deactivate().unwrap();
        assert!(!dept.is_active());
        let err = dept.deactivate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
    }
}
