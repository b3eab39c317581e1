use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_core::{Entity, LedgerError, LedgerResult, uuid_id};

use crate::department::DepartmentId;

uuid_id!(
    /// Supplier identifier.
    SupplierId
);

/// Supplier status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Suspended,
}

impl SupplierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierStatus::Active => "active",
            SupplierStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SupplierStatus::Active),
            "suspended" => Some(SupplierStatus::Suspended),
            _ => None,
        }
    }
}

/// Contact information for a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Supplier: reference data for a party that delivers stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    code: String,
    name: String,
    contact: ContactInfo,
    status: SupplierStatus,
    created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(
        id: SupplierId,
        code: impl Into<String>,
        name: impl Into<String>,
        contact: ContactInfo,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let code = code.into();
        let name = name.into();
        if code.trim().is_empty() {
            return Err(LedgerError::validation("supplier code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::validation("supplier name cannot be empty"));
        }
        Ok(Self {
            id,
            code,
            name,
            contact,
            status: SupplierStatus::Active,
            created_at,
        })
    }

    /// Rehydrate from stored state (store layer only).
    pub fn from_parts(
        id: SupplierId,
        code: String,
        name: String,
        contact: ContactInfo,
        status: SupplierStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            name,
            contact,
            status,
            created_at,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn suspend(&mut self) -> LedgerResult<()> {
        if self.status == SupplierStatus::Suspended {
            return Err(LedgerError::invalid_state("supplier already suspended"));
        }
        self.status = SupplierStatus::Suspended;
        Ok(())
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Join row: a supplier serves a department.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplierDepartment {
    pub supplier_id: SupplierId,
    pub department_id: DepartmentId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier() -> Supplier {
        Supplier::new(
            SupplierId::new(),
            "SUP-01",
            "Karoo Meats",
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_supplier_is_active() {
        assert_eq!(supplier().status(), SupplierStatus::Active);
    }

    #[test]
    fn suspend_twice_is_invalid_state() {
        let mut s = supplier();
        s.suspend().unwrap();
        assert!(matches!(
            s.suspend().unwrap_err(),
            LedgerError::InvalidState(_)
        ));
    }
}
