use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_core::{Entity, LedgerError, LedgerResult, uuid_id};

use crate::department::DepartmentId;
use crate::packaging::PackagingId;
use crate::supplier::SupplierId;

uuid_id!(
    /// Product identifier.
    ProductId
);

uuid_id!(
    /// Ingredient-metadata identifier.
    IngredientId
);

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Deactivated,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Deactivated => "deactivated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProductStatus::Active),
            "deactivated" => Some(ProductStatus::Deactivated),
            _ => None,
        }
    }
}

/// Catalog item. Belongs to a department; tracked in whole units of
/// `unit` (e.g. "kg", "ea").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    department_id: DepartmentId,
    unit: String,
    packaging_id: Option<PackagingId>,
    default_supplier_id: Option<SupplierId>,
    status: ProductStatus,
    created_at: DateTime<Utc>,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        department_id: DepartmentId,
        unit: impl Into<String>,
        packaging_id: Option<PackagingId>,
        default_supplier_id: Option<SupplierId>,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let sku = sku.into();
        let name = name.into();
        let unit = unit.into();
        if sku.trim().is_empty() {
            return Err(LedgerError::validation("sku cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::validation("product name cannot be empty"));
        }
        if unit.trim().is_empty() {
            return Err(LedgerError::validation("unit of measure cannot be empty"));
        }
        Ok(Self {
            id,
            sku,
            name,
            department_id,
            unit,
            packaging_id,
            default_supplier_id,
            status: ProductStatus::Active,
            created_at,
        })
    }

    /// Rehydrate from stored state (store layer only).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ProductId,
        sku: String,
        name: String,
        department_id: DepartmentId,
        unit: String,
        packaging_id: Option<PackagingId>,
        default_supplier_id: Option<SupplierId>,
        status: ProductStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sku,
            name,
            department_id,
            unit,
            packaging_id,
            default_supplier_id,
            status,
            created_at,
        }
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn department_id(&self) -> DepartmentId {
        self.department_id
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn packaging_id(&self) -> Option<PackagingId> {
        self.packaging_id
    }

    pub fn default_supplier_id(&self) -> Option<SupplierId> {
        self.default_supplier_id
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Soft-deactivate. Deactivated products keep their history but reject
    /// new receipts, sales, and recipe references.
    pub fn deactivate(&mut self) -> LedgerResult<()> {
        if self.status == ProductStatus::Deactivated {
            return Err(LedgerError::invalid_state("product already deactivated"));
        }
        self.status = ProductStatus::Deactivated;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Ingredient metadata for a product that can appear in recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    id: IngredientId,
    product_id: ProductId,
    allergen: bool,
    notes: Option<String>,
}

impl Ingredient {
    pub fn new(
        id: IngredientId,
        product_id: ProductId,
        allergen: bool,
        notes: Option<String>,
    ) -> Self {
        Self {
            id,
            product_id,
            allergen,
            notes,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn is_allergen(&self) -> bool {
        self.allergen
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Entity for Ingredient {
    type Id = IngredientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
