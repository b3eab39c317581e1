use chrono::NaiveDate;
use serde::Deserialize;

use lotledger_catalog::{DepartmentId, PackagingId, ProductId, SupplierId};
use lotledger_core::UserId;
use lotledger_quality::{CheckStatus, CheckTarget, QualityCheckTypeId};

// -------------------------
// Catalog requests
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePackagingRequest {
    pub description: String,
    pub units_per_package: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub department_id: DepartmentId,
    pub unit: String,
    #[serde(default)]
    pub packaging_id: Option<PackagingId>,
    #[serde(default)]
    pub default_supplier_id: Option<SupplierId>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterIngredientRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub allergen: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeIngredientRequest {
    pub product_id: ProductId,
    pub quantity_per_batch: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub output_product_id: ProductId,
    pub output_quantity: i64,
    pub ingredients: Vec<RecipeIngredientRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckTypeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub display_name: String,
}

// -------------------------
// Ledger requests
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ReceiveStockRequest {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub quantity: i64,
    pub received_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub supplier_invoice: Option<String>,
    #[serde(default)]
    pub storage_location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ProduceRecipeRequest {
    pub batch_multiplier: i64,
}

#[derive(Debug, Deserialize)]
pub struct MarkExpiredRequest {
    /// Calendar date the expiry check runs against; defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordQualityCheckRequest {
    pub check_type_id: QualityCheckTypeId,
    pub target: CheckTarget,
    pub status: CheckStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub product_id: ProductId,
    pub delta: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub after: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub before: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    #[serde(default)]
    pub threshold: Option<i64>,
}
