//! Service traits for the traceability ledger and its reference data.
//!
//! Implementations must execute every mutating ledger operation as one
//! atomic unit: the availability checks and the writes they justify happen
//! inside the same transaction boundary, and a failed operation leaves no
//! partial state. `ConcurrencyConflict` may be retried transparently a
//! bounded number of times; business failures are surfaced as-is.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use lotledger_catalog::{
    Department, DepartmentId, Ingredient, Packaging, Product, ProductId, Recipe, RecipeId,
    Supplier, SupplierDepartment, SupplierId,
};
use lotledger_core::{LedgerResult, UserId};
use lotledger_inventory::{
    ExpiredProduct, InventoryTransaction, LotId, ReceivedProduct, TransactionKind,
};
use lotledger_production::RecipeProduction;
use lotledger_quality::{CheckStatus, CheckTarget, QualityCheck, QualityCheckType, QualityCheckTypeId};
use lotledger_sales::{Sale, SaleItemInput};

// -------------------------
// Commands
// -------------------------

/// Input to `receive_stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub quantity: i64,
    pub received_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub supplier_invoice: Option<String>,
    pub storage_location: Option<String>,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Input to `record_sale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub items: Vec<SaleItemInput>,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Input to `produce_recipe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceRecipe {
    pub recipe_id: RecipeId,
    pub batch_multiplier: i64,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Input to `mark_expired`. `as_of` is the calendar date the expiry check
/// runs against (callers pass today).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkExpired {
    pub lot_id: LotId,
    pub as_of: NaiveDate,
    pub removed_by: UserId,
    pub occurred_at: DateTime<Utc>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Input to `record_quality_check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQualityCheck {
    pub check_type_id: QualityCheckTypeId,
    pub target: CheckTarget,
    pub status: CheckStatus,
    pub notes: Option<String>,
    pub checked_by: UserId,
    pub checked_at: DateTime<Utc>,
}

/// Input to `adjust_stock` (stocktake correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

// -------------------------
// Read models
// -------------------------

/// One row of the current-inventory listing (reference data joined in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub department_name: String,
    pub unit: String,
    pub quantity: i64,
}

/// Optional filters for the transaction listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub product_id: Option<ProductId>,
    pub kind: Option<TransactionKind>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

/// Aggregate view of one supplier invoice across its lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub supplier_id: SupplierId,
    pub supplier_invoice: String,
    pub total_lots: i64,
    pub total_quantity: i64,
    pub first_received: NaiveDate,
    pub last_received: NaiveDate,
}

/// Dashboard aggregates over the trailing 30 days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub quality_checks_total: i64,
    pub quality_checks_passed: i64,
    pub expired_lots: i64,
    pub expiring_soon_lots: i64,
    pub receipts: i64,
    pub received_quantity: i64,
    pub total_stock: i64,
}

/// One row of the `product_report` materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReportRow {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub department_name: String,
    pub quantity: i64,
    pub open_lots: i64,
    pub last_received: Option<NaiveDate>,
    pub last_sold: Option<DateTime<Utc>>,
    pub refreshed_at: DateTime<Utc>,
}

// -------------------------
// Traits
// -------------------------

/// Reference-data maintenance. Administrative, low-contention; values are
/// validated by their domain constructors before they reach a store.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn create_department(&self, department: Department) -> LedgerResult<()>;
    async fn create_supplier(&self, supplier: Supplier) -> LedgerResult<()>;
    async fn link_supplier_department(&self, link: SupplierDepartment) -> LedgerResult<()>;
    async fn create_packaging(&self, packaging: Packaging) -> LedgerResult<()>;
    async fn create_product(&self, product: Product) -> LedgerResult<()>;
    async fn deactivate_product(&self, product_id: ProductId) -> LedgerResult<()>;
    async fn register_ingredient(&self, ingredient: Ingredient) -> LedgerResult<()>;
    async fn create_recipe(&self, recipe: Recipe) -> LedgerResult<()>;
    async fn create_check_type(&self, check_type: QualityCheckType) -> LedgerResult<()>;
    async fn register_user(&self, user_id: UserId, display_name: String) -> LedgerResult<()>;

    async fn get_product(&self, product_id: ProductId) -> LedgerResult<Product>;
    async fn list_products(&self) -> LedgerResult<Vec<Product>>;
    async fn get_recipe(&self, recipe_id: RecipeId) -> LedgerResult<Recipe>;
    async fn get_department(&self, department_id: DepartmentId) -> LedgerResult<Department>;
    async fn get_supplier(&self, supplier_id: SupplierId) -> LedgerResult<Supplier>;
}

/// The traceability ledger: invariant-preserving mutations plus the read
/// queries the UI and reporting side consume.
#[async_trait]
pub trait TraceabilityLedger: Send + Sync {
    // Mutations (each one atomic transaction).
    async fn receive_stock(&self, cmd: ReceiveStock) -> LedgerResult<ReceivedProduct>;
    async fn record_sale(&self, cmd: RecordSale) -> LedgerResult<Sale>;
    async fn produce_recipe(&self, cmd: ProduceRecipe) -> LedgerResult<RecipeProduction>;
    async fn mark_expired(&self, cmd: MarkExpired) -> LedgerResult<ExpiredProduct>;
    async fn record_quality_check(&self, cmd: RecordQualityCheck) -> LedgerResult<QualityCheck>;
    async fn adjust_stock(&self, cmd: AdjustStock) -> LedgerResult<InventoryTransaction>;

    // Traceability queries.
    async fn trace_lot(&self, lot_id: LotId) -> LedgerResult<Vec<InventoryTransaction>>;
    async fn get_lot(&self, lot_id: LotId) -> LedgerResult<ReceivedProduct>;
    async fn current_inventory(&self, product_id: ProductId) -> LedgerResult<i64>;
    async fn inventory_listing(&self) -> LedgerResult<Vec<InventoryRow>>;
    async fn transactions(
        &self,
        filter: TransactionFilter,
    ) -> LedgerResult<Vec<InventoryTransaction>>;

    // Expiry queries.
    async fn expiring_lots(
        &self,
        as_of: NaiveDate,
        within_days: i64,
    ) -> LedgerResult<Vec<ReceivedProduct>>;
    async fn expired_lots(&self, as_of: NaiveDate) -> LedgerResult<Vec<ReceivedProduct>>;
    async fn expired_writeoffs(&self) -> LedgerResult<Vec<ExpiredProduct>>;

    // Reporting.
    async fn low_stock(&self, threshold: i64) -> LedgerResult<Vec<InventoryRow>>;
    async fn invoice_in_use(
        &self,
        supplier_id: SupplierId,
        supplier_invoice: &str,
    ) -> LedgerResult<bool>;
    async fn invoice_summary(
        &self,
        supplier_id: SupplierId,
        supplier_invoice: &str,
    ) -> LedgerResult<InvoiceSummary>;
    async fn dashboard_summary(&self, as_of: DateTime<Utc>) -> LedgerResult<DashboardSummary>;
    async fn refresh_product_report(&self, now: DateTime<Utc>) -> LedgerResult<u64>;
    async fn product_report(&self) -> LedgerResult<Vec<ProductReportRow>>;
}
