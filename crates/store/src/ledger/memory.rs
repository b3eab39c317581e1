//! In-memory store.
//!
//! Intended for tests/dev. Mutations take the state write lock for their
//! whole duration, which gives the same atomicity the Postgres store gets
//! from SQL transactions. Not optimized for performance.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};

use lotledger_catalog::{
    Department, DepartmentId, Ingredient, IngredientId, Packaging, PackagingId, Product,
    ProductId, Recipe, RecipeId, Supplier, SupplierDepartment, SupplierId,
};
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId};
use lotledger_inventory::{
    ExpiredProduct, InventoryTransaction, LotId, LotPool, OpenLot, ReceivedProduct,
    TransactionKind, plan_adjustment, plan_expiry, plan_receipt, sort_trace,
};
use lotledger_production::{ProductionId, RecipeProduction, plan_production};
use lotledger_quality::{
    CheckTarget, QualityCheck, QualityCheckId, QualityCheckType, QualityCheckTypeId,
};
use lotledger_sales::{Sale, SaleId, plan_sale};

use super::r#trait::{
    AdjustStock, Catalog, DashboardSummary, InventoryRow, InvoiceSummary, MarkExpired,
    ProduceRecipe, ProductReportRow, ReceiveStock, RecordQualityCheck, RecordSale,
    TraceabilityLedger, TransactionFilter,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, String>,
    departments: HashMap<DepartmentId, Department>,
    suppliers: HashMap<SupplierId, Supplier>,
    supplier_departments: HashSet<SupplierDepartment>,
    packaging: HashMap<PackagingId, Packaging>,
    ingredients: HashMap<IngredientId, Ingredient>,
    products: HashMap<ProductId, Product>,
    recipes: HashMap<RecipeId, Recipe>,
    check_types: HashMap<QualityCheckTypeId, QualityCheckType>,

    lots: HashMap<LotId, ReceivedProduct>,
    balances: HashMap<ProductId, i64>,
    transactions: Vec<InventoryTransaction>,
    sales: HashMap<SaleId, Sale>,
    productions: HashMap<ProductionId, RecipeProduction>,
    expired: Vec<ExpiredProduct>,
    checks: Vec<QualityCheck>,
    report: Vec<ProductReportRow>,
}

impl State {
    fn require_user(&self, user_id: UserId) -> LedgerResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(LedgerError::not_found(format!("user {user_id}")))
        }
    }

    fn require_product(&self, product_id: ProductId) -> LedgerResult<&Product> {
        self.products
            .get(&product_id)
            .ok_or_else(|| LedgerError::not_found(format!("product {product_id}")))
    }

    fn require_active_product(&self, product_id: ProductId) -> LedgerResult<&Product> {
        let product = self.require_product(product_id)?;
        if !product.is_active() {
            return Err(LedgerError::invalid_state(format!(
                "product {} is deactivated",
                product.sku()
            )));
        }
        Ok(product)
    }

    fn balance(&self, product_id: ProductId) -> i64 {
        self.balances.get(&product_id).copied().unwrap_or(0)
    }

    /// Build the allocator inputs for a set of products: the open lots plus
    /// the unlotted remainder (balance minus lot remainders).
    fn pools_for(
        &self,
        product_ids: &HashSet<ProductId>,
    ) -> (HashMap<ProductId, LotPool>, HashMap<ProductId, String>) {
        let mut pools = HashMap::new();
        let mut skus = HashMap::new();
        for &product_id in product_ids {
            let open: Vec<OpenLot> = self
                .lots
                .values()
                .filter(|l| l.product_id() == product_id && l.quantity_remaining() > 0)
                .map(OpenLot::from)
                .collect();
            let lotted: i64 = open.iter().map(|l| l.remaining).sum();
            let unlotted = self.balance(product_id) - lotted;
            pools.insert(product_id, LotPool::new(open, unlotted));
            if let Some(product) = self.products.get(&product_id) {
                skus.insert(product_id, product.sku().to_string());
            }
        }
        (pools, skus)
    }

    /// Append transactions, maintaining the materialized balances and lot
    /// remainders in the same critical section.
    fn apply_transactions(
        &mut self,
        transactions: Vec<InventoryTransaction>,
    ) -> LedgerResult<()> {
        for tx in &transactions {
            let balance = self.balances.entry(tx.product_id()).or_insert(0);
            let next = *balance + tx.delta();
            if next < 0 {
                return Err(LedgerError::invalid_state(format!(
                    "balance for product {} would go negative",
                    tx.product_id()
                )));
            }
            *balance = next;

            // The receipt delta is already reflected in a fresh lot's
            // remaining quantity; only consumption flows through here.
            if tx.kind() != TransactionKind::Receipt {
                if let Some(lot_id) = tx.lot_id() {
                    let lot = self.lots.get_mut(&lot_id).ok_or_else(|| {
                        LedgerError::not_found(format!("lot {lot_id}"))
                    })?;
                    lot.apply_delta(tx.delta())?;
                }
            }
        }
        self.transactions.extend(transactions);
        Ok(())
    }

    fn inventory_row(&self, product: &Product, quantity: i64) -> InventoryRow {
        let department_name = self
            .departments
            .get(&product.department_id())
            .map(|d| d.name().to_string())
            .unwrap_or_default();
        InventoryRow {
            product_id: *product.id(),
            sku: product.sku().to_string(),
            name: product.name().to_string(),
            department_name,
            unit: product.unit().to_string(),
            quantity,
        }
    }
}

/// In-memory implementation of `Catalog` + `TraceabilityLedger`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| LedgerError::storage("state lock poisoned"))
    }

    fn write(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| LedgerError::storage("state lock poisoned"))
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn create_department(&self, department: Department) -> LedgerResult<()> {
        let mut state = self.write()?;
        if state
            .departments
            .values()
            .any(|d| d.code() == department.code())
        {
            return Err(LedgerError::validation(format!(
                "department code '{}' already exists",
                department.code()
            )));
        }
        state.departments.insert(*department.id(), department);
        Ok(())
    }

    async fn create_supplier(&self, supplier: Supplier) -> LedgerResult<()> {
        let mut state = self.write()?;
        if state.suppliers.values().any(|s| s.code() == supplier.code()) {
            return Err(LedgerError::validation(format!(
                "supplier code '{}' already exists",
                supplier.code()
            )));
        }
        state.suppliers.insert(*supplier.id(), supplier);
        Ok(())
    }

    async fn link_supplier_department(&self, link: SupplierDepartment) -> LedgerResult<()> {
        let mut state = self.write()?;
        if !state.suppliers.contains_key(&link.supplier_id) {
            return Err(LedgerError::not_found(format!(
                "supplier {}",
                link.supplier_id
            )));
        }
        if !state.departments.contains_key(&link.department_id) {
            return Err(LedgerError::not_found(format!(
                "department {}",
                link.department_id
            )));
        }
        if !state.supplier_departments.insert(link) {
            return Err(LedgerError::validation(
                "supplier is already linked to this department",
            ));
        }
        Ok(())
    }

    async fn create_packaging(&self, packaging: Packaging) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.packaging.insert(*packaging.id(), packaging);
        Ok(())
    }

    async fn create_product(&self, product: Product) -> LedgerResult<()> {
        let mut state = self.write()?;
        if !state.departments.contains_key(&product.department_id()) {
            return Err(LedgerError::not_found(format!(
                "department {}",
                product.department_id()
            )));
        }
        if let Some(packaging_id) = product.packaging_id() {
            if !state.packaging.contains_key(&packaging_id) {
                return Err(LedgerError::not_found(format!("packaging {packaging_id}")));
            }
        }
        if let Some(supplier_id) = product.default_supplier_id() {
            if !state.suppliers.contains_key(&supplier_id) {
                return Err(LedgerError::not_found(format!("supplier {supplier_id}")));
            }
        }
        if state.products.values().any(|p| p.sku() == product.sku()) {
            return Err(LedgerError::validation(format!(
                "sku '{}' already exists",
                product.sku()
            )));
        }
        state.products.insert(*product.id(), product);
        Ok(())
    }

    async fn deactivate_product(&self, product_id: ProductId) -> LedgerResult<()> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(|| LedgerError::not_found(format!("product {product_id}")))?;
        product.deactivate()
    }

    async fn register_ingredient(&self, ingredient: Ingredient) -> LedgerResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(&ingredient.product_id()) {
            return Err(LedgerError::not_found(format!(
                "product {}",
                ingredient.product_id()
            )));
        }
        if state
            .ingredients
            .values()
            .any(|i| i.product_id() == ingredient.product_id())
        {
            return Err(LedgerError::validation(
                "ingredient metadata already registered for this product",
            ));
        }
        state.ingredients.insert(*ingredient.id(), ingredient);
        Ok(())
    }

    async fn create_recipe(&self, recipe: Recipe) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.require_active_product(recipe.output_product_id())?;
        for ingredient in recipe.ingredients() {
            state.require_active_product(ingredient.product_id)?;
        }
        state.recipes.insert(*recipe.id(), recipe);
        Ok(())
    }

    async fn create_check_type(&self, check_type: QualityCheckType) -> LedgerResult<()> {
        let mut state = self.write()?;
        if let Some(department_id) = check_type.department_id() {
            if !state.departments.contains_key(&department_id) {
                return Err(LedgerError::not_found(format!(
                    "department {department_id}"
                )));
            }
        }
        if state
            .check_types
            .values()
            .any(|t| t.name() == check_type.name())
        {
            return Err(LedgerError::validation(format!(
                "check type '{}' already exists",
                check_type.name()
            )));
        }
        state.check_types.insert(*check_type.id(), check_type);
        Ok(())
    }

    async fn register_user(&self, user_id: UserId, display_name: String) -> LedgerResult<()> {
        let mut state = self.write()?;
        if state.users.contains_key(&user_id) {
            return Err(LedgerError::validation("user already registered"));
        }
        state.users.insert(user_id, display_name);
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> LedgerResult<Product> {
        let state = self.read()?;
        state.require_product(product_id).cloned()
    }

    async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        let state = self.read()?;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(products)
    }

    async fn get_recipe(&self, recipe_id: RecipeId) -> LedgerResult<Recipe> {
        let state = self.read()?;
        state
            .recipes
            .get(&recipe_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(format!("recipe {recipe_id}")))
    }

    async fn get_department(&self, department_id: DepartmentId) -> LedgerResult<Department> {
        let state = self.read()?;
        state
            .departments
            .get(&department_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(format!("department {department_id}")))
    }

    async fn get_supplier(&self, supplier_id: SupplierId) -> LedgerResult<Supplier> {
        let state = self.read()?;
        state
            .suppliers
            .get(&supplier_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(format!("supplier {supplier_id}")))
    }
}

#[async_trait]
impl TraceabilityLedger for MemoryStore {
    async fn receive_stock(&self, cmd: ReceiveStock) -> LedgerResult<ReceivedProduct> {
        let mut state = self.write()?;
        state.require_user(cmd.recorded_by)?;
        state.require_active_product(cmd.product_id)?;
        if !state.suppliers.contains_key(&cmd.supplier_id) {
            return Err(LedgerError::not_found(format!(
                "supplier {}",
                cmd.supplier_id
            )));
        }

        let lot = ReceivedProduct::receive(
            LotId::new(),
            cmd.product_id,
            cmd.supplier_id,
            cmd.received_date,
            cmd.expiry_date,
            cmd.quantity,
            cmd.supplier_invoice,
            cmd.storage_location,
            cmd.occurred_at,
        )?;
        let receipt = plan_receipt(&lot, cmd.recorded_by, cmd.occurred_at)?;

        state.lots.insert(*lot.id(), lot.clone());
        state.apply_transactions(vec![receipt])?;
        Ok(lot)
    }

    async fn record_sale(&self, cmd: RecordSale) -> LedgerResult<Sale> {
        let mut state = self.write()?;
        state.require_user(cmd.recorded_by)?;
        let mut product_ids = HashSet::new();
        for item in &cmd.items {
            state.require_active_product(item.product_id)?;
            product_ids.insert(item.product_id);
        }

        let (mut pools, skus) = state.pools_for(&product_ids);
        let plan = plan_sale(
            SaleId::new(),
            &cmd.items,
            &mut pools,
            &skus,
            cmd.recorded_by,
            cmd.occurred_at,
        )?;

        state.sales.insert(*plan.sale.id(), plan.sale.clone());
        state.apply_transactions(plan.transactions)?;
        Ok(plan.sale)
    }

    async fn produce_recipe(&self, cmd: ProduceRecipe) -> LedgerResult<RecipeProduction> {
        let mut state = self.write()?;
        state.require_user(cmd.recorded_by)?;
        let recipe = state
            .recipes
            .get(&cmd.recipe_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(format!("recipe {}", cmd.recipe_id)))?;
        state.require_active_product(recipe.output_product_id())?;
        for ingredient in recipe.ingredients() {
            state.require_active_product(ingredient.product_id)?;
        }

        let product_ids: HashSet<ProductId> = recipe
            .ingredients()
            .iter()
            .map(|i| i.product_id)
            .chain([recipe.output_product_id()])
            .collect();
        let (mut pools, skus) = state.pools_for(&product_ids);

        let plan = plan_production(
            ProductionId::new(),
            &recipe,
            cmd.batch_multiplier,
            &mut pools,
            &skus,
            cmd.recorded_by,
            cmd.occurred_at,
        )?;

        state
            .productions
            .insert(*plan.production.id(), plan.production.clone());
        state.apply_transactions(plan.transactions)?;
        Ok(plan.production)
    }

    async fn mark_expired(&self, cmd: MarkExpired) -> LedgerResult<ExpiredProduct> {
        let mut state = self.write()?;
        state.require_user(cmd.removed_by)?;
        let lot = state
            .lots
            .get(&cmd.lot_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(format!("lot {}", cmd.lot_id)))?;

        let plan = plan_expiry(
            &lot,
            cmd.as_of,
            cmd.removed_by,
            cmd.occurred_at,
            cmd.category,
            cmd.notes,
        )?;

        state.expired.push(plan.record.clone());
        state.apply_transactions(vec![plan.transaction])?;
        Ok(plan.record)
    }

    async fn record_quality_check(&self, cmd: RecordQualityCheck) -> LedgerResult<QualityCheck> {
        let mut state = self.write()?;
        state.require_user(cmd.checked_by)?;
        if !state.check_types.contains_key(&cmd.check_type_id) {
            return Err(LedgerError::not_found(format!(
                "quality check type {}",
                cmd.check_type_id
            )));
        }
        match cmd.target {
            CheckTarget::Lot(lot_id) => {
                if !state.lots.contains_key(&lot_id) {
                    return Err(LedgerError::not_found(format!("lot {lot_id}")));
                }
            }
            CheckTarget::Product(product_id) => {
                state.require_product(product_id)?;
            }
        }

        let check = QualityCheck::new(
            QualityCheckId::new(),
            cmd.check_type_id,
            cmd.target,
            cmd.status,
            cmd.notes,
            cmd.checked_at,
            cmd.checked_by,
        );
        state.checks.push(check.clone());
        Ok(check)
    }

    async fn adjust_stock(&self, cmd: AdjustStock) -> LedgerResult<InventoryTransaction> {
        let mut state = self.write()?;
        state.require_user(cmd.recorded_by)?;
        let product = state.require_active_product(cmd.product_id)?;
        let sku = product.sku().to_string();
        let available = state.balance(cmd.product_id);

        let tx = plan_adjustment(
            cmd.product_id,
            &sku,
            available,
            cmd.delta,
            cmd.recorded_by,
            cmd.occurred_at,
            cmd.notes,
        )?;
        state.apply_transactions(vec![tx.clone()])?;
        Ok(tx)
    }

    async fn trace_lot(&self, lot_id: LotId) -> LedgerResult<Vec<InventoryTransaction>> {
        let state = self.read()?;
        if !state.lots.contains_key(&lot_id) {
            return Err(LedgerError::not_found(format!("lot {lot_id}")));
        }
        let mut trace: Vec<InventoryTransaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.lot_id() == Some(lot_id))
            .cloned()
            .collect();
        sort_trace(&mut trace);
        Ok(trace)
    }

    async fn get_lot(&self, lot_id: LotId) -> LedgerResult<ReceivedProduct> {
        let state = self.read()?;
        state
            .lots
            .get(&lot_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(format!("lot {lot_id}")))
    }

    async fn current_inventory(&self, product_id: ProductId) -> LedgerResult<i64> {
        let state = self.read()?;
        state.require_product(product_id)?;
        Ok(state.balance(product_id))
    }

    async fn inventory_listing(&self) -> LedgerResult<Vec<InventoryRow>> {
        let state = self.read()?;
        let mut rows: Vec<InventoryRow> = state
            .products
            .values()
            .filter_map(|p| {
                let quantity = state.balance(*p.id());
                (quantity > 0).then(|| state.inventory_row(p, quantity))
            })
            .collect();
        rows.sort_by(|a, b| {
            a.department_name
                .cmp(&b.department_name)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    async fn transactions(
        &self,
        filter: TransactionFilter,
    ) -> LedgerResult<Vec<InventoryTransaction>> {
        let state = self.read()?;
        let mut txs: Vec<InventoryTransaction> = state
            .transactions
            .iter()
            .filter(|tx| {
                filter.product_id.is_none_or(|p| tx.product_id() == p)
                    && filter.kind.is_none_or(|k| tx.kind() == k)
                    && filter.occurred_after.is_none_or(|t| tx.occurred_at() >= t)
                    && filter.occurred_before.is_none_or(|t| tx.occurred_at() <= t)
            })
            .cloned()
            .collect();
        sort_trace(&mut txs);
        txs.reverse(); // newest first, as the UI lists them
        Ok(txs)
    }

    async fn expiring_lots(
        &self,
        as_of: NaiveDate,
        within_days: i64,
    ) -> LedgerResult<Vec<ReceivedProduct>> {
        if within_days < 0 {
            return Err(LedgerError::validation("within_days must be non-negative"));
        }
        let horizon = as_of
            .checked_add_days(Days::new(within_days as u64))
            .ok_or_else(|| LedgerError::validation("within_days out of range"))?;
        let state = self.read()?;
        let mut lots: Vec<ReceivedProduct> = state
            .lots
            .values()
            .filter(|l| {
                l.quantity_remaining() > 0
                    && !l.is_expired(as_of)
                    && l.expiry_date() <= horizon
            })
            .cloned()
            .collect();
        lots.sort_by_key(|l| (l.expiry_date(), *l.id()));
        Ok(lots)
    }

    async fn expired_lots(&self, as_of: NaiveDate) -> LedgerResult<Vec<ReceivedProduct>> {
        let state = self.read()?;
        let mut lots: Vec<ReceivedProduct> = state
            .lots
            .values()
            .filter(|l| l.quantity_remaining() > 0 && l.is_expired(as_of))
            .cloned()
            .collect();
        lots.sort_by_key(|l| (l.expiry_date(), *l.id()));
        Ok(lots)
    }

    async fn expired_writeoffs(&self) -> LedgerResult<Vec<ExpiredProduct>> {
        let state = self.read()?;
        let mut records = state.expired.clone();
        records.sort_by_key(|r| std::cmp::Reverse(r.removed_at));
        Ok(records)
    }

    async fn low_stock(&self, threshold: i64) -> LedgerResult<Vec<InventoryRow>> {
        let state = self.read()?;
        let mut rows: Vec<InventoryRow> = state
            .balances
            .iter()
            .filter(|&(_, &quantity)| quantity <= threshold)
            .filter_map(|(product_id, &quantity)| {
                state
                    .products
                    .get(product_id)
                    .map(|p| state.inventory_row(p, quantity))
            })
            .collect();
        rows.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.sku.cmp(&b.sku)));
        Ok(rows)
    }

    async fn invoice_in_use(
        &self,
        supplier_id: SupplierId,
        supplier_invoice: &str,
    ) -> LedgerResult<bool> {
        let state = self.read()?;
        Ok(state.lots.values().any(|l| {
            l.supplier_id() == supplier_id && l.supplier_invoice() == Some(supplier_invoice)
        }))
    }

    async fn invoice_summary(
        &self,
        supplier_id: SupplierId,
        supplier_invoice: &str,
    ) -> LedgerResult<InvoiceSummary> {
        let state = self.read()?;
        let lots: Vec<&ReceivedProduct> = state
            .lots
            .values()
            .filter(|l| {
                l.supplier_id() == supplier_id
                    && l.supplier_invoice() == Some(supplier_invoice)
            })
            .collect();
        if lots.is_empty() {
            return Err(LedgerError::not_found(format!(
                "invoice '{supplier_invoice}' for supplier {supplier_id}"
            )));
        }
        Ok(InvoiceSummary {
            supplier_id,
            supplier_invoice: supplier_invoice.to_string(),
            total_lots: lots.len() as i64,
            total_quantity: lots.iter().map(|l| l.quantity_received()).sum(),
            first_received: lots.iter().map(|l| l.received_date()).min().unwrap_or_default(),
            last_received: lots.iter().map(|l| l.received_date()).max().unwrap_or_default(),
        })
    }

    async fn dashboard_summary(&self, as_of: DateTime<Utc>) -> LedgerResult<DashboardSummary> {
        let state = self.read()?;
        let window_start = as_of - chrono::Duration::days(30);
        let today = as_of.date_naive();

        let recent_checks: Vec<&QualityCheck> = state
            .checks
            .iter()
            .filter(|c| c.checked_at() >= window_start)
            .collect();
        let passed = recent_checks
            .iter()
            .filter(|c| c.status() == lotledger_quality::CheckStatus::Passed)
            .count() as i64;

        let expired_lots = state
            .lots
            .values()
            .filter(|l| l.quantity_remaining() > 0 && l.is_expired(today))
            .count() as i64;
        let horizon = today
            .checked_add_days(Days::new(30))
            .unwrap_or(today);
        let expiring_soon = state
            .lots
            .values()
            .filter(|l| {
                l.quantity_remaining() > 0
                    && !l.is_expired(today)
                    && l.expiry_date() <= horizon
            })
            .count() as i64;

        let recent_lots: Vec<&ReceivedProduct> = state
            .lots
            .values()
            .filter(|l| l.received_date() >= window_start.date_naive())
            .collect();

        Ok(DashboardSummary {
            quality_checks_total: recent_checks.len() as i64,
            quality_checks_passed: passed,
            expired_lots,
            expiring_soon_lots: expiring_soon,
            receipts: recent_lots.len() as i64,
            received_quantity: recent_lots.iter().map(|l| l.quantity_received()).sum(),
            total_stock: state.balances.values().sum(),
        })
    }

    async fn refresh_product_report(&self, now: DateTime<Utc>) -> LedgerResult<u64> {
        let mut state = self.write()?;
        let mut rows = Vec::with_capacity(state.products.len());
        for product in state.products.values() {
            let product_id = *product.id();
            let open_lots = state
                .lots
                .values()
                .filter(|l| l.product_id() == product_id && l.quantity_remaining() > 0)
                .count() as i64;
            let last_received = state
                .lots
                .values()
                .filter(|l| l.product_id() == product_id)
                .map(|l| l.received_date())
                .max();
            let last_sold = state
                .transactions
                .iter()
                .filter(|t| {
                    t.product_id() == product_id && t.kind() == TransactionKind::Sale
                })
                .map(|t| t.occurred_at())
                .max();
            let department_name = state
                .departments
                .get(&product.department_id())
                .map(|d| d.name().to_string())
                .unwrap_or_default();
            rows.push(ProductReportRow {
                product_id,
                sku: product.sku().to_string(),
                name: product.name().to_string(),
                department_name,
                quantity: state.balance(product_id),
                open_lots,
                last_received,
                last_sold,
                refreshed_at: now,
            });
        }
        rows.sort_by(|a, b| a.sku.cmp(&b.sku));
        let count = rows.len() as u64;
        state.report = rows;
        Ok(count)
    }

    async fn product_report(&self) -> LedgerResult<Vec<ProductReportRow>> {
        let state = self.read()?;
        Ok(state.report.clone())
    }
}
