//! Postgres-backed store.
//!
//! Every mutating ledger operation runs as one SQL transaction: the rows the
//! availability check depends on (`inventory` balances, open
//! `received_products` lots) are taken with `SELECT … FOR UPDATE`, the plan
//! is computed from the locked state, and the resulting inserts/updates
//! commit together or not at all. Two concurrent sales against the same
//! product serialize on the balance row; the loser of a deadlock or
//! serialization failure is retried a bounded number of times before
//! `ConcurrencyConflict` reaches the caller.
//!
//! ## Error mapping
//!
//! | PostgreSQL error code | LedgerError | Scenario |
//! |-----------------------|-------------|----------|
//! | `23505` unique violation | `Validation` | duplicate sku/code/name |
//! | `23503` foreign key violation | `NotFound` | dangling reference |
//! | `23514` check violation | `Validation` | constraint-violating values |
//! | `40001`, `40P01`, `55P03` | `ConcurrencyConflict` | serialization failure, deadlock, lock timeout |
//! | anything else | `Storage` | pool/IO faults |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use lotledger_catalog::{
    ContactInfo, Department, DepartmentId, Ingredient, Packaging, Product, ProductId,
    ProductStatus, Recipe, RecipeId, RecipeIngredient, Supplier, SupplierDepartment, SupplierId,
    SupplierStatus,
};
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId};
use lotledger_inventory::{
    ExpiredProduct, ExpiredProductId, InventoryTransaction, LotId, LotPool, OpenLot,
    ReceivedProduct, TransactionId, TransactionKind, plan_adjustment, plan_expiry, plan_receipt,
};
use lotledger_production::{ProductionId, RecipeProduction, plan_production};
use lotledger_quality::{CheckTarget, QualityCheck, QualityCheckId, QualityCheckType};
use lotledger_sales::{Sale, SaleId, plan_sale};

use super::r#trait::{
    AdjustStock, Catalog, DashboardSummary, InventoryRow, InvoiceSummary, MarkExpired,
    ProduceRecipe, ProductReportRow, ReceiveStock, RecordQualityCheck, RecordSale,
    TraceabilityLedger, TransactionFilter,
};
use crate::retry::with_retry;

/// Postgres-backed implementation of `Catalog` + `TraceabilityLedger`.
///
/// Thread-safe: the SQLx pool is `Send + Sync` and handles connection
/// management; the store itself holds no other state.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect with a small default pool.
    pub async fn connect(database_url: &str) -> LedgerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations from `crates/store/migrations`.
    pub async fn migrate(&self) -> LedgerResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| LedgerError::storage(format!("migration failed: {e}")))
    }

    async fn begin(&self) -> LedgerResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    /// Load sku + status for a set of products, erroring on the first
    /// missing or deactivated one.
    async fn load_active_skus(
        tx: &mut Transaction<'_, Postgres>,
        product_ids: &HashSet<ProductId>,
    ) -> LedgerResult<HashMap<ProductId, String>> {
        let ids: Vec<Uuid> = product_ids.iter().map(|p| *p.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT product_id, sku, status FROM products WHERE product_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_products", e))?;

        let mut skus = HashMap::new();
        for row in rows {
            let product_id: Uuid = try_get(&row, "product_id")?;
            let sku: String = try_get(&row, "sku")?;
            let status: String = try_get(&row, "status")?;
            if ProductStatus::parse(&status) != Some(ProductStatus::Active) {
                return Err(LedgerError::invalid_state(format!(
                    "product {sku} is deactivated"
                )));
            }
            skus.insert(ProductId::from_uuid(product_id), sku);
        }
        for product_id in product_ids {
            if !skus.contains_key(product_id) {
                return Err(LedgerError::not_found(format!("product {product_id}")));
            }
        }
        Ok(skus)
    }

    /// Lock balances and open lots for a set of products and build the
    /// allocator pools. Must run inside the operation's transaction.
    async fn lock_pools(
        tx: &mut Transaction<'_, Postgres>,
        product_ids: &HashSet<ProductId>,
    ) -> LedgerResult<HashMap<ProductId, LotPool>> {
        let ids: Vec<Uuid> = product_ids.iter().map(|p| *p.as_uuid()).collect();

        let balance_rows = sqlx::query(
            r#"
            SELECT product_id, quantity
            FROM inventory
            WHERE product_id = ANY($1)
            ORDER BY product_id
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_balances", e))?;

        let mut balances: HashMap<ProductId, i64> = HashMap::new();
        for row in balance_rows {
            let product_id: Uuid = try_get(&row, "product_id")?;
            let quantity: i64 = try_get(&row, "quantity")?;
            balances.insert(ProductId::from_uuid(product_id), quantity);
        }

        let lot_rows = sqlx::query(
            r#"
            SELECT lot_id, product_id, expiry_date, received_date, quantity_remaining
            FROM received_products
            WHERE product_id = ANY($1) AND quantity_remaining > 0
            ORDER BY lot_id
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_lots", e))?;

        let mut open: HashMap<ProductId, Vec<OpenLot>> = HashMap::new();
        for row in lot_rows {
            let product_id = ProductId::from_uuid(try_get(&row, "product_id")?);
            open.entry(product_id).or_default().push(OpenLot {
                lot_id: LotId::from_uuid(try_get(&row, "lot_id")?),
                expiry_date: try_get(&row, "expiry_date")?,
                received_date: try_get(&row, "received_date")?,
                remaining: try_get(&row, "quantity_remaining")?,
            });
        }

        let mut pools = HashMap::new();
        for &product_id in product_ids {
            let lots = open.remove(&product_id).unwrap_or_default();
            let lotted: i64 = lots.iter().map(|l| l.remaining).sum();
            let unlotted = balances.get(&product_id).copied().unwrap_or(0) - lotted;
            pools.insert(product_id, LotPool::new(lots, unlotted));
        }
        Ok(pools)
    }

    /// Insert ledger entries and maintain the materialized balances and lot
    /// remainders, all inside the caller's transaction.
    async fn apply_ledger_writes(
        tx: &mut Transaction<'_, Postgres>,
        transactions: &[InventoryTransaction],
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        for entry in transactions {
            sqlx::query(
                r#"
                INSERT INTO inventory_transactions (
                    transaction_id, product_id, lot_id, kind, delta,
                    occurred_at, reference_id, recorded_by, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Entity::id(entry).as_uuid())
            .bind(entry.product_id().as_uuid())
            .bind(entry.lot_id().map(|l| *l.as_uuid()))
            .bind(entry.kind().as_str())
            .bind(entry.delta())
            .bind(entry.occurred_at())
            .bind(entry.reference_id())
            .bind(entry.recorded_by().as_uuid())
            .bind(entry.notes())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_transaction", e))?;

            // The receipt's lot row is inserted with its remaining quantity
            // already equal to the received quantity.
            if entry.kind() != TransactionKind::Receipt {
                if let Some(lot_id) = entry.lot_id() {
                    sqlx::query(
                        r#"
                        UPDATE received_products
                        SET quantity_remaining = quantity_remaining + $2
                        WHERE lot_id = $1
                        "#,
                    )
                    .bind(lot_id.as_uuid())
                    .bind(entry.delta())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_lot_remaining", e))?;
                }
            }
        }

        let mut per_product: HashMap<ProductId, i64> = HashMap::new();
        for entry in transactions {
            *per_product.entry(entry.product_id()).or_insert(0) += entry.delta();
        }
        for (product_id, delta) in per_product {
            sqlx::query(
                r#"
                INSERT INTO inventory (product_id, quantity, last_updated)
                VALUES ($1, $2, $3)
                ON CONFLICT (product_id)
                DO UPDATE SET
                    quantity = inventory.quantity + EXCLUDED.quantity,
                    last_updated = EXCLUDED.last_updated
                "#,
            )
            .bind(product_id.as_uuid())
            .bind(delta)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_balance", e))?;
        }
        Ok(())
    }

    async fn receive_stock_once(&self, cmd: ReceiveStock) -> LedgerResult<ReceivedProduct> {
        let mut tx = self.begin().await?;

        Self::load_active_skus(&mut tx, &HashSet::from([cmd.product_id])).await?;
        let supplier_exists: bool =
            sqlx::query("SELECT EXISTS (SELECT 1 FROM suppliers WHERE supplier_id = $1) AS found")
                .bind(cmd.supplier_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_supplier", e))
                .and_then(|row| try_get(&row, "found"))?;
        if !supplier_exists {
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

        sqlx::query(
            r#"
            INSERT INTO received_products (
                lot_id, product_id, supplier_id, received_date, expiry_date,
                quantity_received, quantity_remaining, supplier_invoice,
                storage_location, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(lot.id().as_uuid())
        .bind(lot.product_id().as_uuid())
        .bind(lot.supplier_id().as_uuid())
        .bind(lot.received_date())
        .bind(lot.expiry_date())
        .bind(lot.quantity_received())
        .bind(lot.quantity_remaining())
        .bind(lot.supplier_invoice())
        .bind(lot.storage_location())
        .bind(lot.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_lot", e))?;

        Self::apply_ledger_writes(&mut tx, std::slice::from_ref(&receipt), cmd.occurred_at)
            .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(lot)
    }

    async fn record_sale_once(&self, cmd: RecordSale) -> LedgerResult<Sale> {
        let mut tx = self.begin().await?;

        let product_ids: HashSet<ProductId> =
            cmd.items.iter().map(|i| i.product_id).collect();
        let skus = Self::load_active_skus(&mut tx, &product_ids).await?;
        let mut pools = Self::lock_pools(&mut tx, &product_ids).await?;

        let plan = plan_sale(
            SaleId::new(),
            &cmd.items,
            &mut pools,
            &skus,
            cmd.recorded_by,
            cmd.occurred_at,
        )?;

        sqlx::query("INSERT INTO sales (sale_id, sold_at, recorded_by) VALUES ($1, $2, $3)")
            .bind(plan.sale.id().as_uuid())
            .bind(plan.sale.sold_at())
            .bind(plan.sale.recorded_by().as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_sale", e))?;

        for item in plan.sale.items() {
            sqlx::query(
                r#"
                INSERT INTO sales_items (sale_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(plan.sale.id().as_uuid())
            .bind(item.line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_sale_item", e))?;
        }

        Self::apply_ledger_writes(&mut tx, &plan.transactions, cmd.occurred_at).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(plan.sale)
    }

    async fn produce_recipe_once(&self, cmd: ProduceRecipe) -> LedgerResult<RecipeProduction> {
        let mut tx = self.begin().await?;

        let recipe = Self::load_recipe(&mut tx, cmd.recipe_id).await?;
        let product_ids: HashSet<ProductId> = recipe
            .ingredients()
            .iter()
            .map(|i| i.product_id)
            .chain([recipe.output_product_id()])
            .collect();
        let skus = Self::load_active_skus(&mut tx, &product_ids).await?;
        let mut pools = Self::lock_pools(&mut tx, &product_ids).await?;

        let plan = plan_production(
            ProductionId::new(),
            &recipe,
            cmd.batch_multiplier,
            &mut pools,
            &skus,
            cmd.recorded_by,
            cmd.occurred_at,
        )?;

        sqlx::query(
            r#"
            INSERT INTO recipe_productions (
                production_id, recipe_id, batch_multiplier, output_product_id,
                quantity_produced, produced_at, recorded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Entity::id(&plan.production).as_uuid())
        .bind(plan.production.recipe_id().as_uuid())
        .bind(plan.production.batch_multiplier())
        .bind(plan.production.output_product_id().as_uuid())
        .bind(plan.production.quantity_produced())
        .bind(plan.production.produced_at())
        .bind(plan.production.recorded_by().as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_production", e))?;

        Self::apply_ledger_writes(&mut tx, &plan.transactions, cmd.occurred_at).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(plan.production)
    }

    async fn mark_expired_once(&self, cmd: MarkExpired) -> LedgerResult<ExpiredProduct> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT lot_id, product_id, supplier_id, received_date, expiry_date,
                   quantity_received, quantity_remaining, supplier_invoice,
                   storage_location, created_at
            FROM received_products
            WHERE lot_id = $1
            FOR UPDATE
            "#,
        )
        .bind(cmd.lot_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_lot", e))?
        .ok_or_else(|| LedgerError::not_found(format!("lot {}", cmd.lot_id)))?;
        let lot: ReceivedProduct = LotRow::from_row(&row)
            .map_err(|e| LedgerError::storage(format!("failed to decode lot row: {e}")))?
            .into();

        let plan = plan_expiry(
            &lot,
            cmd.as_of,
            cmd.removed_by,
            cmd.occurred_at,
            cmd.category,
            cmd.notes,
        )?;

        sqlx::query(
            r#"
            INSERT INTO expired_products (
                expired_id, lot_id, product_id, quantity, expiry_date,
                removed_at, removed_by, category, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(plan.record.id.as_uuid())
        .bind(plan.record.lot_id.as_uuid())
        .bind(plan.record.product_id.as_uuid())
        .bind(plan.record.quantity)
        .bind(plan.record.expiry_date)
        .bind(plan.record.removed_at)
        .bind(plan.record.removed_by.as_uuid())
        .bind(plan.record.category.as_deref())
        .bind(plan.record.notes.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_expired", e))?;

        Self::apply_ledger_writes(
            &mut tx,
            std::slice::from_ref(&plan.transaction),
            cmd.occurred_at,
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(plan.record)
    }

    async fn adjust_stock_once(&self, cmd: AdjustStock) -> LedgerResult<InventoryTransaction> {
        let mut tx = self.begin().await?;

        let skus = Self::load_active_skus(&mut tx, &HashSet::from([cmd.product_id])).await?;
        let available: i64 = sqlx::query(
            "SELECT quantity FROM inventory WHERE product_id = $1 FOR UPDATE",
        )
        .bind(cmd.product_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_balance", e))?
        .map(|row| try_get(&row, "quantity"))
        .transpose()?
        .unwrap_or(0);

        let entry = plan_adjustment(
            cmd.product_id,
            &skus[&cmd.product_id],
            available,
            cmd.delta,
            cmd.recorded_by,
            cmd.occurred_at,
            cmd.notes,
        )?;

        Self::apply_ledger_writes(&mut tx, std::slice::from_ref(&entry), cmd.occurred_at)
            .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(entry)
    }

    async fn load_recipe(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: RecipeId,
    ) -> LedgerResult<Recipe> {
        let row = sqlx::query(
            r#"
            SELECT recipe_id, name, output_product_id, output_quantity, active, created_at
            FROM recipes
            WHERE recipe_id = $1
            "#,
        )
        .bind(recipe_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_recipe", e))?
        .ok_or_else(|| LedgerError::not_found(format!("recipe {recipe_id}")))?;

        let ingredient_rows = sqlx::query(
            r#"
            SELECT product_id, quantity_per_batch
            FROM recipe_ingredients
            WHERE recipe_id = $1
            ORDER BY product_id
            "#,
        )
        .bind(recipe_id.as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_recipe_ingredients", e))?;

        let ingredients = ingredient_rows
            .iter()
            .map(|r| {
                Ok(RecipeIngredient {
                    product_id: ProductId::from_uuid(try_get(r, "product_id")?),
                    quantity_per_batch: try_get(r, "quantity_per_batch")?,
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(Recipe::from_parts(
            recipe_id,
            try_get(&row, "name")?,
            ProductId::from_uuid(try_get(&row, "output_product_id")?),
            try_get(&row, "output_quantity")?,
            ingredients,
            try_get(&row, "active")?,
            try_get(&row, "created_at")?,
        ))
    }
}

#[async_trait]
impl Catalog for PostgresStore {
    #[instrument(skip(self, department), fields(id = %department.id()), err)]
    async fn create_department(&self, department: Department) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO departments (department_id, code, name, active, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(department.id().as_uuid())
        .bind(department.code())
        .bind(department.name())
        .bind(department.is_active())
        .bind(department.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_department", e))?;
        Ok(())
    }

    #[instrument(skip(self, supplier), fields(id = %supplier.id()), err)]
    async fn create_supplier(&self, supplier: Supplier) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (supplier_id, code, name, email, phone, address, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(supplier.id().as_uuid())
        .bind(supplier.code())
        .bind(supplier.name())
        .bind(supplier.contact().email.as_deref())
        .bind(supplier.contact().phone.as_deref())
        .bind(supplier.contact().address.as_deref())
        .bind(supplier.status().as_str())
        .bind(supplier.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_supplier", e))?;
        Ok(())
    }

    async fn link_supplier_department(&self, link: SupplierDepartment) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO supplier_departments (supplier_id, department_id) VALUES ($1, $2)",
        )
        .bind(link.supplier_id.as_uuid())
        .bind(link.department_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("link_supplier_department", e))?;
        Ok(())
    }

    async fn create_packaging(&self, packaging: Packaging) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO packaging (packaging_id, description, units_per_package) VALUES ($1, $2, $3)",
        )
        .bind(packaging.id().as_uuid())
        .bind(packaging.description())
        .bind(packaging.units_per_package())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_packaging", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(sku = product.sku()), err)]
    async fn create_product(&self, product: Product) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                product_id, sku, name, department_id, unit,
                packaging_id, default_supplier_id, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id().as_uuid())
        .bind(product.sku())
        .bind(product.name())
        .bind(product.department_id().as_uuid())
        .bind(product.unit())
        .bind(product.packaging_id().map(|p| *p.as_uuid()))
        .bind(product.default_supplier_id().map(|s| *s.as_uuid()))
        .bind(product.status().as_str())
        .bind(product.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;
        Ok(())
    }

    async fn deactivate_product(&self, product_id: ProductId) -> LedgerResult<()> {
        let updated = sqlx::query(
            "UPDATE products SET status = 'deactivated' WHERE product_id = $1 AND status = 'active'",
        )
        .bind(product_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("deactivate_product", e))?;

        if updated.rows_affected() == 1 {
            return Ok(());
        }
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM products WHERE product_id = $1) AS found",
        )
        .bind(product_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("deactivate_product", e))
        .and_then(|row| try_get(&row, "found"))?;
        if exists {
            Err(LedgerError::invalid_state("product already deactivated"))
        } else {
            Err(LedgerError::not_found(format!("product {product_id}")))
        }
    }

    async fn register_ingredient(&self, ingredient: Ingredient) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ingredients (ingredient_id, product_id, allergen, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(ingredient.id().as_uuid())
        .bind(ingredient.product_id().as_uuid())
        .bind(ingredient.is_allergen())
        .bind(ingredient.notes())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_ingredient", e))?;
        Ok(())
    }

    #[instrument(skip(self, recipe), fields(name = recipe.name()), err)]
    async fn create_recipe(&self, recipe: Recipe) -> LedgerResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO recipes (recipe_id, name, output_product_id, output_quantity, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recipe.id().as_uuid())
        .bind(recipe.name())
        .bind(recipe.output_product_id().as_uuid())
        .bind(recipe.output_quantity())
        .bind(recipe.is_active())
        .bind(recipe.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_recipe", e))?;

        for ingredient in recipe.ingredients() {
            sqlx::query(
                r#"
                INSERT INTO recipe_ingredients (recipe_id, product_id, quantity_per_batch)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(recipe.id().as_uuid())
            .bind(ingredient.product_id.as_uuid())
            .bind(ingredient.quantity_per_batch)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_recipe_ingredient", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    async fn create_check_type(&self, check_type: QualityCheckType) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quality_check_types (check_type_id, name, description, department_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(check_type.id().as_uuid())
        .bind(check_type.name())
        .bind(check_type.description())
        .bind(check_type.department_id().map(|d| *d.as_uuid()))
        .bind(check_type.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_check_type", e))?;
        Ok(())
    }

    async fn register_user(&self, user_id: UserId, display_name: String) -> LedgerResult<()> {
        sqlx::query("INSERT INTO users (user_id, display_name) VALUES ($1, $2)")
            .bind(user_id.as_uuid())
            .bind(&display_name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("register_user", e))?;
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> LedgerResult<Product> {
        let row = sqlx::query(
            r#"
            SELECT product_id, sku, name, department_id, unit,
                   packaging_id, default_supplier_id, status, created_at
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?
        .ok_or_else(|| LedgerError::not_found(format!("product {product_id}")))?;
        product_from_row(&row)
    }

    async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, sku, name, department_id, unit,
                   packaging_id, default_supplier_id, status, created_at
            FROM products
            ORDER BY sku
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn get_recipe(&self, recipe_id: RecipeId) -> LedgerResult<Recipe> {
        let mut tx = self.begin().await?;
        let recipe = Self::load_recipe(&mut tx, recipe_id).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(recipe)
    }

    async fn get_department(&self, department_id: DepartmentId) -> LedgerResult<Department> {
        let row = sqlx::query(
            "SELECT department_id, code, name, active, created_at FROM departments WHERE department_id = $1",
        )
        .bind(department_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_department", e))?
        .ok_or_else(|| LedgerError::not_found(format!("department {department_id}")))?;
        Ok(Department::from_parts(
            department_id,
            try_get(&row, "code")?,
            try_get(&row, "name")?,
            try_get(&row, "active")?,
            try_get(&row, "created_at")?,
        ))
    }

    async fn get_supplier(&self, supplier_id: SupplierId) -> LedgerResult<Supplier> {
        let row = sqlx::query(
            "SELECT supplier_id, code, name, email, phone, address, status, created_at FROM suppliers WHERE supplier_id = $1",
        )
        .bind(supplier_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_supplier", e))?
        .ok_or_else(|| LedgerError::not_found(format!("supplier {supplier_id}")))?;

        let status: String = try_get(&row, "status")?;
        Ok(Supplier::from_parts(
            supplier_id,
            try_get(&row, "code")?,
            try_get(&row, "name")?,
            ContactInfo {
                email: try_get(&row, "email")?,
                phone: try_get(&row, "phone")?,
                address: try_get(&row, "address")?,
            },
            SupplierStatus::parse(&status).ok_or_else(|| {
                LedgerError::storage(format!("unknown supplier status '{status}'"))
            })?,
            try_get(&row, "created_at")?,
        ))
    }
}

#[async_trait]
impl TraceabilityLedger for PostgresStore {
    #[instrument(
        skip(self, cmd),
        fields(product_id = %cmd.product_id, quantity = cmd.quantity),
        err
    )]
    async fn receive_stock(&self, cmd: ReceiveStock) -> LedgerResult<ReceivedProduct> {
        with_retry("receive_stock", || self.receive_stock_once(cmd.clone())).await
    }

    #[instrument(skip(self, cmd), fields(items = cmd.items.len()), err)]
    async fn record_sale(&self, cmd: RecordSale) -> LedgerResult<Sale> {
        with_retry("record_sale", || self.record_sale_once(cmd.clone())).await
    }

    #[instrument(
        skip(self, cmd),
        fields(recipe_id = %cmd.recipe_id, batch_multiplier = cmd.batch_multiplier),
        err
    )]
    async fn produce_recipe(&self, cmd: ProduceRecipe) -> LedgerResult<RecipeProduction> {
        with_retry("produce_recipe", || self.produce_recipe_once(cmd.clone())).await
    }

    #[instrument(skip(self, cmd), fields(lot_id = %cmd.lot_id), err)]
    async fn mark_expired(&self, cmd: MarkExpired) -> LedgerResult<ExpiredProduct> {
        with_retry("mark_expired", || self.mark_expired_once(cmd.clone())).await
    }

    async fn record_quality_check(&self, cmd: RecordQualityCheck) -> LedgerResult<QualityCheck> {
        let (lot_id, product_id) = match cmd.target {
            CheckTarget::Lot(lot_id) => (Some(*lot_id.as_uuid()), None),
            CheckTarget::Product(product_id) => (None, Some(*product_id.as_uuid())),
        };
        let check = QualityCheck::new(
            QualityCheckId::new(),
            cmd.check_type_id,
            cmd.target,
            cmd.status,
            cmd.notes,
            cmd.checked_at,
            cmd.checked_by,
        );
        sqlx::query(
            r#"
            INSERT INTO quality_checks (
                check_id, check_type_id, lot_id, product_id, status,
                notes, checked_at, checked_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Entity::id(&check).as_uuid())
        .bind(check.check_type_id().as_uuid())
        .bind(lot_id)
        .bind(product_id)
        .bind(check.status().as_str())
        .bind(check.notes())
        .bind(check.checked_at())
        .bind(check.checked_by().as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_quality_check", e))?;
        Ok(check)
    }

    #[instrument(
        skip(self, cmd),
        fields(product_id = %cmd.product_id, delta = cmd.delta),
        err
    )]
    async fn adjust_stock(&self, cmd: AdjustStock) -> LedgerResult<InventoryTransaction> {
        with_retry("adjust_stock", || self.adjust_stock_once(cmd.clone())).await
    }

    async fn trace_lot(&self, lot_id: LotId) -> LedgerResult<Vec<InventoryTransaction>> {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM received_products WHERE lot_id = $1) AS found",
        )
        .bind(lot_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("trace_lot", e))
        .and_then(|row| try_get(&row, "found"))?;
        if !exists {
            return Err(LedgerError::not_found(format!("lot {lot_id}")));
        }

        let rows = sqlx::query(
            r#"
            SELECT transaction_id, product_id, lot_id, kind, delta,
                   occurred_at, reference_id, recorded_by, notes
            FROM inventory_transactions
            WHERE lot_id = $1
            ORDER BY occurred_at ASC, transaction_id ASC
            "#,
        )
        .bind(lot_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("trace_lot", e))?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn get_lot(&self, lot_id: LotId) -> LedgerResult<ReceivedProduct> {
        let row = sqlx::query(
            r#"
            SELECT lot_id, product_id, supplier_id, received_date, expiry_date,
                   quantity_received, quantity_remaining, supplier_invoice,
                   storage_location, created_at
            FROM received_products
            WHERE lot_id = $1
            "#,
        )
        .bind(lot_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_lot", e))?
        .ok_or_else(|| LedgerError::not_found(format!("lot {lot_id}")))?;
        Ok(LotRow::from_row(&row)
            .map_err(|e| LedgerError::storage(format!("failed to decode lot row: {e}")))?
            .into())
    }

    async fn current_inventory(&self, product_id: ProductId) -> LedgerResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(i.quantity, 0) AS quantity
            FROM products p
            LEFT JOIN inventory i USING (product_id)
            WHERE p.product_id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("current_inventory", e))?
        .ok_or_else(|| LedgerError::not_found(format!("product {product_id}")))?;
        try_get(&row, "quantity")
    }

    async fn inventory_listing(&self) -> LedgerResult<Vec<InventoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT p.product_id, p.sku, p.name, d.name AS department_name, p.unit, i.quantity
            FROM inventory i
            JOIN products p USING (product_id)
            JOIN departments d ON p.department_id = d.department_id
            WHERE i.quantity > 0
            ORDER BY d.name, p.name
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_listing", e))?;
        rows.iter().map(inventory_row_from_row).collect()
    }

    async fn transactions(
        &self,
        filter: TransactionFilter,
    ) -> LedgerResult<Vec<InventoryTransaction>> {
        let product_param: Option<Uuid> = filter.product_id.map(|p| *p.as_uuid());
        let kind_param: Option<&str> = filter.kind.map(|k| k.as_str());

        let rows = sqlx::query(
            r#"
            SELECT transaction_id, product_id, lot_id, kind, delta,
                   occurred_at, reference_id, recorded_by, notes
            FROM inventory_transactions
            WHERE ($1::uuid IS NULL OR product_id = $1)
                AND ($2::text IS NULL OR kind = $2)
                AND ($3::timestamptz IS NULL OR occurred_at >= $3)
                AND ($4::timestamptz IS NULL OR occurred_at <= $4)
            ORDER BY occurred_at DESC, transaction_id DESC
            "#,
        )
        .bind(product_param)
        .bind(kind_param)
        .bind(filter.occurred_after)
        .bind(filter.occurred_before)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions", e))?;
        rows.iter().map(transaction_from_row).collect()
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

        let rows = sqlx::query(
            r#"
            SELECT lot_id, product_id, supplier_id, received_date, expiry_date,
                   quantity_received, quantity_remaining, supplier_invoice,
                   storage_location, created_at
            FROM received_products
            WHERE quantity_remaining > 0
                AND expiry_date > $1
                AND expiry_date <= $2
            ORDER BY expiry_date, lot_id
            "#,
        )
        .bind(as_of)
        .bind(horizon)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expiring_lots", e))?;
        lots_from_rows(rows)
    }

    async fn expired_lots(&self, as_of: NaiveDate) -> LedgerResult<Vec<ReceivedProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT lot_id, product_id, supplier_id, received_date, expiry_date,
                   quantity_received, quantity_remaining, supplier_invoice,
                   storage_location, created_at
            FROM received_products
            WHERE quantity_remaining > 0 AND expiry_date <= $1
            ORDER BY expiry_date, lot_id
            "#,
        )
        .bind(as_of)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expired_lots", e))?;
        lots_from_rows(rows)
    }

    async fn expired_writeoffs(&self) -> LedgerResult<Vec<ExpiredProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT expired_id, lot_id, product_id, quantity, expiry_date,
                   removed_at, removed_by, category, notes
            FROM expired_products
            ORDER BY removed_at DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expired_writeoffs", e))?;

        rows.iter()
            .map(|row| {
                Ok(ExpiredProduct {
                    id: ExpiredProductId::from_uuid(try_get(row, "expired_id")?),
                    lot_id: LotId::from_uuid(try_get(row, "lot_id")?),
                    product_id: ProductId::from_uuid(try_get(row, "product_id")?),
                    quantity: try_get(row, "quantity")?,
                    expiry_date: try_get(row, "expiry_date")?,
                    removed_at: try_get(row, "removed_at")?,
                    removed_by: UserId::from_uuid(try_get(row, "removed_by")?),
                    category: try_get(row, "category")?,
                    notes: try_get(row, "notes")?,
                })
            })
            .collect()
    }

    async fn low_stock(&self, threshold: i64) -> LedgerResult<Vec<InventoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT p.product_id, p.sku, p.name, d.name AS department_name, p.unit, i.quantity
            FROM inventory i
            JOIN products p USING (product_id)
            JOIN departments d ON p.department_id = d.department_id
            WHERE i.quantity <= $1
            ORDER BY i.quantity, p.sku
            "#,
        )
        .bind(threshold)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock", e))?;
        rows.iter().map(inventory_row_from_row).collect()
    }

    async fn invoice_in_use(
        &self,
        supplier_id: SupplierId,
        supplier_invoice: &str,
    ) -> LedgerResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM received_products
                WHERE supplier_id = $1 AND supplier_invoice = $2
            ) AS found
            "#,
        )
        .bind(supplier_id.as_uuid())
        .bind(supplier_invoice)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("invoice_in_use", e))?;
        try_get(&row, "found")
    }

    async fn invoice_summary(
        &self,
        supplier_id: SupplierId,
        supplier_invoice: &str,
    ) -> LedgerResult<InvoiceSummary> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_lots,
                   COALESCE(SUM(quantity_received), 0) AS total_quantity,
                   MIN(received_date) AS first_received,
                   MAX(received_date) AS last_received
            FROM received_products
            WHERE supplier_id = $1 AND supplier_invoice = $2
            "#,
        )
        .bind(supplier_id.as_uuid())
        .bind(supplier_invoice)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("invoice_summary", e))?;

        let total_lots: i64 = try_get(&row, "total_lots")?;
        if total_lots == 0 {
            return Err(LedgerError::not_found(format!(
                "invoice '{supplier_invoice}' for supplier {supplier_id}"
            )));
        }
        Ok(InvoiceSummary {
            supplier_id,
            supplier_invoice: supplier_invoice.to_string(),
            total_lots,
            total_quantity: try_get(&row, "total_quantity")?,
            first_received: try_get(&row, "first_received")?,
            last_received: try_get(&row, "last_received")?,
        })
    }

    async fn dashboard_summary(&self, as_of: DateTime<Utc>) -> LedgerResult<DashboardSummary> {
        let window_start = as_of - chrono::Duration::days(30);
        let today = as_of.date_naive();
        let horizon = today.checked_add_days(Days::new(30)).unwrap_or(today);

        let quality = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'PASSED') AS passed
            FROM quality_checks
            WHERE checked_at >= $1
            "#,
        )
        .bind(window_start)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_quality", e))?;

        let expiry = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE expiry_date <= $1) AS expired,
                   COUNT(*) FILTER (WHERE expiry_date > $1 AND expiry_date <= $2) AS expiring_soon
            FROM received_products
            WHERE quantity_remaining > 0
            "#,
        )
        .bind(today)
        .bind(horizon)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_expiry", e))?;

        let receipts = sqlx::query(
            r#"
            SELECT COUNT(*) AS receipts,
                   COALESCE(SUM(quantity_received), 0) AS received_quantity
            FROM received_products
            WHERE received_date >= $1
            "#,
        )
        .bind(window_start.date_naive())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_receipts", e))?;

        let stock = sqlx::query("SELECT COALESCE(SUM(quantity), 0) AS total_stock FROM inventory")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("dashboard_stock", e))?;

        Ok(DashboardSummary {
            quality_checks_total: try_get(&quality, "total")?,
            quality_checks_passed: try_get(&quality, "passed")?,
            expired_lots: try_get(&expiry, "expired")?,
            expiring_soon_lots: try_get(&expiry, "expiring_soon")?,
            receipts: try_get(&receipts, "receipts")?,
            received_quantity: try_get(&receipts, "received_quantity")?,
            total_stock: try_get(&stock, "total_stock")?,
        })
    }

    #[instrument(skip(self), err)]
    async fn refresh_product_report(&self, now: DateTime<Utc>) -> LedgerResult<u64> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM product_report")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_product_report", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO product_report (
                product_id, sku, name, department_name, quantity,
                open_lots, last_received, last_sold, refreshed_at
            )
            SELECT p.product_id,
                   p.sku,
                   p.name,
                   d.name,
                   COALESCE(i.quantity, 0),
                   COALESCE(l.open_lots, 0),
                   l.last_received,
                   s.last_sold,
                   $1
            FROM products p
            JOIN departments d ON p.department_id = d.department_id
            LEFT JOIN inventory i ON i.product_id = p.product_id
            LEFT JOIN (
                SELECT product_id,
                       COUNT(*) FILTER (WHERE quantity_remaining > 0) AS open_lots,
                       MAX(received_date) AS last_received
                FROM received_products
                GROUP BY product_id
            ) l ON l.product_id = p.product_id
            LEFT JOIN (
                SELECT product_id, MAX(occurred_at) AS last_sold
                FROM inventory_transactions
                WHERE kind = 'sale'
                GROUP BY product_id
            ) s ON s.product_id = p.product_id
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("refresh_product_report", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(inserted.rows_affected())
    }

    async fn product_report(&self) -> LedgerResult<Vec<ProductReportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, sku, name, department_name, quantity,
                   open_lots, last_received, last_sold, refreshed_at
            FROM product_report
            ORDER BY sku
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_report", e))?;

        rows.iter()
            .map(|row| {
                Ok(ProductReportRow {
                    product_id: ProductId::from_uuid(try_get(row, "product_id")?),
                    sku: try_get(row, "sku")?,
                    name: try_get(row, "name")?,
                    department_name: try_get(row, "department_name")?,
                    quantity: try_get(row, "quantity")?,
                    open_lots: try_get(row, "open_lots")?,
                    last_received: try_get(row, "last_received")?,
                    last_sold: try_get(row, "last_sold")?,
                    refreshed_at: try_get(row, "refreshed_at")?,
                })
            })
            .collect()
    }
}

// SQLx row types and decoding helpers

fn try_get<'r, T>(row: &'r PgRow, column: &str) -> LedgerResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| LedgerError::storage(format!("failed to read column '{column}': {e}")))
}

#[derive(Debug)]
struct LotRow {
    lot_id: Uuid,
    product_id: Uuid,
    supplier_id: Uuid,
    received_date: NaiveDate,
    expiry_date: NaiveDate,
    quantity_received: i64,
    quantity_remaining: i64,
    supplier_invoice: Option<String>,
    storage_location: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LotRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LotRow {
            lot_id: row.try_get("lot_id")?,
            product_id: row.try_get("product_id")?,
            supplier_id: row.try_get("supplier_id")?,
            received_date: row.try_get("received_date")?,
            expiry_date: row.try_get("expiry_date")?,
            quantity_received: row.try_get("quantity_received")?,
            quantity_remaining: row.try_get("quantity_remaining")?,
            supplier_invoice: row.try_get("supplier_invoice")?,
            storage_location: row.try_get("storage_location")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<LotRow> for ReceivedProduct {
    fn from(row: LotRow) -> Self {
        ReceivedProduct::from_parts(
            LotId::from_uuid(row.lot_id),
            ProductId::from_uuid(row.product_id),
            SupplierId::from_uuid(row.supplier_id),
            row.received_date,
            row.expiry_date,
            row.quantity_received,
            row.quantity_remaining,
            row.supplier_invoice,
            row.storage_location,
            row.created_at,
        )
    }
}

fn lots_from_rows(rows: Vec<PgRow>) -> LedgerResult<Vec<ReceivedProduct>> {
    rows.iter()
        .map(|row| {
            Ok(LotRow::from_row(row)
                .map_err(|e| LedgerError::storage(format!("failed to decode lot row: {e}")))?
                .into())
        })
        .collect()
}

fn transaction_from_row(row: &PgRow) -> LedgerResult<InventoryTransaction> {
    let kind: String = try_get(row, "kind")?;
    let kind = TransactionKind::parse(&kind)
        .ok_or_else(|| LedgerError::storage(format!("unknown transaction kind '{kind}'")))?;
    let lot_id: Option<Uuid> = try_get(row, "lot_id")?;
    Ok(InventoryTransaction::from_parts(
        TransactionId::from_uuid(try_get(row, "transaction_id")?),
        ProductId::from_uuid(try_get(row, "product_id")?),
        lot_id.map(LotId::from_uuid),
        kind,
        try_get(row, "delta")?,
        try_get(row, "occurred_at")?,
        try_get(row, "reference_id")?,
        UserId::from_uuid(try_get(row, "recorded_by")?),
        try_get(row, "notes")?,
    ))
}

fn product_from_row(row: &PgRow) -> LedgerResult<Product> {
    let status: String = try_get(row, "status")?;
    let packaging_id: Option<Uuid> = try_get(row, "packaging_id")?;
    let default_supplier_id: Option<Uuid> = try_get(row, "default_supplier_id")?;
    Ok(Product::from_parts(
        ProductId::from_uuid(try_get(row, "product_id")?),
        try_get(row, "sku")?,
        try_get(row, "name")?,
        DepartmentId::from_uuid(try_get(row, "department_id")?),
        try_get(row, "unit")?,
        packaging_id.map(lotledger_catalog::PackagingId::from_uuid),
        default_supplier_id.map(SupplierId::from_uuid),
        ProductStatus::parse(&status)
            .ok_or_else(|| LedgerError::storage(format!("unknown product status '{status}'")))?,
        try_get(row, "created_at")?,
    ))
}

fn inventory_row_from_row(row: &PgRow) -> LedgerResult<InventoryRow> {
    Ok(InventoryRow {
        product_id: ProductId::from_uuid(try_get(row, "product_id")?),
        sku: try_get(row, "sku")?,
        name: try_get(row, "name")?,
        department_name: try_get(row, "department_name")?,
        unit: try_get(row, "unit")?,
        quantity: try_get(row, "quantity")?,
    })
}

/// Map SQLx errors to `LedgerError` (see the module docs for the table).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => LedgerError::validation(msg),
                Some("23503") => LedgerError::not_found(msg),
                Some("23514") => LedgerError::validation(msg),
                Some("40001") | Some("40P01") | Some("55P03") => LedgerError::conflict(msg),
                _ => LedgerError::storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::storage(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            LedgerError::storage(format!("unexpected row not found in {operation}"))
        }
        other => LedgerError::storage(format!("sqlx error in {operation}: {other}")),
    }
}
