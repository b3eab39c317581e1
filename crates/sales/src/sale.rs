use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_catalog::ProductId;
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId, uuid_id};
use lotledger_inventory::{
    InventoryTransaction, LotPool, TransactionId, TransactionKind,
};

uuid_id!(
    /// Sale identifier.
    SaleId
);

/// One line of a sale as requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItemInput {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// One committed line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// A committed sale event. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    items: Vec<SaleItem>,
    sold_at: DateTime<Utc>,
    recorded_by: UserId,
}

impl Sale {
    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn recorded_by(&self) -> UserId {
        self.recorded_by
    }

    /// Sale total in smallest currency unit.
    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .map(|i| i.unit_price * i.quantity as u64)
            .sum()
    }

    /// Rehydrate from stored state (store layer only).
    pub fn from_parts(
        id: SaleId,
        items: Vec<SaleItem>,
        sold_at: DateTime<Utc>,
        recorded_by: UserId,
    ) -> Self {
        Self {
            id,
            items,
            sold_at,
            recorded_by,
        }
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Everything `record_sale` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub sale: Sale,
    pub transactions: Vec<InventoryTransaction>,
}

/// Validate a sale and allocate every item against inventory, all or
/// nothing.
///
/// `pools` holds the available stock per product (built from rows the store
/// has locked); `skus` names products in errors. Items for the same product
/// draw down one shared pool, so the availability check covers the whole
/// sale. On any error the input pools are left untouched; the plan either
/// commits in full or does not exist.
pub fn plan_sale(
    sale_id: SaleId,
    items: &[SaleItemInput],
    pools: &mut HashMap<ProductId, LotPool>,
    skus: &HashMap<ProductId, String>,
    recorded_by: UserId,
    sold_at: DateTime<Utc>,
) -> LedgerResult<SalePlan> {
    if items.is_empty() {
        return Err(LedgerError::validation("sale must have at least one item"));
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(LedgerError::validation("sale quantity must be positive"));
        }
        if item.unit_price == 0 {
            return Err(LedgerError::validation("unit price must be positive"));
        }
        if !skus.contains_key(&item.product_id) {
            return Err(LedgerError::not_found(format!(
                "product {}",
                item.product_id
            )));
        }
    }

    // Allocate against a scratch copy so a short item late in the list
    // leaves the caller's pools exactly as they were.
    let mut scratch = pools.clone();
    let mut committed_items = Vec::with_capacity(items.len());
    let mut transactions = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let sku = &skus[&item.product_id];
        let pool = scratch
            .get_mut(&item.product_id)
            .ok_or_else(|| LedgerError::insufficient(sku.clone(), item.quantity, 0))?;

        let allocations = pool.allocate(sku, item.quantity)?;
        for alloc in allocations {
            transactions.push(InventoryTransaction::new(
                TransactionId::new(),
                item.product_id,
                alloc.lot_id,
                TransactionKind::Sale,
                -alloc.quantity,
                sold_at,
                Some(*sale_id.as_uuid()),
                recorded_by,
                None,
            )?);
        }
        committed_items.push(SaleItem {
            line_no: (idx as u32) + 1,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        });
    }

    *pools = scratch;
    Ok(SalePlan {
        sale: Sale {
            id: sale_id,
            items: committed_items,
            sold_at,
            recorded_by,
        },
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotledger_inventory::{LotId, OpenLot};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_lot(remaining: i64) -> OpenLot {
        OpenLot {
            lot_id: LotId::new(),
            expiry_date: date(2025, 7, 1),
            received_date: date(2025, 6, 1),
            remaining,
        }
    }

    fn setup(
        stock: &[(ProductId, &str, i64)],
    ) -> (HashMap<ProductId, LotPool>, HashMap<ProductId, String>) {
        let mut pools = HashMap::new();
        let mut skus = HashMap::new();
        for (product, sku, remaining) in stock {
            pools.insert(*product, LotPool::new(vec![open_lot(*remaining)], 0));
            skus.insert(*product, sku.to_string());
        }
        (pools, skus)
    }

    fn item(product_id: ProductId, quantity: i64) -> SaleItemInput {
        SaleItemInput {
            product_id,
            quantity,
            unit_price: 250,
        }
    }

    #[test]
    fn sale_produces_one_transaction_per_single_lot_item() {
        let a = ProductId::new();
        let b = ProductId::new();
        let (mut pools, skus) = setup(&[(a, "A", 100), (b, "B", 50)]);

        let plan = plan_sale(
            SaleId::new(),
            &[item(a, 30), item(b, 10)],
            &mut pools,
            &skus,
            UserId::new(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(plan.sale.items().len(), 2);
        assert_eq!(plan.transactions.len(), 2);
        assert!(plan.transactions.iter().all(|t| t.kind() == TransactionKind::Sale));
        assert_eq!(
            plan.transactions.iter().map(|t| t.delta()).sum::<i64>(),
            -40
        );
        assert_eq!(pools[&a].available(), 70);
        assert_eq!(pools[&b].available(), 40);
    }

    #[test]
    fn short_item_names_the_first_short_product_and_commits_nothing() {
        let a = ProductId::new();
        let b = ProductId::new();
        let (mut pools, skus) = setup(&[(a, "A", 100), (b, "B", 5)]);

        let err = plan_sale(
            SaleId::new(),
            &[item(a, 30), item(b, 10)],
            &mut pools,
            &skus,
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();

        match err {
            LedgerError::InsufficientInventory { product, requested, available } => {
                assert_eq!(product, "B");
                assert_eq!(requested, 10);
                assert_eq!(available, 5);
            }
            other => panic!("expected InsufficientInventory, got {other:?}"),
        }
        // First item's allocation was rolled back with the rest.
        assert_eq!(pools[&a].available(), 100);
        assert_eq!(pools[&b].available(), 5);
    }

    #[test]
    fn two_items_for_one_product_share_availability() {
        let a = ProductId::new();
        let (mut pools, skus) = setup(&[(a, "A", 10)]);

        let err = plan_sale(
            SaleId::new(),
            &[item(a, 6), item(a, 6)],
            &mut pools,
            &skus,
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientInventory { available: 4, .. }
        ));
        assert_eq!(pools[&a].available(), 10);
    }

    #[test]
    fn item_spanning_lots_writes_one_transaction_per_slice() {
        let a = ProductId::new();
        let mut pools = HashMap::new();
        pools.insert(
            a,
            LotPool::new(vec![open_lot(20), open_lot(30)], 0),
        );
        let skus = HashMap::from([(a, "A".to_string())]);

        let plan = plan_sale(
            SaleId::new(),
            &[item(a, 35)],
            &mut pools,
            &skus,
            UserId::new(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(plan.sale.items().len(), 1);
        assert_eq!(plan.transactions.len(), 2);
        assert_eq!(
            plan.transactions.iter().map(|t| t.delta()).sum::<i64>(),
            -35
        );
    }

    #[test]
    fn rejects_empty_sales_and_bad_lines() {
        let a = ProductId::new();
        let (mut pools, skus) = setup(&[(a, "A", 10)]);
        let user = UserId::new();

        assert!(matches!(
            plan_sale(SaleId::new(), &[], &mut pools, &skus, user, Utc::now()).unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            plan_sale(
                SaleId::new(),
                &[item(a, 0)],
                &mut pools,
                &skus,
                user,
                Utc::now()
            )
            .unwrap_err(),
            LedgerError::Validation(_)
        ));

        let unknown = ProductId::new();
        assert!(matches!(
            plan_sale(
                SaleId::new(),
                &[item(unknown, 1)],
                &mut pools,
                &skus,
                user,
                Utc::now()
            )
            .unwrap_err(),
            LedgerError::NotFound(_)
        ));
    }

    #[test]
    fn sale_total_sums_lines() {
        let a = ProductId::new();
        let (mut pools, skus) = setup(&[(a, "A", 100)]);
        let plan = plan_sale(
            SaleId::new(),
            &[
                SaleItemInput {
                    product_id: a,
                    quantity: 3,
                    unit_price: 1000,
                },
                SaleItemInput {
                    product_id: a,
                    quantity: 2,
                    unit_price: 500,
                },
            ],
            &mut pools,
            &skus,
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan.sale.total(), 4000);
    }
}
