//! Integration tests for the full ledger pipeline against `MemoryStore`.
//!
//! Command → plan → atomic apply → queries. Verifies:
//! - materialized balances always equal ledger replay
//! - failed operations leave no partial state
//! - errors surface with the right taxonomy

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use lotledger_catalog::{
        ContactInfo, Department, DepartmentId, Product, ProductId, Recipe, RecipeId,
        RecipeIngredient, Supplier, SupplierDepartment, SupplierId,
    };
    use lotledger_core::{Entity, LedgerError, UserId};
    use lotledger_inventory::{TransactionKind, replay_balance};
    use lotledger_quality::{
        CheckStatus, CheckTarget, QualityCheckType, QualityCheckTypeId,
    };
    use lotledger_sales::SaleItemInput;

    use crate::ledger::memory::MemoryStore;
    use crate::ledger::r#trait::{
        AdjustStock, Catalog, MarkExpired, ProduceRecipe, ReceiveStock, RecordQualityCheck,
        RecordSale, TraceabilityLedger, TransactionFilter,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        user: UserId,
        department: DepartmentId,
        supplier: SupplierId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = UserId::new();
        store
            .register_user(user, "ops".to_string())
            .await
            .unwrap();

        let department =
            Department::new(DepartmentId::new(), "BUT", "Butchery", at(2025, 5, 1)).unwrap();
        let department_id = *department.id();
        store.create_department(department).await.unwrap();

        let supplier = Supplier::new(
            SupplierId::new(),
            "SUP-01",
            "Karoo Meats",
            ContactInfo::default(),
            at(2025, 5, 1),
        )
        .unwrap();
        let supplier_id = *supplier.id();
        store.create_supplier(supplier).await.unwrap();
        store
            .link_supplier_department(SupplierDepartment {
                supplier_id,
                department_id,
            })
            .await
            .unwrap();

        Fixture {
            store,
            user,
            department: department_id,
            supplier: supplier_id,
        }
    }

    async fn add_product(f: &Fixture, sku: &str) -> ProductId {
        let product = Product::new(
            ProductId::new(),
            sku,
            format!("{sku} (test)"),
            f.department,
            "ea",
            None,
            Some(f.supplier),
            at(2025, 5, 1),
        )
        .unwrap();
        let id = *product.id();
        f.store.create_product(product).await.unwrap();
        id
    }

    fn receipt(f: &Fixture, product: ProductId, quantity: i64, expiry: NaiveDate) -> ReceiveStock {
        ReceiveStock {
            product_id: product,
            supplier_id: f.supplier,
            quantity,
            received_date: date(2025, 6, 1),
            expiry_date: expiry,
            supplier_invoice: Some("INV-1001".to_string()),
            storage_location: Some("Cold Storage".to_string()),
            recorded_by: f.user,
            occurred_at: at(2025, 6, 1),
        }
    }

    /// The receipt → sale → short sale → expiry scenario, end to end.
    #[tokio::test]
    async fn lot_lifecycle_receipt_sale_shortfall_expiry() {
        let f = fixture().await;
        let product_a = add_product(&f, "A").await;

        // Receive 100 units, expiring 10 days after receipt.
        let lot = f
            .store
            .receive_stock(receipt(&f, product_a, 100, date(2025, 6, 11)))
            .await
            .unwrap();
        assert_eq!(f.store.current_inventory(product_a).await.unwrap(), 100);

        // Sell 30.
        let sale = f
            .store
            .record_sale(RecordSale {
                items: vec![SaleItemInput {
                    product_id: product_a,
                    quantity: 30,
                    unit_price: 500,
                }],
                recorded_by: f.user,
                occurred_at: at(2025, 6, 2),
            })
            .await
            .unwrap();
        assert_eq!(f.store.current_inventory(product_a).await.unwrap(), 70);

        let sale_txs = f
            .store
            .transactions(TransactionFilter {
                product_id: Some(product_a),
                kind: Some(TransactionKind::Sale),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sale_txs.len(), 1);
        assert_eq!(sale_txs[0].delta(), -30);
        assert_eq!(sale_txs[0].reference_id(), Some(*Entity::id(&sale).as_uuid()));

        // Attempt to sell 80 more: short, nothing committed.
        let err = f
            .store
            .record_sale(RecordSale {
                items: vec![SaleItemInput {
                    product_id: product_a,
                    quantity: 80,
                    unit_price: 500,
                }],
                recorded_by: f.user,
                occurred_at: at(2025, 6, 3),
            })
            .await
            .unwrap_err();
        match err {
            LedgerError::InsufficientInventory {
                product,
                requested,
                available,
            } => {
                assert_eq!(product, "A");
                assert_eq!(requested, 80);
                assert_eq!(available, 70);
            }
            other => panic!("expected InsufficientInventory, got {other:?}"),
        }
        assert_eq!(f.store.current_inventory(product_a).await.unwrap(), 70);

        // Too early to write off.
        let early = f
            .store
            .mark_expired(MarkExpired {
                lot_id: *Entity::id(&lot),
                as_of: date(2025, 6, 5),
                removed_by: f.user,
                occurred_at: at(2025, 6, 5),
                category: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(early, LedgerError::InvalidState(_)));

        // Past expiry with 70 on hand: write off succeeds.
        assert_eq!(
            f.store.expired_lots(date(2025, 6, 12)).await.unwrap().len(),
            1
        );
        let record = f
            .store
            .mark_expired(MarkExpired {
                lot_id: *Entity::id(&lot),
                as_of: date(2025, 6, 12),
                removed_by: f.user,
                occurred_at: at(2025, 6, 12),
                category: Some("spoiled".to_string()),
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(record.quantity, 70);
        assert_eq!(f.store.current_inventory(product_a).await.unwrap(), 0);
        assert_eq!(f.store.expired_writeoffs().await.unwrap().len(), 1);
        // The lot is consumed, so it leaves the expired-lot listing.
        assert!(f.store.expired_lots(date(2025, 6, 13)).await.unwrap().is_empty());

        // Writing off an exhausted lot is illegal.
        let again = f
            .store
            .mark_expired(MarkExpired {
                lot_id: *Entity::id(&lot),
                as_of: date(2025, 6, 13),
                removed_by: f.user,
                occurred_at: at(2025, 6, 13),
                category: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(again, LedgerError::InvalidState(_)));

        // Trace: receipt first, oldest to newest; consuming deltas sum to
        // the negated received quantity.
        let trace = f.store.trace_lot(*Entity::id(&lot)).await.unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].kind(), TransactionKind::Receipt);
        assert_eq!(trace[1].kind(), TransactionKind::Sale);
        assert_eq!(trace[2].kind(), TransactionKind::ExpiryWriteoff);
        assert!(
            trace.windows(2).all(|w| w[0].occurred_at() <= w[1].occurred_at()),
            "trace must be ordered oldest first"
        );
        let consumed: i64 = trace
            .iter()
            .filter(|t| t.kind() != TransactionKind::Receipt)
            .map(|t| t.delta())
            .sum();
        assert_eq!(consumed, -100);
    }

    /// Replay equivalence: the materialized balance always matches the
    /// signed sum of the product's transactions.
    #[tokio::test]
    async fn balance_matches_ledger_replay_at_every_step() {
        let f = fixture().await;
        let product = add_product(&f, "FLOUR").await;

        f.store
            .receive_stock(receipt(&f, product, 40, date(2025, 7, 1)))
            .await
            .unwrap();
        f.store
            .receive_stock(receipt(&f, product, 25, date(2025, 6, 20)))
            .await
            .unwrap();
        f.store
            .record_sale(RecordSale {
                items: vec![SaleItemInput {
                    product_id: product,
                    quantity: 30,
                    unit_price: 120,
                }],
                recorded_by: f.user,
                occurred_at: at(2025, 6, 2),
            })
            .await
            .unwrap();
        f.store
            .adjust_stock(AdjustStock {
                product_id: product,
                delta: -5,
                recorded_by: f.user,
                occurred_at: at(2025, 6, 3),
                notes: Some("stocktake".to_string()),
            })
            .await
            .unwrap();

        let txs = f
            .store
            .transactions(TransactionFilter {
                product_id: Some(product),
                ..Default::default()
            })
            .await
            .unwrap();
        let balance = f.store.current_inventory(product).await.unwrap();
        assert_eq!(balance, 30);
        assert_eq!(replay_balance(&txs, product), balance);
    }

    /// FEFO: the sale consumes the lot that expires first, even though it
    /// was received second.
    #[tokio::test]
    async fn sales_consume_earliest_expiry_first() {
        let f = fixture().await;
        let product = add_product(&f, "MILK").await;

        let long_life = f
            .store
            .receive_stock(receipt(&f, product, 50, date(2025, 8, 1)))
            .await
            .unwrap();
        let short_life = f
            .store
            .receive_stock(receipt(&f, product, 50, date(2025, 6, 15)))
            .await
            .unwrap();

        f.store
            .record_sale(RecordSale {
                items: vec![SaleItemInput {
                    product_id: product,
                    quantity: 20,
                    unit_price: 80,
                }],
                recorded_by: f.user,
                occurred_at: at(2025, 6, 2),
            })
            .await
            .unwrap();

        let short_lot = f.store.get_lot(*Entity::id(&short_life)).await.unwrap();
        let long_lot = f.store.get_lot(*Entity::id(&long_life)).await.unwrap();
        assert_eq!(short_lot.quantity_remaining(), 30);
        assert_eq!(long_lot.quantity_remaining(), 50);
    }

    /// The "Soup" scenario: 2×B + 1×C per batch, 5 B and 0 C on hand.
    #[tokio::test]
    async fn short_ingredient_leaves_all_inventories_unchanged() {
        let f = fixture().await;
        let soup = add_product(&f, "SOUP").await;
        let b = add_product(&f, "B").await;
        let c = add_product(&f, "C").await;

        let recipe = Recipe::new(
            RecipeId::new(),
            "Soup",
            soup,
            1,
            vec![
                RecipeIngredient {
                    product_id: b,
                    quantity_per_batch: 2,
                },
                RecipeIngredient {
                    product_id: c,
                    quantity_per_batch: 1,
                },
            ],
            at(2025, 5, 1),
        )
        .unwrap();
        let recipe_id = *recipe.id();
        f.store.create_recipe(recipe).await.unwrap();

        f.store
            .receive_stock(receipt(&f, b, 5, date(2025, 7, 1)))
            .await
            .unwrap();

        let err = f
            .store
            .produce_recipe(ProduceRecipe {
                recipe_id,
                batch_multiplier: 1,
                recorded_by: f.user,
                occurred_at: at(2025, 6, 2),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientInventory { requested: 1, available: 0, .. }
        ));

        assert_eq!(f.store.current_inventory(b).await.unwrap(), 5);
        assert_eq!(f.store.current_inventory(c).await.unwrap(), 0);
        assert_eq!(f.store.current_inventory(soup).await.unwrap(), 0);
        assert!(
            f.store
                .transactions(TransactionFilter {
                    kind: Some(TransactionKind::ProductionConsumption),
                    ..Default::default()
                })
                .await
                .unwrap()
                .is_empty()
        );
    }

    /// A successful production consumes ingredients and the output becomes
    /// sellable stock.
    #[tokio::test]
    async fn production_output_can_be_sold() {
        let f = fixture().await;
        let soup = add_product(&f, "SOUP").await;
        let b = add_product(&f, "B").await;

        let recipe = Recipe::new(
            RecipeId::new(),
            "Soup",
            soup,
            3,
            vec![RecipeIngredient {
                product_id: b,
                quantity_per_batch: 2,
            }],
            at(2025, 5, 1),
        )
        .unwrap();
        let recipe_id = *recipe.id();
        f.store.create_recipe(recipe).await.unwrap();

        f.store
            .receive_stock(receipt(&f, b, 10, date(2025, 7, 1)))
            .await
            .unwrap();

        let production = f
            .store
            .produce_recipe(ProduceRecipe {
                recipe_id,
                batch_multiplier: 2,
                recorded_by: f.user,
                occurred_at: at(2025, 6, 2),
            })
            .await
            .unwrap();
        assert_eq!(production.quantity_produced(), 6);
        assert_eq!(f.store.current_inventory(b).await.unwrap(), 6);
        assert_eq!(f.store.current_inventory(soup).await.unwrap(), 6);

        f.store
            .record_sale(RecordSale {
                items: vec![SaleItemInput {
                    product_id: soup,
                    quantity: 4,
                    unit_price: 900,
                }],
                recorded_by: f.user,
                occurred_at: at(2025, 6, 3),
            })
            .await
            .unwrap();
        assert_eq!(f.store.current_inventory(soup).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn quality_checks_append_without_touching_inventory() {
        let f = fixture().await;
        let product = add_product(&f, "FISH").await;
        let lot = f
            .store
            .receive_stock(receipt(&f, product, 20, date(2025, 6, 20)))
            .await
            .unwrap();

        let check_type = QualityCheckType::new(
            QualityCheckTypeId::new(),
            "Temperature on receipt",
            None,
            Some(f.department),
            at(2025, 5, 1),
        )
        .unwrap();
        let check_type_id = *check_type.id();
        f.store.create_check_type(check_type).await.unwrap();

        let check = f
            .store
            .record_quality_check(RecordQualityCheck {
                check_type_id,
                target: CheckTarget::Lot(*Entity::id(&lot)),
                status: CheckStatus::Passed,
                notes: Some("3.2C at receiving".to_string()),
                checked_by: f.user,
                checked_at: at(2025, 6, 1),
            })
            .await
            .unwrap();
        assert_eq!(check.status(), CheckStatus::Passed);
        assert_eq!(f.store.current_inventory(product).await.unwrap(), 20);

        let summary = f.store.dashboard_summary(at(2025, 6, 10)).await.unwrap();
        assert_eq!(summary.quality_checks_total, 1);
        assert_eq!(summary.quality_checks_passed, 1);
        assert_eq!(summary.receipts, 1);
        assert_eq!(summary.total_stock, 20);
    }

    #[tokio::test]
    async fn structural_failures_surface_as_not_found() {
        let f = fixture().await;
        let product = add_product(&f, "A").await;

        let missing_product = f
            .store
            .receive_stock(receipt(&f, ProductId::new(), 5, date(2025, 7, 1)))
            .await
            .unwrap_err();
        assert!(matches!(missing_product, LedgerError::NotFound(_)));

        let missing_recipe = f
            .store
            .produce_recipe(ProduceRecipe {
                recipe_id: RecipeId::new(),
                batch_multiplier: 1,
                recorded_by: f.user,
                occurred_at: at(2025, 6, 1),
            })
            .await
            .unwrap_err();
        assert!(matches!(missing_recipe, LedgerError::NotFound(_)));

        let missing_lot = f
            .store
            .trace_lot(lotledger_inventory::LotId::new())
            .await
            .unwrap_err();
        assert!(matches!(missing_lot, LedgerError::NotFound(_)));

        let unknown_user = f
            .store
            .receive_stock(ReceiveStock {
                recorded_by: UserId::new(),
                ..receipt(&f, product, 5, date(2025, 7, 1))
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown_user, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn validation_failures_commit_nothing() {
        let f = fixture().await;
        let product = add_product(&f, "A").await;

        // Non-positive quantity.
        let err = f
            .store
            .receive_stock(receipt(&f, product, 0, date(2025, 7, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        // Expiry before the receipt date.
        let err = f
            .store
            .receive_stock(receipt(&f, product, 5, date(2025, 5, 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert_eq!(f.store.current_inventory(product).await.unwrap(), 0);
        assert!(
            f.store
                .transactions(TransactionFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn invoice_and_report_queries() {
        let f = fixture().await;
        let product = add_product(&f, "A").await;

        f.store
            .receive_stock(receipt(&f, product, 100, date(2025, 6, 11)))
            .await
            .unwrap();

        assert!(
            f.store
                .invoice_in_use(f.supplier, "INV-1001")
                .await
                .unwrap()
        );
        assert!(!f.store.invoice_in_use(f.supplier, "INV-9999").await.unwrap());

        let summary = f.store.invoice_summary(f.supplier, "INV-1001").await.unwrap();
        assert_eq!(summary.total_lots, 1);
        assert_eq!(summary.total_quantity, 100);

        let missing = f
            .store
            .invoice_summary(f.supplier, "INV-9999")
            .await
            .unwrap_err();
        assert!(matches!(missing, LedgerError::NotFound(_)));

        let refreshed = f.store.refresh_product_report(at(2025, 6, 2)).await.unwrap();
        assert_eq!(refreshed, 1);
        let report = f.store.product_report().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].quantity, 100);
        assert_eq!(report[0].open_lots, 1);
        assert_eq!(report[0].department_name, "Butchery");

        let low = f.store.low_stock(10).await.unwrap();
        assert!(low.is_empty());
        let listing = f.store.inventory_listing().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].quantity, 100);

        let expiring = f
            .store
            .expiring_lots(date(2025, 6, 1), 30)
            .await
            .unwrap();
        assert_eq!(expiring.len(), 1);
    }
}
