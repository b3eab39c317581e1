use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_catalog::{ProductId, Recipe, RecipeId};
use lotledger_core::{Entity, LedgerError, LedgerResult, UserId, uuid_id};
use lotledger_inventory::{
    InventoryTransaction, LotPool, TransactionId, TransactionKind,
};

uuid_id!(
    /// Recipe production identifier.
    ProductionId
);

/// A committed production run. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeProduction {
    id: ProductionId,
    recipe_id: RecipeId,
    batch_multiplier: i64,
    output_product_id: ProductId,
    quantity_produced: i64,
    produced_at: DateTime<Utc>,
    recorded_by: UserId,
}

impl RecipeProduction {
    pub fn recipe_id(&self) -> RecipeId {
        self.recipe_id
    }

    pub fn batch_multiplier(&self) -> i64 {
        self.batch_multiplier
    }

    pub fn output_product_id(&self) -> ProductId {
        self.output_product_id
    }

    pub fn quantity_produced(&self) -> i64 {
        self.quantity_produced
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn recorded_by(&self) -> UserId {
        self.recorded_by
    }

    /// Rehydrate from stored state (store layer only).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ProductionId,
        recipe_id: RecipeId,
        batch_multiplier: i64,
        output_product_id: ProductId,
        quantity_produced: i64,
        produced_at: DateTime<Utc>,
        recorded_by: UserId,
    ) -> Self {
        Self {
            id,
            recipe_id,
            batch_multiplier,
            output_product_id,
            quantity_produced,
            produced_at,
            recorded_by,
        }
    }
}

impl Entity for RecipeProduction {
    type Id = ProductionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Everything `produce_recipe` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionPlan {
    pub production: RecipeProduction,
    pub transactions: Vec<InventoryTransaction>,
}

/// Validate a production run and allocate every ingredient, all or nothing.
///
/// Required quantity per ingredient is `quantity_per_batch × multiplier`;
/// the run yields `output_quantity × multiplier` of the output product. Any
/// short ingredient rejects the whole run (first short ingredient named)
/// and leaves the caller's pools untouched.
pub fn plan_production(
    production_id: ProductionId,
    recipe: &Recipe,
    batch_multiplier: i64,
    pools: &mut HashMap<ProductId, LotPool>,
    skus: &HashMap<ProductId, String>,
    recorded_by: UserId,
    produced_at: DateTime<Utc>,
) -> LedgerResult<ProductionPlan> {
    if batch_multiplier <= 0 {
        return Err(LedgerError::validation("batch multiplier must be positive"));
    }
    if !recipe.is_active() {
        return Err(LedgerError::invalid_state(format!(
            "recipe '{}' is deactivated",
            recipe.name()
        )));
    }

    // Allocate against a scratch copy so a short ingredient leaves the
    // caller's pools exactly as they were.
    let mut scratch = pools.clone();
    let mut transactions = Vec::new();

    for ingredient in recipe.ingredients() {
        let required = ingredient.quantity_per_batch * batch_multiplier;
        let sku = skus
            .get(&ingredient.product_id)
            .ok_or_else(|| {
                LedgerError::not_found(format!("product {}", ingredient.product_id))
            })?;
        let pool = scratch
            .get_mut(&ingredient.product_id)
            .ok_or_else(|| LedgerError::insufficient(sku.clone(), required, 0))?;

        for alloc in pool.allocate(sku, required)? {
            transactions.push(InventoryTransaction::new(
                TransactionId::new(),
                ingredient.product_id,
                alloc.lot_id,
                TransactionKind::ProductionConsumption,
                -alloc.quantity,
                produced_at,
                Some(*production_id.as_uuid()),
                recorded_by,
                None,
            )?);
        }
    }

    let quantity_produced = recipe.output_quantity() * batch_multiplier;
    transactions.push(InventoryTransaction::new(
        TransactionId::new(),
        recipe.output_product_id(),
        None,
        TransactionKind::ProductionOutput,
        quantity_produced,
        produced_at,
        Some(*production_id.as_uuid()),
        recorded_by,
        None,
    )?);

    *pools = scratch;
    Ok(ProductionPlan {
        production: RecipeProduction {
            id: production_id,
            recipe_id: *recipe.id(),
            batch_multiplier,
            output_product_id: recipe.output_product_id(),
            quantity_produced,
            produced_at,
            recorded_by,
        },
        transactions,
    })
}
