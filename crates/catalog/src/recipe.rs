use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotledger_core::{Entity, LedgerError, LedgerResult, uuid_id};

use crate::product::ProductId;

uuid_id!(
    /// Recipe identifier.
    RecipeId
);

/// One ingredient line of a recipe: product + quantity required per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub product_id: ProductId,
    pub quantity_per_batch: i64,
}

/// A recipe consumes ingredient products and produces an output product.
///
/// The ingredient list is the consumption contract for recipe production:
/// one batch consumes `quantity_per_batch` of every ingredient and yields
/// `output_quantity` of the output product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    id: RecipeId,
    name: String,
    output_product_id: ProductId,
    output_quantity: i64,
    ingredients: Vec<RecipeIngredient>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(
        id: RecipeId,
        name: impl Into<String>,
        output_product_id: ProductId,
        output_quantity: i64,
        ingredients: Vec<RecipeIngredient>,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("recipe name cannot be empty"));
        }
        if output_quantity <= 0 {
            return Err(LedgerError::validation("output quantity must be positive"));
        }
        if ingredients.is_empty() {
            return Err(LedgerError::validation(
                "recipe must have at least one ingredient",
            ));
        }
        for ing in &ingredients {
            if ing.quantity_per_batch <= 0 {
                return Err(LedgerError::validation(
                    "ingredient quantity must be positive",
                ));
            }
            if ing.product_id == output_product_id {
                return Err(LedgerError::validation(
                    "recipe output cannot be one of its own ingredients",
                ));
            }
        }
        let mut seen = ingredients.iter().map(|i| i.product_id).collect::<Vec<_>>();
        seen.sort();
        seen.dedup();
        if seen.len() != ingredients.len() {
            return Err(LedgerError::validation(
                "recipe lists the same ingredient twice",
            ));
        }
        Ok(Self {
            id,
            name,
            output_product_id,
            output_quantity,
            ingredients,
            active: true,
            created_at,
        })
    }

    /// Rehydrate from stored state (store layer only).
    pub fn from_parts(
        id: RecipeId,
        name: String,
        output_product_id: ProductId,
        output_quantity: i64,
        ingredients: Vec<RecipeIngredient>,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            output_product_id,
            output_quantity,
            ingredients,
            active,
            created_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_product_id(&self) -> ProductId {
        self.output_product_id
    }

    pub fn output_quantity(&self) -> i64 {
        self.output_quantity
    }

    pub fn ingredients(&self) -> &[RecipeIngredient] {
        &self.ingredients
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deactivate(&mut self) -> LedgerResult<()> {
        if !self.active {
            return Err(LedgerError::invalid_state("recipe already deactivated"));
        }
        self.active = false;
        Ok(())
    }
}

impl Entity for Recipe {
    type Id = RecipeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
