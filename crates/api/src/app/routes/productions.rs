use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use lotledger_catalog::RecipeId;
use lotledger_store::ProduceRecipe;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/recipes/:id/productions", post(produce_recipe))
}

pub async fn produce_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<RecipeId>,
    Json(body): Json<dto::ProduceRecipeRequest>,
) -> axum::response::Response {
    let cmd = ProduceRecipe {
        recipe_id: id,
        batch_multiplier: body.batch_multiplier,
        recorded_by: actor.user_id(),
        occurred_at: Utc::now(),
    };

    match services.ledger.produce_recipe(cmd).await {
        Ok(production) => (StatusCode::CREATED, Json(production)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
