use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use lotledger_catalog::ProductId;
use lotledger_inventory::TransactionKind;
use lotledger_store::{AdjustStock, TransactionFilter};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(inventory_listing))
        .route("/products/:id/inventory", get(current_inventory))
        .route("/transactions", get(transactions))
        .route("/adjustments", post(adjust_stock))
}

pub async fn inventory_listing(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.inventory_listing().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn current_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<ProductId>,
) -> axum::response::Response {
    match services.ledger.current_inventory(id).await {
        Ok(quantity) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "product_id": id.to_string(),
                "quantity": quantity,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TransactionsQuery>,
) -> axum::response::Response {
    let kind = match query.kind.as_deref() {
        None => None,
        Some(s) => match TransactionKind::parse(s) {
            Some(kind) => Some(kind),
            None => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("unknown transaction kind '{s}'"),
                );
            }
        },
    };

    let filter = TransactionFilter {
        product_id: query.product_id,
        kind,
        occurred_after: query.after,
        occurred_before: query.before,
    };

    match services.ledger.transactions(filter).await {
        Ok(txs) => (StatusCode::OK, Json(txs)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let cmd = AdjustStock {
        product_id: body.product_id,
        delta: body.delta,
        recorded_by: actor.user_id(),
        occurred_at: Utc::now(),
        notes: body.notes,
    };

    match services.ledger.adjust_stock(cmd).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
