use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use lotledger_inventory::LotId;
use lotledger_store::MarkExpired;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

/// Days ahead the expiring-soon listing looks by default.
const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;

pub fn router() -> Router {
    Router::new()
        .route("/lots/expiring", get(expiring_lots))
        .route("/lots/expired", get(expired_lots))
        .route("/lots/writeoffs", get(expired_writeoffs))
        .route("/lots/:id", get(get_lot))
        .route("/lots/:id/trace", get(trace_lot))
        .route("/lots/:id/expire", post(mark_expired))
}

pub async fn get_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<LotId>,
) -> axum::response::Response {
    match services.ledger.get_lot(id).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn trace_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<LotId>,
) -> axum::response::Response {
    match services.ledger.trace_lot(id).await {
        Ok(trace) => (StatusCode::OK, Json(trace)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn mark_expired(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<LotId>,
    Json(body): Json<dto::MarkExpiredRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let cmd = MarkExpired {
        lot_id: id,
        as_of: body.as_of.unwrap_or_else(|| now.date_naive()),
        removed_by: actor.user_id(),
        occurred_at: now,
        category: body.category,
        notes: body.notes,
    };

    match services.ledger.mark_expired(cmd).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn expiring_lots(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ExpiringQuery>,
) -> axum::response::Response {
    let days = query.days.unwrap_or(DEFAULT_EXPIRY_WARNING_DAYS);
    match services
        .ledger
        .expiring_lots(Utc::now().date_naive(), days)
        .await
    {
        Ok(lots) => (StatusCode::OK, Json(lots)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn expired_lots(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.expired_lots(Utc::now().date_naive()).await {
        Ok(lots) => (StatusCode::OK, Json(lots)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn expired_writeoffs(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.expired_writeoffs().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
