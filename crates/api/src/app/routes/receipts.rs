use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use lotledger_store::ReceiveStock;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/receipts", post(receive_stock))
}

pub async fn receive_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::ReceiveStockRequest>,
) -> axum::response::Response {
    let cmd = ReceiveStock {
        product_id: body.product_id,
        supplier_id: body.supplier_id,
        quantity: body.quantity,
        received_date: body.received_date,
        expiry_date: body.expiry_date,
        supplier_invoice: body.supplier_invoice,
        storage_location: body.storage_location,
        recorded_by: actor.user_id(),
        occurred_at: Utc::now(),
    };

    match services.ledger.receive_stock(cmd).await {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
