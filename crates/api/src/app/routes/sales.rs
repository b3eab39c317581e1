use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use lotledger_sales::SaleItemInput;
use lotledger_store::RecordSale;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/sales", post(record_sale))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::RecordSaleRequest>,
) -> axum::response::Response {
    let items = body
        .items
        .into_iter()
        .map(|i| SaleItemInput {
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: i.unit_price,
        })
        .collect();

    let cmd = RecordSale {
        items,
        recorded_by: actor.user_id(),
        occurred_at: Utc::now(),
    };

    match services.ledger.record_sale(cmd).await {
        Ok(sale) => (StatusCode::CREATED, Json(sale)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
