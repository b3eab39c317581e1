use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use lotledger_catalog::SupplierId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Balance at or below which a product counts as low stock.
const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

pub fn router() -> Router {
    Router::new()
        .route("/reports/summary", get(summary))
        .route("/reports/low-stock", get(low_stock))
        .route(
            "/reports/products",
            get(product_report).post(refresh_product_report),
        )
        .route("/reports/invoices/:supplier_id/:invoice", get(invoice_summary))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.dashboard_summary(Utc::now()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LowStockQuery>,
) -> axum::response::Response {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    match services.ledger.low_stock(threshold).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn product_report(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.product_report().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn refresh_product_report(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.refresh_product_report(Utc::now()).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(serde_json::json!({ "rows_refreshed": rows })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn invoice_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Path((supplier_id, invoice)): Path<(SupplierId, String)>,
) -> axum::response::Response {
    match services.ledger.invoice_summary(supplier_id, &invoice).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
