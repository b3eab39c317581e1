use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use lotledger_store::RecordQualityCheck;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/quality-checks", post(record_quality_check))
}

pub async fn record_quality_check(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::RecordQualityCheckRequest>,
) -> axum::response::Response {
    let cmd = RecordQualityCheck {
        check_type_id: body.check_type_id,
        target: body.target,
        status: body.status,
        notes: body.notes,
        checked_by: actor.user_id(),
        checked_at: Utc::now(),
    };

    match services.ledger.record_quality_check(cmd).await {
        Ok(check) => (StatusCode::CREATED, Json(check)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
