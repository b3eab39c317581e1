use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use lotledger_core::LedgerError;

/// Map a ledger error to the JSON error envelope.
pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        LedgerError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        LedgerError::InsufficientInventory {
            product,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_inventory",
                "message": format!(
                    "insufficient inventory for {product}: requested {requested}, available {available}"
                ),
                "product": product,
                "requested": requested,
                "available": available,
            })),
        )
            .into_response(),
        LedgerError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
        LedgerError::ConcurrencyConflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        LedgerError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "internal storage failure",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_the_documented_status_codes() {
        let cases = [
            (LedgerError::validation("x"), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("x"), StatusCode::NOT_FOUND),
            (LedgerError::insufficient("P", 2, 1), StatusCode::CONFLICT),
            (LedgerError::invalid_state("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::conflict("x"), StatusCode::CONFLICT),
            (LedgerError::storage("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ledger_error_to_response(err).status(), status);
        }
    }
}
