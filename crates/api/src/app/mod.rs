//! HTTP application wiring (Axum router + service wiring).
//!
//! Folder layout:
//! - `services.rs`: store wiring (Postgres or in-memory behind the traits)
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::auth::Hs256TokenValidator;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(jwt_secret: String, services: Arc<services::AppServices>) -> Router {
    let validator = Arc::new(Hs256TokenValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { validator };

    // Protected routes: require a validated acting user.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
