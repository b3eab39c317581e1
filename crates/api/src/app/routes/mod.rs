use axum::Router;

pub mod catalog;
pub mod inventory;
pub mod lots;
pub mod productions;
pub mod quality;
pub mod receipts;
pub mod reports;
pub mod sales;
pub mod system;

/// All protected routes.
pub fn router() -> Router {
    Router::new()
        .merge(catalog::router())
        .merge(inventory::router())
        .merge(lots::router())
        .merge(productions::router())
        .merge(quality::router())
        .merge(receipts::router())
        .merge(reports::router())
        .merge(sales::router())
}
