use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod billing;
pub mod health;
pub mod occupancies;
pub mod payments;
pub mod reports;
pub mod rooms;
pub mod tenants;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(rooms::router())
        .merge(tenants::router())
        .merge(occupancies::router())
        .merge(billing::router())
        .merge(payments::router())
        .merge(reports::router())
}
