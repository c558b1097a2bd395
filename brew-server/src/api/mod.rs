//! API routes for brew-server

pub mod health;
pub mod orders;

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let orders = Router::new()
        .route(
            "/api/orders",
            post(orders::place_order).get(orders::list_orders),
        )
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/status", patch(orders::update_status));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(orders)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
