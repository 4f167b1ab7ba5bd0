pub mod automation;
pub mod costs;
pub mod decks;
pub mod health;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/decks/:id", get(decks::handle_get_deck))
        .route("/api/v1/decks/:id/costs", get(costs::handle_deck_costs))
        .route("/api/v1/costs/summary", get(costs::handle_cost_summary))
        .route(
            "/api/v1/automation/logs",
            get(automation::handle_recent_logs),
        )
        .with_state(state)
}
