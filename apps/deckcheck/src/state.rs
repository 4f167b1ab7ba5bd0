use std::sync::Arc;

use crate::store::{AutomationLogStore, CostStore, DeckStore};

/// Shared state injected into the read-side route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub decks: Arc<dyn DeckStore>,
    pub logs: Arc<dyn AutomationLogStore>,
    pub costs: Arc<dyn CostStore>,
}
