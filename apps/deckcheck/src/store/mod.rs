//! Storage ports for the shared document store.
//!
//! Actors depend on these traits only; `PgStore` backs them in production and
//! `memory::MemoryStore` backs them in tests.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::automation::AutomationSession;
use crate::models::cost::{ActorCostRow, AiCostRecord};
use crate::models::deck::{DeckRow, DeckStatus, InsightRow, InsightType, NewPage, PageRow, PageStatus};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// Decks and their page / insight children.
#[async_trait]
pub trait DeckStore: Send + Sync {
    async fn get_deck(&self, deck_id: Uuid) -> Result<Option<DeckRow>>;

    /// Oldest deck in `status`, ordered by upload time.
    async fn oldest_deck_with_status(&self, status: DeckStatus) -> Result<Option<DeckRow>>;

    /// Up to `limit` decks in `status`, oldest processing timestamp first.
    async fn decks_by_processed_at(&self, status: DeckStatus, limit: i64) -> Result<Vec<DeckRow>>;

    /// Conditional status change. Returns `false` when the deck was no longer in `from`.
    async fn transition(&self, deck_id: Uuid, from: DeckStatus, to: DeckStatus) -> Result<bool>;

    /// Sets `analyzing`, the final page count and the processing timestamp.
    async fn mark_analyzing(&self, deck_id: Uuid, page_count: i32) -> Result<()>;

    async fn mark_error(&self, deck_id: Uuid, message: &str) -> Result<()>;

    /// Writes all pages in one atomic batch.
    async fn insert_pages(&self, deck_id: Uuid, pages: &[NewPage]) -> Result<()>;

    /// Pages ordered by page number.
    async fn pages(&self, deck_id: Uuid) -> Result<Vec<PageRow>>;

    async fn set_page_status(&self, deck_id: Uuid, page_number: i32, status: PageStatus)
        -> Result<()>;

    /// Page numbers that already hold an insight of `insight_type`.
    async fn pages_with_insight(
        &self,
        deck_id: Uuid,
        insight_type: InsightType,
    ) -> Result<HashSet<i32>>;

    /// Insert-if-absent keyed by `InsightRow::id`. Returns `false` if it already existed.
    async fn insert_insight(&self, insight: &InsightRow) -> Result<bool>;

    async fn insights(&self, deck_id: Uuid) -> Result<Vec<InsightRow>>;

    async fn count_insights(&self, deck_id: Uuid) -> Result<i64>;

    async fn count_page_insights(&self, deck_id: Uuid, page_number: i32) -> Result<i64>;
}

/// Append-only automation session log.
#[async_trait]
pub trait AutomationLogStore: Send + Sync {
    async fn append_session(&self, session: &AutomationSession) -> Result<()>;

    async fn recent_sessions(&self, limit: i64) -> Result<Vec<AutomationSession>>;
}

/// Append-only AI cost ledger.
#[async_trait]
pub trait CostStore: Send + Sync {
    async fn append_cost(&self, record: &AiCostRecord) -> Result<()>;

    async fn costs_for_deck(&self, deck_id: Uuid) -> Result<Vec<AiCostRecord>>;

    async fn cost_by_actor(&self) -> Result<Vec<ActorCostRow>>;
}
