//! In-memory store used by actor tests. Mirrors the ordering and conditional
//! write semantics of `PgStore`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::automation::AutomationSession;
use crate::models::cost::{ActorCostRow, AiCostRecord};
use crate::models::deck::{DeckRow, DeckStatus, InsightRow, InsightType, NewPage, PageRow, PageStatus};
use crate::store::{AutomationLogStore, CostStore, DeckStore};

#[derive(Default)]
struct State {
    decks: BTreeMap<Uuid, DeckRow>,
    pages: BTreeMap<(Uuid, i32), PageRow>,
    insights: BTreeMap<String, InsightRow>,
    sessions: Vec<AutomationSession>,
    costs: Vec<AiCostRecord>,
    fail_session_appends: bool,
    lose_next_claim: bool,
    insight_written_elsewhere: Option<InsightRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_deck(&self, deck: DeckRow) {
        self.state.lock().unwrap().decks.insert(deck.id, deck);
    }

    pub fn put_page(&self, page: PageRow) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert((page.deck_id, page.page_number), page);
    }

    pub fn deck(&self, deck_id: Uuid) -> DeckRow {
        self.state.lock().unwrap().decks[&deck_id].clone()
    }

    pub fn all_pages(&self, deck_id: Uuid) -> Vec<PageRow> {
        self.state
            .lock()
            .unwrap()
            .pages
            .values()
            .filter(|p| p.deck_id == deck_id)
            .cloned()
            .collect()
    }

    pub fn all_insights(&self) -> Vec<InsightRow> {
        self.state.lock().unwrap().insights.values().cloned().collect()
    }

    pub fn sessions(&self) -> Vec<AutomationSession> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn costs(&self) -> Vec<AiCostRecord> {
        self.state.lock().unwrap().costs.clone()
    }

    pub fn fail_session_appends(&self) {
        self.state.lock().unwrap().fail_session_appends = true;
    }

    /// The next `transition` reports the deck as already moved by another worker.
    pub fn lose_next_claim(&self) {
        self.state.lock().unwrap().lose_next_claim = true;
    }

    /// `insight` lands in the store just before the next `insert_insight`.
    pub fn write_insight_before_next_insert(&self, insight: InsightRow) {
        self.state.lock().unwrap().insight_written_elsewhere = Some(insight);
    }
}

#[async_trait]
impl DeckStore for MemoryStore {
    async fn get_deck(&self, deck_id: Uuid) -> Result<Option<DeckRow>> {
        Ok(self.state.lock().unwrap().decks.get(&deck_id).cloned())
    }

    async fn oldest_deck_with_status(&self, status: DeckStatus) -> Result<Option<DeckRow>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .decks
            .values()
            .filter(|d| d.status == status)
            .min_by_key(|d| d.uploaded_at)
            .cloned())
    }

    async fn decks_by_processed_at(&self, status: DeckStatus, limit: i64) -> Result<Vec<DeckRow>> {
        let state = self.state.lock().unwrap();
        let mut decks: Vec<DeckRow> = state
            .decks
            .values()
            .filter(|d| d.status == status)
            .cloned()
            .collect();
        decks.sort_by_key(|d| (d.processed_at.is_none(), d.processed_at));
        decks.truncate(limit.max(0) as usize);
        Ok(decks)
    }

    async fn transition(&self, deck_id: Uuid, from: DeckStatus, to: DeckStatus) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.lose_next_claim) {
            return Ok(false);
        }
        match state.decks.get_mut(&deck_id) {
            Some(deck) if deck.status == from => {
                deck.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_analyzing(&self, deck_id: Uuid, page_count: i32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let deck = state
            .decks
            .get_mut(&deck_id)
            .ok_or_else(|| anyhow!("deck {deck_id} not found"))?;
        deck.status = DeckStatus::Analyzing;
        deck.page_count = page_count;
        deck.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_error(&self, deck_id: Uuid, message: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let deck = state
            .decks
            .get_mut(&deck_id)
            .ok_or_else(|| anyhow!("deck {deck_id} not found"))?;
        deck.status = DeckStatus::Error;
        deck.error_message = Some(message.to_string());
        Ok(())
    }

    async fn insert_pages(&self, deck_id: Uuid, pages: &[NewPage]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if pages
            .iter()
            .any(|p| state.pages.contains_key(&(deck_id, p.page_number)))
        {
            return Err(anyhow!("duplicate page for deck {deck_id}"));
        }
        for page in pages {
            state.pages.insert(
                (deck_id, page.page_number),
                PageRow {
                    deck_id,
                    page_number: page.page_number,
                    text: page.text.clone(),
                    extracted_at: Utc::now(),
                    word_count: page.word_count,
                    status: PageStatus::Extracted,
                },
            );
        }
        Ok(())
    }

    async fn pages(&self, deck_id: Uuid) -> Result<Vec<PageRow>> {
        Ok(self.all_pages(deck_id))
    }

    async fn set_page_status(
        &self,
        deck_id: Uuid,
        page_number: i32,
        status: PageStatus,
    ) -> Result<()> {
        if let Some(page) = self
            .state
            .lock()
            .unwrap()
            .pages
            .get_mut(&(deck_id, page_number))
        {
            page.status = status;
        }
        Ok(())
    }

    async fn pages_with_insight(
        &self,
        deck_id: Uuid,
        insight_type: InsightType,
    ) -> Result<HashSet<i32>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .insights
            .values()
            .filter(|i| i.deck_id == deck_id && i.insight_type == insight_type)
            .map(|i| i.page_number)
            .collect())
    }

    async fn insert_insight(&self, insight: &InsightRow) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if let Some(elsewhere) = state.insight_written_elsewhere.take() {
            state.insights.insert(elsewhere.id.clone(), elsewhere);
        }
        if state.insights.contains_key(&insight.id) {
            return Ok(false);
        }
        state.insights.insert(insight.id.clone(), insight.clone());
        Ok(true)
    }

    async fn insights(&self, deck_id: Uuid) -> Result<Vec<InsightRow>> {
        Ok(self
            .all_insights()
            .into_iter()
            .filter(|i| i.deck_id == deck_id)
            .collect())
    }

    async fn count_insights(&self, deck_id: Uuid) -> Result<i64> {
        Ok(self.insights(deck_id).await?.len() as i64)
    }

    async fn count_page_insights(&self, deck_id: Uuid, page_number: i32) -> Result<i64> {
        Ok(self
            .insights(deck_id)
            .await?
            .iter()
            .filter(|i| i.page_number == page_number)
            .count() as i64)
    }
}

#[async_trait]
impl AutomationLogStore for MemoryStore {
    async fn append_session(&self, session: &AutomationSession) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_session_appends {
            return Err(anyhow!("automation log store unavailable"));
        }
        state.sessions.push(session.clone());
        Ok(())
    }

    async fn recent_sessions(&self, limit: i64) -> Result<Vec<AutomationSession>> {
        let mut sessions = self.sessions();
        sessions.reverse();
        sessions.truncate(limit.max(0) as usize);
        Ok(sessions)
    }
}

#[async_trait]
impl CostStore for MemoryStore {
    async fn append_cost(&self, record: &AiCostRecord) -> Result<()> {
        self.state.lock().unwrap().costs.push(record.clone());
        Ok(())
    }

    async fn costs_for_deck(&self, deck_id: Uuid) -> Result<Vec<AiCostRecord>> {
        Ok(self
            .costs()
            .into_iter()
            .filter(|c| c.deck_id == Some(deck_id))
            .collect())
    }

    async fn cost_by_actor(&self) -> Result<Vec<ActorCostRow>> {
        let mut rows: BTreeMap<String, ActorCostRow> = BTreeMap::new();
        for cost in self.costs() {
            let row = rows
                .entry(cost.actor_name.clone())
                .or_insert_with(|| ActorCostRow {
                    actor_name: cost.actor_name.clone(),
                    calls: 0,
                    total_tokens: 0,
                    cost_usd: 0.0,
                });
            row.calls += 1;
            row.total_tokens += cost.total_tokens;
            row.cost_usd += cost.cost_usd;
        }
        Ok(rows.into_values().collect())
    }
}
