use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::automation::AutomationSession;
use crate::models::cost::{ActorCostRow, AiCostRecord};
use crate::models::deck::{DeckRow, DeckStatus, InsightRow, InsightType, NewPage, PageRow, PageStatus};
use crate::store::{AutomationLogStore, CostStore, DeckStore};

/// PostgreSQL-backed document store. Tables are created by `migrations/0001_init.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeckStore for PgStore {
    async fn get_deck(&self, deck_id: Uuid) -> Result<Option<DeckRow>> {
        Ok(
            sqlx::query_as::<_, DeckRow>("SELECT * FROM decks WHERE id = $1")
                .bind(deck_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn oldest_deck_with_status(&self, status: DeckStatus) -> Result<Option<DeckRow>> {
        Ok(sqlx::query_as::<_, DeckRow>(
            "SELECT * FROM decks WHERE status = $1 ORDER BY uploaded_at ASC LIMIT 1",
        )
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn decks_by_processed_at(&self, status: DeckStatus, limit: i64) -> Result<Vec<DeckRow>> {
        Ok(sqlx::query_as::<_, DeckRow>(
            "SELECT * FROM decks WHERE status = $1 ORDER BY processed_at ASC NULLS LAST LIMIT $2",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn transition(&self, deck_id: Uuid, from: DeckStatus, to: DeckStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE decks SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(deck_id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        debug!(
            %deck_id,
            from = from.as_str(),
            to = to.as_str(),
            rows = result.rows_affected(),
            "Deck status transition"
        );
        Ok(result.rows_affected() == 1)
    }

    async fn mark_analyzing(&self, deck_id: Uuid, page_count: i32) -> Result<()> {
        sqlx::query(
            "UPDATE decks SET status = $1, page_count = $2, processed_at = now() WHERE id = $3",
        )
        .bind(DeckStatus::Analyzing.as_str())
        .bind(page_count)
        .bind(deck_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_error(&self, deck_id: Uuid, message: &str) -> Result<()> {
        sqlx::query("UPDATE decks SET status = $1, error_message = $2 WHERE id = $3")
            .bind(DeckStatus::Error.as_str())
            .bind(message)
            .bind(deck_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_pages(&self, deck_id: Uuid, pages: &[NewPage]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for page in pages {
            sqlx::query(
                r#"
                INSERT INTO pages (deck_id, page_number, text, extracted_at, word_count, status)
                VALUES ($1, $2, $3, now(), $4, $5)
                "#,
            )
            .bind(deck_id)
            .bind(page.page_number)
            .bind(&page.text)
            .bind(page.word_count)
            .bind(PageStatus::Extracted.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert page {}", page.page_number))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn pages(&self, deck_id: Uuid) -> Result<Vec<PageRow>> {
        Ok(sqlx::query_as::<_, PageRow>(
            "SELECT * FROM pages WHERE deck_id = $1 ORDER BY page_number ASC",
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_page_status(
        &self,
        deck_id: Uuid,
        page_number: i32,
        status: PageStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE pages SET status = $1 WHERE deck_id = $2 AND page_number = $3")
            .bind(status.as_str())
            .bind(deck_id)
            .bind(page_number)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn pages_with_insight(
        &self,
        deck_id: Uuid,
        insight_type: InsightType,
    ) -> Result<HashSet<i32>> {
        let numbers: Vec<i32> = sqlx::query_scalar(
            "SELECT page_number FROM insights WHERE deck_id = $1 AND insight_type = $2",
        )
        .bind(deck_id)
        .bind(insight_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(numbers.into_iter().collect())
    }

    async fn insert_insight(&self, insight: &InsightRow) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO insights
                (id, deck_id, insight_type, page_number, rating, feedback, reasoning,
                 actor_name, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&insight.id)
        .bind(insight.deck_id)
        .bind(insight.insight_type.as_str())
        .bind(insight.page_number)
        .bind(insight.rating)
        .bind(&insight.feedback)
        .bind(&insight.reasoning)
        .bind(&insight.actor_name)
        .bind(insight.generated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insights(&self, deck_id: Uuid) -> Result<Vec<InsightRow>> {
        Ok(sqlx::query_as::<_, InsightRow>(
            "SELECT * FROM insights WHERE deck_id = $1 ORDER BY page_number ASC, insight_type ASC",
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_insights(&self, deck_id: Uuid) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM insights WHERE deck_id = $1")
                .bind(deck_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn count_page_insights(&self, deck_id: Uuid, page_number: i32) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM insights WHERE deck_id = $1 AND page_number = $2",
        )
        .bind(deck_id)
        .bind(page_number)
        .fetch_one(&self.pool)
        .await?)
    }
}

#[async_trait]
impl AutomationLogStore for PgStore {
    async fn append_session(&self, session: &AutomationSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO automation_logs
                (id, action, deck_id, status, started_at, completed_at, entries, errors, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id)
        .bind(&session.action)
        .bind(session.deck_id)
        .bind(session.status.as_str())
        .bind(session.started_at)
        .bind(session.completed_at)
        .bind(Json(&session.entries.0))
        .bind(&session.errors)
        .bind(Json(&session.metadata.0))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_sessions(&self, limit: i64) -> Result<Vec<AutomationSession>> {
        Ok(sqlx::query_as::<_, AutomationSession>(
            "SELECT * FROM automation_logs ORDER BY started_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl CostStore for PgStore {
    async fn append_cost(&self, record: &AiCostRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_costs
                (id, model, prompt_tokens, completion_tokens, total_tokens, cost_usd,
                 action, actor_name, deck_id, page_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(&record.model)
        .bind(record.prompt_tokens)
        .bind(record.completion_tokens)
        .bind(record.total_tokens)
        .bind(record.cost_usd)
        .bind(&record.action)
        .bind(&record.actor_name)
        .bind(record.deck_id)
        .bind(record.page_number)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn costs_for_deck(&self, deck_id: Uuid) -> Result<Vec<AiCostRecord>> {
        Ok(sqlx::query_as::<_, AiCostRecord>(
            "SELECT * FROM ai_costs WHERE deck_id = $1 ORDER BY created_at ASC",
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn cost_by_actor(&self) -> Result<Vec<ActorCostRow>> {
        Ok(sqlx::query_as::<_, ActorCostRow>(
            r#"
            SELECT actor_name,
                   COUNT(*) AS calls,
                   COALESCE(SUM(total_tokens), 0)::BIGINT AS total_tokens,
                   COALESCE(SUM(cost_usd), 0)::DOUBLE PRECISION AS cost_usd
            FROM ai_costs
            GROUP BY actor_name
            ORDER BY actor_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
