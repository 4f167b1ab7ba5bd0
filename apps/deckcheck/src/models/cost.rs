use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per external AI call. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiCostRecord {
    pub id: Uuid,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
    pub action: String,
    pub actor_name: String,
    pub deck_id: Option<Uuid>,
    pub page_number: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated spend for one actor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActorCostRow {
    pub actor_name: String,
    pub calls: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
}
