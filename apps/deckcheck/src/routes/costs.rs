use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::costs::format_cost;
use crate::errors::AppError;
use crate::models::cost::{ActorCostRow, AiCostRecord};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCostResponse {
    pub records: Vec<AiCostRecord>,
    pub total_usd: f64,
    pub total_formatted: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorCostSummary {
    pub actor_name: String,
    pub calls: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummaryResponse {
    pub total_usd: f64,
    pub total_formatted: String,
    pub by_actor: Vec<ActorCostSummary>,
}

/// GET /api/v1/decks/:id/costs
pub async fn handle_deck_costs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeckCostResponse>, AppError> {
    if state.decks.get_deck(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Deck {id} not found")));
    }
    let records = state.costs.costs_for_deck(id).await?;
    let total_usd: f64 = records.iter().map(|r| r.cost_usd).sum();
    Ok(Json(DeckCostResponse {
        records,
        total_usd,
        total_formatted: format_cost(total_usd),
    }))
}

/// GET /api/v1/costs/summary
pub async fn handle_cost_summary(
    State(state): State<AppState>,
) -> Result<Json<CostSummaryResponse>, AppError> {
    let rows = state.costs.cost_by_actor().await?;
    Ok(Json(summarize(rows)))
}

fn summarize(rows: Vec<ActorCostRow>) -> CostSummaryResponse {
    let total_usd: f64 = rows.iter().map(|r| r.cost_usd).sum();
    let by_actor = rows
        .into_iter()
        .map(|row| ActorCostSummary {
            formatted: format_cost(row.cost_usd),
            actor_name: row.actor_name,
            calls: row.calls,
            total_tokens: row.total_tokens,
            cost_usd: row.cost_usd,
        })
        .collect();
    CostSummaryResponse {
        total_usd,
        total_formatted: format_cost(total_usd),
        by_actor,
    }
}
