//! AI cost ledger: static per-model pricing plus an append-only record of every call.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm_client::TokenUsage;
use crate::models::cost::AiCostRecord;
use crate::store::CostStore;

/// Pricing used for any model missing from `PRICING`.
pub const FALLBACK_MODEL: &str = "gpt-4o-mini";

/// (model, USD per 1M input tokens, USD per 1M output tokens)
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4.1", 2.00, 8.00),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4.1-nano", 0.10, 0.40),
    ("gpt-4-turbo", 10.00, 30.00),
    ("gpt-4", 30.00, 60.00),
    ("gpt-3.5-turbo", 0.50, 1.50),
];

fn price_for(model: &str) -> Option<(f64, f64)> {
    PRICING
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
}

/// USD cost of one call. Unknown models are priced as `FALLBACK_MODEL`.
pub fn calculate_cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    match price_for(model) {
        Some((input, output)) => {
            (prompt_tokens as f64 / 1_000_000.0) * input
                + (completion_tokens as f64 / 1_000_000.0) * output
        }
        None => {
            warn!(model, "Unknown model pricing, using {FALLBACK_MODEL}");
            calculate_cost(FALLBACK_MODEL, prompt_tokens, completion_tokens)
        }
    }
}

/// Sub-cent amounts render in thousandths of a dollar ("0.100m$"),
/// everything else as a 4-decimal dollar string ("$0.0200").
pub fn format_cost(usd: f64) -> String {
    if usd < 0.01 {
        format!("{:.3}m$", usd * 1000.0)
    } else {
        format!("${usd:.4}")
    }
}

/// Who made an AI call and on behalf of which deck/page.
#[derive(Debug, Clone)]
pub struct CostContext {
    pub actor_name: String,
    pub deck_id: Option<Uuid>,
    pub page_number: Option<i32>,
}

#[derive(Clone)]
pub struct CostLedger {
    store: Arc<dyn CostStore>,
}

impl CostLedger {
    pub fn new(store: Arc<dyn CostStore>) -> Self {
        Self { store }
    }

    /// Prices `usage` and appends an `AiCostRecord`. Storage errors propagate.
    pub async fn record_cost(
        &self,
        model: &str,
        usage: &TokenUsage,
        action: &str,
        context: CostContext,
    ) -> Result<AiCostRecord> {
        let cost_usd = calculate_cost(model, usage.prompt_tokens, usage.completion_tokens);
        let record = AiCostRecord {
            id: Uuid::new_v4(),
            model: model.to_string(),
            prompt_tokens: usage.prompt_tokens as i64,
            completion_tokens: usage.completion_tokens as i64,
            total_tokens: usage.total_tokens as i64,
            cost_usd,
            action: action.to_string(),
            actor_name: context.actor_name,
            deck_id: context.deck_id,
            page_number: context.page_number,
            created_at: Utc::now(),
        };

        self.store.append_cost(&record).await?;
        info!(
            model,
            action,
            actor = %record.actor_name,
            tokens = record.total_tokens,
            cost = %format_cost(cost_usd),
            "Recorded AI cost"
        );
        Ok(record)
    }
}
