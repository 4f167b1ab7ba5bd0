use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::deck::{DeckRow, InsightRow, PageRow};
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeckProgress {
    /// `None` until extraction has produced an authoritative page count.
    pub total_pages: Option<i32>,
    pub critiqued_pages: usize,
    pub percent: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDetailResponse {
    pub deck: DeckRow,
    pub pages: Vec<PageRow>,
    pub insights: Vec<InsightRow>,
    pub progress: DeckProgress,
}

/// GET /api/v1/decks/:id
pub async fn handle_get_deck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeckDetailResponse>, AppError> {
    let deck = state
        .decks
        .get_deck(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Deck {id} not found")))?;
    let pages = state.decks.pages(id).await?;
    let insights = state.decks.insights(id).await?;
    let progress = compute_progress(&deck, &insights);

    Ok(Json(DeckDetailResponse {
        deck,
        pages,
        insights,
        progress,
    }))
}

fn compute_progress(deck: &DeckRow, insights: &[InsightRow]) -> DeckProgress {
    let mut critiqued: Vec<i32> = insights.iter().map(|i| i.page_number).collect();
    critiqued.sort_unstable();
    critiqued.dedup();

    if !deck.status.has_authoritative_page_count() {
        return DeckProgress {
            total_pages: None,
            critiqued_pages: critiqued.len(),
            percent: 0,
        };
    }

    let percent = if deck.page_count > 0 {
        ((critiqued.len() as f64 / deck.page_count as f64) * 100.0).min(100.0) as u8
    } else {
        0
    };
    DeckProgress {
        total_pages: Some(deck.page_count),
        critiqued_pages: critiqued.len(),
        percent,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::deck::{DeckStatus, InsightType};
    use crate::test_support::{analyzing_deck, deck};

    fn insight(deck_id: Uuid, page_number: i32) -> InsightRow {
        InsightRow {
            id: InsightRow::document_id(deck_id, page_number, InsightType::Problem),
            deck_id,
            insight_type: InsightType::Problem,
            page_number,
            rating: 6,
            feedback: "f".to_string(),
            reasoning: "r".to_string(),
            actor_name: "Critic".to_string(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_progress_hidden_before_extraction() {
        let uploaded = deck(DeckStatus::Extracting, 0);
        let progress = compute_progress(&uploaded, &[]);
        assert_eq!(progress.total_pages, None);
        assert_eq!(progress.percent, 0);
    }

    #[test]
    fn test_progress_counts_distinct_pages() {
        let analyzing = analyzing_deck(4, 0);
        let insights = vec![insight(analyzing.id, 1), insight(analyzing.id, 3)];
        let progress = compute_progress(&analyzing, &insights);
        assert_eq!(
            progress,
            DeckProgress {
                total_pages: Some(4),
                critiqued_pages: 2,
                percent: 50,
            }
        );
    }
}
