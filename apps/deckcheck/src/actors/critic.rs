//! Critic: finds the first page lacking a "problem" insight across the oldest
//! analyzing decks, asks the model for a critique and stores it as an insight.
//!
//! Scan order: decks by processing timestamp (at most `deck_scan_limit`), then
//! pages by number. A deck is complete once it holds
//! `page_count × configured critique types` insights.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map};

use crate::actors::prompts::{build_problem_prompt, PROBLEM_CRITIC_SYSTEM};
use crate::actors::{Actor, ActorDeps, RunOutcome};
use crate::automation::SessionLogger;
use crate::costs::CostContext;
use crate::llm_client::tokens::count_tokens;
use crate::llm_client::{complete, CompletionOptions, LlmError};
use crate::models::automation::SessionStatus;
use crate::models::deck::{DeckRow, DeckStatus, InsightRow, InsightType, PageRow, PageStatus};

pub const CRITIC_JOB: &str = "critic";
/// Actor name written on insights and cost records.
pub const CRITIC_ACTOR_NAME: &str = "Critic";
const ACTION: &str = "critique_problem";

#[derive(Debug, Clone)]
pub struct CriticConfig {
    pub model: String,
    pub deck_scan_limit: i64,
    /// Every critique type a finished deck must have per page.
    pub critique_types: Vec<InsightType>,
}

/// Structured critique returned by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Critique {
    pub rating: i64,
    pub feedback: String,
    pub reasoning: String,
}

impl Critique {
    fn validated(self) -> Result<Self, LlmError> {
        if !(1..=10).contains(&self.rating) {
            return Err(LlmError::InvalidOutput(format!(
                "rating {} is outside 1-10",
                self.rating
            )));
        }
        Ok(self)
    }
}

enum Critiqued {
    Stored { page_number: i32, deck_complete: bool },
    NoWork,
}

pub struct CriticActor {
    deps: ActorDeps,
    config: CriticConfig,
    insight_type: InsightType,
}

impl CriticActor {
    pub fn new(deps: ActorDeps, config: CriticConfig) -> Self {
        Self {
            deps,
            config,
            insight_type: InsightType::Problem,
        }
    }

    /// First page, deck by deck, that has no insight of this critic's type.
    async fn find_page(&self, log: &mut SessionLogger) -> Result<Option<(DeckRow, PageRow)>> {
        let decks = self
            .deps
            .decks
            .decks_by_processed_at(DeckStatus::Analyzing, self.config.deck_scan_limit)
            .await
            .context("Failed to query analyzing decks")?;

        for deck in decks {
            let done = self
                .deps
                .decks
                .pages_with_insight(deck.id, self.insight_type)
                .await?;
            let pages = self.deps.decks.pages(deck.id).await?;

            if let Some(page) = pages
                .into_iter()
                .find(|p| !done.contains(&p.page_number))
            {
                return Ok(Some((deck, page)));
            }

            // Every page has this critique; the deck may only be missing its completion write.
            if self.refresh_completion(&deck).await? {
                log.add(format!("Deck {} marked complete during scan", deck.id), None);
            }
        }
        Ok(None)
    }

    async fn critique_next(&self, log: &mut SessionLogger) -> Result<Critiqued> {
        let Some((deck, page)) = self.find_page(log).await? else {
            return Ok(Critiqued::NoWork);
        };

        log.set_deck_context(deck.id, Some(&deck.file_name));
        let prompt =
            build_problem_prompt(page.page_number, deck.page_count, &deck.file_name, &page.text);
        log.add(
            format!("Critiquing page {} of {}", page.page_number, deck.page_count),
            Some(json!({
                "deckId": deck.id,
                "pageNumber": page.page_number,
                "estimatedPromptTokens": count_tokens(&prompt, &self.config.model),
            })),
        );

        let options = CompletionOptions::new(&self.config.model, PROBLEM_CRITIC_SYSTEM);
        let completion = complete::<Critique>(self.deps.ai.as_ref(), &prompt, &options)
            .await
            .context("Critique request failed")?;
        let critique = completion.result.validated()?;

        let cost = self
            .deps
            .costs
            .record_cost(
                &self.config.model,
                &completion.usage,
                ACTION,
                CostContext {
                    actor_name: CRITIC_ACTOR_NAME.to_string(),
                    deck_id: Some(deck.id),
                    page_number: Some(page.page_number),
                },
            )
            .await
            .context("Failed to record AI cost")?;
        log.add(
            format!("Critique received, rating {}", critique.rating),
            Some(json!({ "tokens": cost.total_tokens, "costUsd": cost.cost_usd })),
        );

        let insight = InsightRow {
            id: InsightRow::document_id(deck.id, page.page_number, self.insight_type),
            deck_id: deck.id,
            insight_type: self.insight_type,
            page_number: page.page_number,
            rating: critique.rating as i16,
            feedback: critique.feedback,
            reasoning: critique.reasoning,
            actor_name: CRITIC_ACTOR_NAME.to_string(),
            generated_at: Utc::now(),
        };
        if !self
            .deps
            .decks
            .insert_insight(&insight)
            .await
            .context("Failed to store insight")?
        {
            log.add(
                format!("Insight {} already existed, keeping stored copy", insight.id),
                None,
            );
        }

        let page_insights = self
            .deps
            .decks
            .count_page_insights(deck.id, page.page_number)
            .await?;
        if page_insights >= self.config.critique_types.len() as i64 {
            self.deps
                .decks
                .set_page_status(deck.id, page.page_number, PageStatus::Analyzed)
                .await?;
        }

        let deck_complete = self.refresh_completion(&deck).await?;
        Ok(Critiqued::Stored {
            page_number: page.page_number,
            deck_complete,
        })
    }

    /// Moves the deck to `complete` once every page has every configured critique.
    async fn refresh_completion(&self, deck: &DeckRow) -> Result<bool> {
        let expected = deck.page_count as i64 * self.config.critique_types.len() as i64;
        let stored = self
            .deps
            .decks
            .count_insights(deck.id)
            .await
            .context("Failed to count insights")?;
        if stored < expected {
            return Ok(false);
        }
        self.deps
            .decks
            .transition(deck.id, DeckStatus::Analyzing, DeckStatus::Complete)
            .await
            .context("Failed to mark deck complete")
    }
}

#[async_trait]
impl Actor for CriticActor {
    fn name(&self) -> &'static str {
        CRITIC_JOB
    }

    async fn run(&self) -> RunOutcome {
        let mut log = SessionLogger::new(self.deps.logs.clone());
        log.start_session(ACTION, None);

        match self.critique_next(&mut log).await {
            Ok(Critiqued::Stored {
                page_number,
                deck_complete,
            }) => {
                if deck_complete {
                    log.add("All pages critiqued, deck complete", None);
                }
                let mut metadata = Map::new();
                metadata.insert("pageNumber".to_string(), json!(page_number));
                metadata.insert("deckComplete".to_string(), json!(deck_complete));
                log.end_session(Some(SessionStatus::Completed), Some(metadata))
                    .await;
                RunOutcome::Completed
            }
            Ok(Critiqued::NoWork) => {
                log.add("No pages waiting for critique", None);
                log.end_session(Some(SessionStatus::NoItemsFound), None)
                    .await;
                RunOutcome::NoItemsFound
            }
            Err(e) => {
                log.error("Critique failed", Some(&e));
                log.end_session(Some(SessionStatus::Failed), None).await;
                RunOutcome::Failed
            }
        }
    }
}
