//! Extractor: claims the oldest uploaded deck, extracts its text into pages
//! and hands the deck on to the critics by moving it to `analyzing`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::actors::{Actor, ActorDeps, RunOutcome};
use crate::automation::SessionLogger;
use crate::extraction::split_pages;
use crate::models::automation::SessionStatus;
use crate::models::deck::DeckStatus;

pub const EXTRACTOR_JOB: &str = "extractor";
const ACTION: &str = "extract_pdf";

enum Extraction {
    Extracted { deck_id: Uuid, page_count: i32 },
    NoWork,
    ClaimedElsewhere { deck_id: Uuid },
}

pub struct ExtractorActor {
    deps: ActorDeps,
    on_extracted: Option<Arc<Notify>>,
}

impl ExtractorActor {
    pub fn new(deps: ActorDeps) -> Self {
        Self {
            deps,
            on_extracted: None,
        }
    }

    /// Notified after every successful extraction.
    pub fn notify_on_extracted(mut self, notify: Arc<Notify>) -> Self {
        self.on_extracted = Some(notify);
        self
    }

    async fn extract_next(&self, log: &mut SessionLogger) -> Result<Extraction> {
        let decks = &self.deps.decks;

        let Some(deck) = decks
            .oldest_deck_with_status(DeckStatus::Uploaded)
            .await
            .context("Failed to query uploaded decks")?
        else {
            return Ok(Extraction::NoWork);
        };

        log.set_deck_context(deck.id, Some(&deck.file_name));
        log.add(
            format!("Found uploaded deck {}", deck.file_name),
            Some(json!({ "deckId": deck.id, "uploadedAt": deck.uploaded_at })),
        );

        if !decks
            .transition(deck.id, DeckStatus::Uploaded, DeckStatus::Extracting)
            .await
            .context("Failed to claim deck")?
        {
            return Ok(Extraction::ClaimedElsewhere { deck_id: deck.id });
        }
        log.add(
            format!("Deck claimed, status set to {}", DeckStatus::Extracting),
            None,
        );

        let bytes = self
            .deps
            .blobs
            .download(&deck.storage_path)
            .await
            .with_context(|| format!("Failed to download {}", deck.storage_path))?;
        log.add(
            "Downloaded deck file",
            Some(json!({ "path": deck.storage_path, "bytes": bytes.len() })),
        );

        let pdf = self.deps.pdf.clone();
        let extracted = tokio::task::spawn_blocking(move || pdf.extract(&bytes))
            .await
            .context("PDF extraction task failed")??;
        log.add(
            "Extracted text",
            Some(json!({
                "characters": extracted.text.chars().count(),
                "reportedPages": extracted.page_count,
            })),
        );

        let pages = split_pages(&extracted)?;
        let page_count = pages.len() as i32;

        decks
            .insert_pages(deck.id, &pages)
            .await
            .context("Failed to write pages")?;
        log.add(format!("Stored {page_count} pages"), None);

        decks
            .mark_analyzing(deck.id, page_count)
            .await
            .context("Failed to mark deck as analyzing")?;

        Ok(Extraction::Extracted {
            deck_id: deck.id,
            page_count,
        })
    }
}

#[async_trait]
impl Actor for ExtractorActor {
    fn name(&self) -> &'static str {
        EXTRACTOR_JOB
    }

    async fn run(&self) -> RunOutcome {
        let mut log = SessionLogger::new(self.deps.logs.clone());
        log.start_session(ACTION, None);

        match self.extract_next(&mut log).await {
            Ok(Extraction::Extracted {
                deck_id,
                page_count,
            }) => {
                log.add(format!("Deck {deck_id} ready for analysis"), None);
                let mut metadata = Map::new();
                metadata.insert("pageCount".to_string(), json!(page_count));
                log.end_session(Some(SessionStatus::Completed), Some(metadata))
                    .await;
                if let Some(notify) = &self.on_extracted {
                    notify.notify_one();
                }
                RunOutcome::Completed
            }
            Ok(Extraction::NoWork) => {
                log.add("No uploaded decks waiting", None);
                log.end_session(Some(SessionStatus::NoItemsFound), None)
                    .await;
                RunOutcome::NoItemsFound
            }
            Ok(Extraction::ClaimedElsewhere { deck_id }) => {
                log.add(format!("Deck {deck_id} was claimed by another worker"), None);
                let mut metadata = Map::new();
                metadata.insert("claimedElsewhere".to_string(), json!(true));
                log.end_session(Some(SessionStatus::NoItemsFound), Some(metadata))
                    .await;
                RunOutcome::NoItemsFound
            }
            Err(e) => {
                log.error("PDF extraction failed", Some(&e));
                if let Some(context) = log.deck_context().cloned() {
                    if let Err(mark_err) = self
                        .deps
                        .decks
                        .mark_error(context.deck_id, &format!("{e:#}"))
                        .await
                    {
                        log.error("Failed to record deck error", Some(&mark_err));
                    }
                }
                log.end_session(Some(SessionStatus::Failed), None).await;
                RunOutcome::Failed
            }
        }
    }
}
