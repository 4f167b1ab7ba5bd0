//! Fakes and builders shared by actor and scheduler tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::actors::ActorDeps;
use crate::blob::BlobStore;
use crate::costs::CostLedger;
use crate::extraction::{ExtractedText, PdfTextExtractor};
use crate::llm_client::{AiGateway, Completion, CompletionOptions, LlmError, TokenUsage};
use crate::models::deck::{DeckRow, DeckStatus, PageRow, PageStatus};
use crate::store::memory::MemoryStore;

#[derive(Default)]
pub struct MemoryBlobStore {
    files: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn put(&self, path: &str, bytes: impl Into<Bytes>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.into());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, path: &str) -> Result<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("object {path} not found"))
    }
}

/// Treats the file bytes as UTF-8 text and reports a fixed page count.
pub struct TextPdfExtractor {
    pub page_count: usize,
}

impl PdfTextExtractor for TextPdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        Ok(ExtractedText {
            text: String::from_utf8(bytes.to_vec())?,
            page_count: self.page_count,
        })
    }
}

/// Replays queued responses in order and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Value, String>>>,
    calls: Mutex<Vec<(String, CompletionOptions)>>,
}

impl ScriptedGateway {
    pub fn respond_with(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn fail_with(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<(String, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn complete_json(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion<Value>, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(result)) => Ok(Completion {
                result,
                usage: TokenUsage {
                    prompt_tokens: 800,
                    completion_tokens: 120,
                    total_tokens: 920,
                    cost_usd: 0.0,
                },
            }),
            Some(Err(message)) => Err(LlmError::Api {
                status: 500,
                message,
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub ai: Arc<ScriptedGateway>,
    pub deps: ActorDeps,
}

pub fn harness(page_count: usize) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::default());
    let ai = Arc::new(ScriptedGateway::default());
    let deps = ActorDeps {
        decks: store.clone(),
        logs: store.clone(),
        costs: CostLedger::new(store.clone()),
        blobs: blobs.clone(),
        pdf: Arc::new(TextPdfExtractor { page_count }),
        ai: ai.clone(),
    };
    Harness {
        store,
        blobs,
        ai,
        deps,
    }
}

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// A deck uploaded `minutes` after a fixed base time.
pub fn deck(status: DeckStatus, minutes: i64) -> DeckRow {
    let id = Uuid::new_v4();
    DeckRow {
        id,
        file_name: format!("deck-{minutes}.pdf"),
        file_size: 1024,
        file_type: "application/pdf".to_string(),
        storage_path: format!("decks/{id}.pdf"),
        uploaded_at: base_time() + Duration::minutes(minutes),
        processed_at: None,
        status,
        page_count: 0,
        owner_id: None,
        error_message: None,
    }
}

/// An analyzing deck with `page_count` pages, processed `minutes` after the base time.
pub fn analyzing_deck(page_count: i32, minutes: i64) -> DeckRow {
    DeckRow {
        processed_at: Some(base_time() + Duration::minutes(minutes)),
        page_count,
        ..deck(DeckStatus::Analyzing, minutes)
    }
}

pub fn page(deck_id: Uuid, page_number: i32, text: &str) -> PageRow {
    PageRow {
        deck_id,
        page_number,
        text: text.to_string(),
        extracted_at: base_time(),
        word_count: text.split_whitespace().count() as i32,
        status: PageStatus::Extracted,
    }
}
