//! Polling actors. Each actor finds at most one unit of work per run, processes
//! it and records the run as one automation session.
//!
//! Actors never see each other; ordering between them comes from `DeckStatus`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::blob::BlobStore;
use crate::costs::CostLedger;
use crate::extraction::PdfTextExtractor;
use crate::llm_client::AiGateway;
use crate::store::{AutomationLogStore, DeckStore};

pub mod critic;
pub mod extractor;
pub mod prompts;

pub use critic::CriticActor;
pub use extractor::ExtractorActor;

/// How one actor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    NoItemsFound,
    Failed,
}

#[async_trait]
pub trait Actor: Send + Sync {
    /// Job name used for overlap tracking.
    fn name(&self) -> &'static str;

    /// Runs once. Failures are recorded, never returned.
    async fn run(&self) -> RunOutcome;
}

/// Collaborators shared by all actors.
#[derive(Clone)]
pub struct ActorDeps {
    pub decks: Arc<dyn DeckStore>,
    pub logs: Arc<dyn AutomationLogStore>,
    pub costs: CostLedger,
    pub blobs: Arc<dyn BlobStore>,
    pub pdf: Arc<dyn PdfTextExtractor>,
    pub ai: Arc<dyn AiGateway>,
}
