//! Session logger: buffers one actor invocation's log lines and errors and
//! writes them as a single automation log record when the session ends.
//!
//! Each actor run constructs its own `SessionLogger`, so concurrent runs never
//! share a buffer. Every call also goes to `tracing` for live observability.

use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::automation::{AutomationSession, LogEntry, SessionStatus};
use crate::store::AutomationLogStore;

/// Deck the current run is working on, kept for failure handling.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckContext {
    pub deck_id: Uuid,
    pub file_name: Option<String>,
}

pub struct SessionLogger {
    store: Arc<dyn AutomationLogStore>,
    session: Option<AutomationSession>,
    entries: Vec<LogEntry>,
    deck_context: Option<DeckContext>,
}

impl SessionLogger {
    pub fn new(store: Arc<dyn AutomationLogStore>) -> Self {
        Self {
            store,
            session: None,
            entries: Vec::new(),
            deck_context: None,
        }
    }

    /// Starts a session. An unflushed previous session is dropped without a write.
    pub fn start_session(&mut self, action: &str, deck_id: Option<Uuid>) {
        if let Some(previous) = self.session.take() {
            warn!(
                action = %previous.action,
                "Discarding unfinished automation session"
            );
        }
        self.entries.clear();
        self.deck_context = deck_id.map(|deck_id| DeckContext {
            deck_id,
            file_name: None,
        });
        self.session = Some(AutomationSession::new(action, deck_id));
        info!(action, "Automation session started");
    }

    pub fn set_deck_context(&mut self, deck_id: Uuid, file_name: Option<&str>) {
        self.deck_context = Some(DeckContext {
            deck_id,
            file_name: file_name.map(String::from),
        });
        if let Some(session) = self.session.as_mut() {
            session.deck_id = Some(deck_id);
            if let Some(name) = file_name {
                session
                    .metadata
                    .0
                    .insert("fileName".to_string(), Value::String(name.to_string()));
            }
        }
    }

    pub fn deck_context(&self) -> Option<&DeckContext> {
        self.deck_context.as_ref()
    }

    pub fn add(&mut self, message: impl Into<String>, data: Option<Value>) {
        let message = message.into();
        match &data {
            Some(data) => info!(%data, "{message}"),
            None => info!("{message}"),
        }
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            message,
            data,
        });
    }

    /// Records `"{message}: {err}"` and forces the session to `failed`.
    pub fn error(&mut self, message: &str, err: Option<&dyn Display>) {
        let normalized = match err {
            Some(err) => format!("{message}: {err:#}"),
            None => message.to_string(),
        };
        match &self.deck_context {
            Some(ctx) => error!(
                deck_id = %ctx.deck_id,
                file_name = ctx.file_name.as_deref().unwrap_or("-"),
                "{normalized}"
            ),
            None => error!("{normalized}"),
        }

        if let Some(session) = self.session.as_mut() {
            session.errors.push(normalized);
            session.status = SessionStatus::Failed;
        }
    }

    /// Writes the session once and resets all state. Write failures are only logged.
    pub async fn end_session(
        &mut self,
        status: Option<SessionStatus>,
        metadata: Option<Map<String, Value>>,
    ) {
        let Some(mut session) = self.session.take() else {
            warn!("end_session called without an active automation session");
            return;
        };

        if let Some(status) = status {
            session.status = status;
        }
        if let Some(metadata) = metadata {
            session.metadata.0.extend(metadata);
        }
        session.completed_at = Some(Utc::now());
        session.entries.0 = std::mem::take(&mut self.entries);
        self.deck_context = None;

        match self.store.append_session(&session).await {
            Ok(()) => info!(
                action = %session.action,
                status = session.status.as_str(),
                entries = session.entries.0.len(),
                "Automation session recorded"
            ),
            Err(e) => error!(
                action = %session.action,
                "Failed to write automation session: {e:#}"
            ),
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }
}
