use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Terminal status of one actor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Completed,
    Failed,
    NoItemsFound,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::NoItemsFound => "no_items_found",
        }
    }
}

impl TryFrom<String> for SessionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            "no_items_found" => Ok(SessionStatus::NoItemsFound),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The record written once when an actor session ends.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSession {
    pub id: Uuid,
    pub action: String,
    pub deck_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub entries: Json<Vec<LogEntry>>,
    pub errors: Vec<String>,
    pub metadata: Json<Map<String, Value>>,
}

impl AutomationSession {
    pub fn new(action: &str, deck_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.to_string(),
            deck_id,
            status: SessionStatus::Completed,
            started_at: Utc::now(),
            completed_at: None,
            entries: Json(Vec::new()),
            errors: Vec::new(),
            metadata: Json(Map::new()),
        }
    }
}
