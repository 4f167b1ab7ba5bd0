use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Deck lifecycle: `uploaded → extracting → analyzing → complete`, with `error`
/// reachable from `extracting` or `analyzing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckStatus {
    Uploaded,
    Extracting,
    Analyzing,
    Complete,
    Error,
}

impl DeckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeckStatus::Uploaded => "uploaded",
            DeckStatus::Extracting => "extracting",
            DeckStatus::Analyzing => "analyzing",
            DeckStatus::Complete => "complete",
            DeckStatus::Error => "error",
        }
    }

    /// `page_count` is only meaningful once extraction has finished.
    pub fn has_authoritative_page_count(&self) -> bool {
        matches!(
            self,
            DeckStatus::Analyzing | DeckStatus::Complete | DeckStatus::Error
        )
    }
}

impl fmt::Display for DeckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DeckStatus::Uploaded),
            "extracting" => Ok(DeckStatus::Extracting),
            "analyzing" => Ok(DeckStatus::Analyzing),
            "complete" => Ok(DeckStatus::Complete),
            "error" => Ok(DeckStatus::Error),
            other => Err(format!("unknown deck status '{other}'")),
        }
    }
}

impl TryFrom<String> for DeckStatus {
    type Error = String;

    // `Self::Error` would be ambiguous with the `Error` variant.
    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Reserved for writers outside the actors.
    Pending,
    Extracted,
    Analyzed,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Pending => "pending",
            PageStatus::Extracted => "extracted",
            PageStatus::Analyzed => "analyzed",
        }
    }
}

impl TryFrom<String> for PageStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(PageStatus::Pending),
            "extracted" => Ok(PageStatus::Extracted),
            "analyzed" => Ok(PageStatus::Analyzed),
            other => Err(format!("unknown page status '{other}'")),
        }
    }
}

/// Critique category produced by a critic actor. New categories are added here
/// and enabled through `CRITIQUE_TYPES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Problem,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Problem => "problem",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "problem" => Ok(InsightType::Problem),
            other => Err(format!("unknown insight type '{other}'")),
        }
    }
}

impl TryFrom<String> for InsightType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeckRow {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: DeckStatus,
    pub page_count: i32,
    pub owner_id: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PageRow {
    pub deck_id: Uuid,
    pub page_number: i32,
    pub text: String,
    pub extracted_at: DateTime<Utc>,
    pub word_count: i32,
    #[sqlx(try_from = "String")]
    pub status: PageStatus,
}

/// A page ready to be written by the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPage {
    pub page_number: i32,
    pub text: String,
    pub word_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InsightRow {
    pub id: String,
    pub deck_id: Uuid,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub page_number: i32,
    pub rating: i16,
    pub feedback: String,
    pub reasoning: String,
    pub actor_name: String,
    pub generated_at: DateTime<Utc>,
}

impl InsightRow {
    /// Document id that makes `(deck, page, type)` unique in the store.
    pub fn document_id(deck_id: Uuid, page_number: i32, insight_type: InsightType) -> String {
        format!("{deck_id}:{page_number}:{insight_type}")
    }
}
