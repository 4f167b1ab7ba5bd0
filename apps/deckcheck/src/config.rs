use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::models::deck::InsightType;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub upload_channel: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub port: u16,
    pub rust_log: String,
    pub extractor_interval: Duration,
    pub critic_interval: Duration,
    pub critic_deck_scan_limit: i64,
    pub critique_types: Vec<InsightType>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            upload_channel: std::env::var("UPLOAD_CHANNEL")
                .unwrap_or_else(|_| "deckcheck:decks:uploaded".to_string()),
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| crate::llm_client::DEFAULT_MODEL.to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            extractor_interval: Duration::from_secs(parse_env("EXTRACTOR_INTERVAL_SECS", 20)?),
            critic_interval: Duration::from_secs(parse_env("CRITIC_INTERVAL_SECS", 30)?),
            critic_deck_scan_limit: parse_env("CRITIC_DECK_SCAN_LIMIT", 10)?,
            critique_types: parse_critique_types(
                &std::env::var("CRITIQUE_TYPES").unwrap_or_else(|_| "problem".to_string()),
            )?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Comma-separated critique types, e.g. `problem`. Duplicates collapse; empty is an error.
fn parse_critique_types(raw: &str) -> Result<Vec<InsightType>> {
    let mut types = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let insight_type: InsightType = part
            .parse()
            .map_err(|e: String| anyhow!("CRITIQUE_TYPES: {e}"))?;
        if !types.contains(&insight_type) {
            types.push(insight_type);
        }
    }
    if types.is_empty() {
        return Err(anyhow!("CRITIQUE_TYPES must name at least one critique type"));
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_critique_types() {
        assert_eq!(
            parse_critique_types("problem").unwrap(),
            vec![InsightType::Problem]
        );
        assert_eq!(
            parse_critique_types(" problem , problem,").unwrap(),
            vec![InsightType::Problem]
        );
    }

    #[test]
    fn test_parse_critique_types_rejects_unknown_and_empty() {
        assert!(parse_critique_types("problem,team").is_err());
        assert!(parse_critique_types(" , ").is_err());
    }
}
