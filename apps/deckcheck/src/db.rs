use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Connects to PostgreSQL and makes sure the DeckCheck tables exist.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    // Every statement in the schema is idempotent (IF NOT EXISTS).
    pool.execute(SCHEMA)
        .await
        .context("Failed to apply database schema")?;

    info!("PostgreSQL pool established, schema ready");
    Ok(pool)
}
