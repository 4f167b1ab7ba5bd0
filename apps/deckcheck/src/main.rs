mod actors;
mod automation;
mod blob;
mod config;
mod costs;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod scheduler;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::actors::critic::CriticConfig;
use crate::actors::{ActorDeps, CriticActor, ExtractorActor};
use crate::blob::{build_s3_client, S3BlobStore};
use crate::config::Config;
use crate::costs::CostLedger;
use crate::db::create_pool;
use crate::extraction::PdfExtractor;
use crate::llm_client::tokens::count_tokens;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scheduler::uploads::listen_for_uploads;
use crate::scheduler::Scheduler;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DeckCheck v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool));

    let s3 = build_s3_client(&config).await;
    let blobs = Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!(bucket = %config.s3_bucket, "S3 client initialized");

    let ai = Arc::new(LlmClient::new(config.openai_api_key.clone())?);
    info!(model = %config.openai_model, "AI gateway initialized");

    let model = config.openai_model.clone();
    tokio::task::spawn_blocking(move || count_tokens("", &model));

    let deps = ActorDeps {
        decks: store.clone(),
        logs: store.clone(),
        costs: CostLedger::new(store.clone()),
        blobs,
        pdf: Arc::new(PdfExtractor),
        ai,
    };

    let extractor_wake = Arc::new(Notify::new());
    let critic_wake = Arc::new(Notify::new());

    let extractor = ExtractorActor::new(deps.clone()).notify_on_extracted(critic_wake.clone());
    let critic = CriticActor::new(
        deps,
        CriticConfig {
            model: config.openai_model.clone(),
            deck_scan_limit: config.critic_deck_scan_limit,
            critique_types: config.critique_types.clone(),
        },
    );

    let mut scheduler = Scheduler::new();
    scheduler.register(
        Arc::new(extractor),
        config.extractor_interval,
        extractor_wake.clone(),
    );
    scheduler.register(Arc::new(critic), config.critic_interval, critic_wake);
    let _jobs = scheduler.start();

    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            tokio::spawn(listen_for_uploads(
                client,
                config.upload_channel.clone(),
                extractor_wake,
            ));
        }
        None => info!("REDIS_URL not set, relying on interval polling only"),
    }

    let state = AppState {
        decks: store.clone(),
        logs: store.clone(),
        costs: store,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tokio::select! {
        result = axum::serve(listener, app) => result?,
        _ = shutdown_signal() => {}
    }

    // In-flight actor runs are abandoned; the next start resumes from the store.
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
