mod api;
mod config;
mod db;
mod embeddings;
mod error;
mod llm;
mod models;
mod oauth;
mod processing;
mod services;
mod sources;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "magpie")]
#[command(about = "Personal knowledge copilot: document ingestion, retrieval, and grounded answering")]
struct Args {}

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{Database, DatabaseBackend, LibSqlBackend};
use crate::embeddings::EmbeddingProvider;
use crate::llm::LlmProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magpie=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.server.api_keys.is_empty() {
        tracing::warn!(
            "MAGPIE_API_KEYS is not set — all protected endpoints are locked. Set MAGPIE_API_KEYS to enable access."
        );
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, config.embeddings.dimensions).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    tracing::info!("Initializing embeddings: {}...", config.embeddings.model);
    let embeddings = Arc::new(EmbeddingProvider::new(&config.embeddings)?);

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - tagging and answering will be degraded");
    }

    let sweep_interval = config.processing.embed_sweep_interval_secs;
    let state = AppState::new(config.clone(), db, embeddings, llm)?;

    let cancel_token = CancellationToken::new();

    if sweep_interval > 0 {
        tracing::info!("Starting embed sweeper... (interval={}s)", sweep_interval);
        let pipeline = state.pipeline.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Embed sweeper shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(sweep_interval)) => {
                        match pipeline.process_pending().await {
                            Ok(0) => {}
                            Ok(count) => tracing::info!(count, "Embed sweep completed"),
                            Err(e) => tracing::error!("Embed sweep error: {}", e),
                        }
                    }
                }
            }
        });
    } else {
        tracing::info!("Embed sweeper disabled (interval=0)");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Magpie starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
