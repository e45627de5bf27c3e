mod assessment;
mod config;
mod errors;
mod ingest;
mod llm;
mod questions;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment::store::SessionStore;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::questions::{KeywordQuestionGenerator, LlmQuestionGenerator, QuestionGenerator};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::StorageRouter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proctor API v{}", env!("CARGO_PKG_VERSION"));

    // Select the storage provider once, from configuration presence
    let storage = Arc::new(StorageRouter::from_config(&config).await);

    // Question generator: LLM-backed when an API key is configured,
    // deterministic keyword templates otherwise
    let generator: Arc<dyn QuestionGenerator> = match &config.anthropic_api_key {
        Some(api_key) => {
            info!("Question generator: LLM (model: {})", llm::MODEL);
            Arc::new(LlmQuestionGenerator::new(LlmClient::new(api_key.clone())))
        }
        None => {
            info!("Question generator: keyword templates");
            Arc::new(KeywordQuestionGenerator)
        }
    };

    let sessions = Arc::new(SessionStore::new());

    // Build app state
    let state = AppState {
        storage,
        sessions,
        generator,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
