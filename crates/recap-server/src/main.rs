mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use recap_ai::GeminiClient;
use recap_api::AppStateInner;
use recap_db::{Database, MemoryStore, Store};

use crate::config::{Config, IN_MEMORY};

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str =
    "recap=debug,recap_api=debug,recap_ai=debug,recap_db=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    // Init storage
    let store: Arc<dyn Store> = if config.in_memory() {
        warn!("RECAP_DB_PATH is {}; data will not survive a restart", IN_MEMORY);
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(Database::open(&config.db_path)?)
    };

    let gemini = GeminiClient::new(config.gemini.clone())?;
    info!(
        "Using model {} (server key {})",
        gemini.model(),
        if config.gemini_api_key.is_some() { "configured" } else { "not configured" }
    );

    // Shared state
    let state = Arc::new(
        AppStateInner::new(store, Arc::new(gemini))
            .with_default_api_key(config.gemini_api_key.clone()),
    );

    let app = recap_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Recap server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
