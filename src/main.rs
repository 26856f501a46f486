//! ChengeAI Advisor Chat Server
//!
//! Entry point for the advisor chat front end.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chenge_advisor::backend::HttpBackend;
use chenge_advisor::config::AppConfig;
use chenge_advisor::session::{ChatSessionStore, DEFAULT_SESSION_TIMEOUT};
use chenge_advisor::{AppState, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("default log directive")?),
        )
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = AppConfig::load().context("loading configuration")?;
    info!(
        name: "config.loaded",
        backend = %config.backend.base_url,
        "Configuration loaded"
    );

    let backend = Arc::new(HttpBackend::new(config.backend.base_url.clone()));
    let state = AppState {
        sessions: ChatSessionStore::new(backend),
    };

    // Periodic sweep so abandoned sessions don't accumulate.
    let sweeper = state.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let evicted = sweeper.prune_idle(DEFAULT_SESSION_TIMEOUT);
            if evicted > 0 {
                info!(
                    name: "sessions.evicted",
                    count = evicted,
                    "Evicted idle sessions"
                );
            }
        }
    });

    let app = server::router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;

    info!(
        name: "server.started",
        address = %address,
        "Server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
