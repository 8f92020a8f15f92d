//! Chaos Engine web server.
//!
//! Run with: `GEMINI_API_KEY=... cargo run -p chaos-server`

use anyhow::Context;
use chaos_server::{build_router, AppState, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chaos_server=info,chaos_core=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env().context("failed to load configuration")?;
    let state = AppState::from_config(&config).context("failed to build application state")?;
    let app = build_router(state);

    info!(bind_addr = %config.bind_addr, model = %config.model, "chaos engine listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
