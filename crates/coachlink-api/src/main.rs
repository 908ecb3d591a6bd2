//! Coachlink API server entry point.
//!
//! Resolves configuration from the environment, connects to Postgres when
//! configured, restores or seeds state, and serves the Axum application.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use coachlink_api::config::AppConfig;
use coachlink_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("configuration error: {e}");
        anyhow::anyhow!(e)
    })?;

    let pool = coachlink_api::db::init_pool().await?;
    let state = AppState::with_pool(config, pool);
    coachlink_api::bootstrap::initialize(&state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = coachlink_api::app(state);

    tracing::info!("coachlink-api listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
