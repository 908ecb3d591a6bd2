//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When `DATABASE_URL` is set the
//! API writes every committed change through to Postgres and reloads the
//! full state on startup; when absent it runs in-memory only (suitable
//! for development and testing — state does not survive restarts).
//!
//! The in-memory store stays authoritative for reads either way; the
//! database exists so a restart does not lose the fleet.

pub mod reference;
pub mod requests;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the connection pool and run embedded migrations.
///
/// Returns `None` if `DATABASE_URL` is not set. Returns `Err` if the URL
/// is set but the connection or a migration fails — a configured database
/// that cannot be reached is fatal, not silently ignored.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only. \
                 Requests will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
