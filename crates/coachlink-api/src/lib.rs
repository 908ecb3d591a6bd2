//! # coachlink-api — Axum API Service
//!
//! The HTTP surface of the Coachlink coordination service.
//!
//! ## API Surface
//!
//! | Prefix                 | Module                  | Access              |
//! |------------------------|-------------------------|---------------------|
//! | `/api/auth/*`          | [`routes::auth`]        | public              |
//! | `/api/requests` (POST) | [`routes::requests`]    | public intake       |
//! | `/api/requests/*`      | [`routes::requests`]    | coordinator/viewer; mutations coordinator-only |
//! | `/api/drivers/*`       | [`routes::drivers`]     | coordinator/viewer  |
//! | `/api/vehicles/*`      | [`routes::vehicles`]    | coordinator/viewer  |
//! | `/api/events/requests` | [`routes::events`]      | coordinator/viewer (SSE) |
//! | `/api/analytics/*`     | [`routes::analytics`]   | coordinator/viewer  |
//! | `/health/*`, `/metrics`, `/openapi.json` | here / [`openapi`] | unauthenticated |
//!
//! Access is declared per handler through the auth extractors — see
//! [`auth`]. The middleware stack is `TraceLayer` → metrics → CORS →
//! handler.
//!
//! ## Architecture
//!
//! Route handlers stay thin: field validation lives in `coachlink-core`,
//! transition gates in `coachlink-state`, fan-out in `coachlink-events`,
//! and the engine composing them in [`transition`]. All errors map to
//! structured HTTP responses via [`error::AppError`].

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod transition;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use coachlink_core::RequestStatus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;

pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics`, and `/openapi.json` sit alongside the API
/// routes; access control is enforced per handler by the auth extractors,
/// so there is no separate authenticated sub-router.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    let cors = cors_layer(&state);

    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .merge(openapi::router())
        .merge(routes::auth::router())
        .merge(routes::requests::router())
        .merge(routes::drivers::router())
        .merge(routes::vehicles::router())
        .merge(routes::events::router())
        .merge(routes::analytics::router())
        .layer(cors)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer from the configured origins.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from the current `AppState` on each scrape (pull
/// model), then encodes the registry in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let counts = state.fleet.status_counts();
    metrics.requests_total().reset();
    for status in RequestStatus::ALL {
        metrics
            .requests_total()
            .with_label_values(&[status.as_str()])
            .set(counts.get(&status).copied().unwrap_or(0) as f64);
    }
    metrics
        .assignments_total()
        .set(state.fleet.assignment_count() as f64);
    metrics.drivers_total().set(state.drivers.len() as f64);
    metrics.vehicles_total().set(state.vehicles.len() as f64);
    metrics
        .sse_subscribers()
        .set(state.events.subscriber_count() as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible.
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.fleet.len();
    let _ = state.drivers.len();
    let _ = state.vehicles.len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
