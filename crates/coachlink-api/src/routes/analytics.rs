//! # Analytics API
//!
//! Aggregate counts computed from the entity store.
//!
//! - `GET /api/analytics/daily`    — request volume per day, zero-filled
//! - `GET /api/analytics/status`   — counts per status
//! - `GET /api/analytics/overview` — totals and fleet utilization

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use coachlink_core::RequestStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::state::AppState;

const DEFAULT_DAYS: u32 = 7;
const MAX_DAYS: u32 = 90;

/// Query parameters for the daily series.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DailyParams {
    /// Number of trailing days to cover (default 7, max 90).
    pub days: Option<u32>,
}

/// One day of request volume.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DailyCount {
    /// Calendar date, `YYYY-MM-DD` (UTC).
    pub date: String,
    pub count: usize,
}

/// Summary line under the daily series.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub total_requests: usize,
    /// Mean per day over the covered window, two decimals.
    pub average_per_day: String,
    pub period: String,
}

/// Response for the daily series.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DailyResponse {
    pub success: bool,
    pub data: Vec<DailyCount>,
    pub summary: DailySummary,
}

/// Counts per status, zero-filled.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub scheduled: usize,
}

/// Response for the status breakdown.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    pub data: StatusCounts,
    pub total: usize,
}

/// Overview totals.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewData {
    pub total_requests: usize,
    pub total_drivers: usize,
    pub total_vehicles: usize,
    pub total_assignments: usize,
    pub pending_requests: usize,
    pub scheduled_requests: usize,
    /// Share of requests carrying an assignment, as a percent string.
    pub utilization_rate: String,
}

/// Response for the overview.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OverviewResponse {
    pub success: bool,
    pub data: OverviewData,
}

/// Build the analytics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/daily", get(daily))
        .route("/api/analytics/status", get(status))
        .route("/api/analytics/overview", get(overview))
}

/// GET /api/analytics/daily — Daily request counts, zero-filled so the
/// chart never has holes.
#[utoipa::path(
    get,
    path = "/api/analytics/daily",
    params(("days" = Option<u32>, Query, description = "Trailing days (default 7, max 90)")),
    responses(
        (status = 200, description = "Daily counts", body = DailyResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "analytics"
)]
async fn daily(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DailyParams>,
) -> Json<DailyResponse> {
    let days = params.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days as i64 - 1);

    let mut counts: std::collections::HashMap<chrono::NaiveDate, usize> =
        std::collections::HashMap::new();
    for request in state.fleet.all() {
        let date = request.created_at.date_naive();
        if date >= start {
            *counts.entry(date).or_insert(0) += 1;
        }
    }

    let data: Vec<DailyCount> = (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset as i64);
            DailyCount {
                date: date.format("%Y-%m-%d").to_string(),
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect();

    let total: usize = data.iter().map(|d| d.count).sum();
    Json(DailyResponse {
        success: true,
        data,
        summary: DailySummary {
            total_requests: total,
            average_per_day: format!("{:.2}", total as f64 / days as f64),
            period: format!("Last {days} days"),
        },
    })
}

/// GET /api/analytics/status — Requests per status.
#[utoipa::path(
    get,
    path = "/api/analytics/status",
    responses(
        (status = 200, description = "Status counts", body = StatusResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "analytics"
)]
async fn status(_user: AuthUser, State(state): State<AppState>) -> Json<StatusResponse> {
    let counts = state.fleet.status_counts();
    let get = |status: RequestStatus| counts.get(&status).copied().unwrap_or(0);
    let data = StatusCounts {
        pending: get(RequestStatus::Pending),
        approved: get(RequestStatus::Approved),
        rejected: get(RequestStatus::Rejected),
        scheduled: get(RequestStatus::Scheduled),
    };
    let total = data.pending + data.approved + data.rejected + data.scheduled;
    Json(StatusResponse {
        success: true,
        data,
        total,
    })
}

/// GET /api/analytics/overview — Fleet-wide totals.
#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    responses(
        (status = 200, description = "Overview totals", body = OverviewResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "analytics"
)]
async fn overview(_user: AuthUser, State(state): State<AppState>) -> Json<OverviewResponse> {
    let counts = state.fleet.status_counts();
    let total_requests = state.fleet.len();
    let total_assignments = state.fleet.assignment_count();
    let utilization_rate = if total_requests > 0 {
        format!(
            "{:.2}%",
            total_assignments as f64 / total_requests as f64 * 100.0
        )
    } else {
        "0%".to_string()
    };

    Json(OverviewResponse {
        success: true,
        data: OverviewData {
            total_requests,
            total_drivers: state.drivers.len(),
            total_vehicles: state.vehicles.len(),
            total_assignments,
            pending_requests: counts.get(&RequestStatus::Pending).copied().unwrap_or(0),
            scheduled_requests: counts.get(&RequestStatus::Scheduled).copied().unwrap_or(0),
            utilization_rate,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mint_token;
    use crate::config::AppConfig;
    use crate::state::NewRequest;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use coachlink_core::Role;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn seeded_state(requests: usize) -> AppState {
        let state = AppState::new(AppConfig::for_tests("analytics-test-secret"));
        for i in 0..requests {
            state.fleet.create(NewRequest {
                customer_name: format!("Customer {i}"),
                phone: "555-0000".to_string(),
                pickup_location: None,
                dropoff_location: None,
                pickup_time: Utc::now() + Duration::days(1),
                passengers: None,
                notes: None,
            });
        }
        state
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        app: Router,
        state: &AppState,
        uri: &str,
    ) -> T {
        let token = mint_token(&state.config, "viewer", Role::Viewer).unwrap();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn daily_zero_fills_the_window() {
        let state = seeded_state(2);
        let app = router().with_state(state.clone());
        let body: DailyResponse = get_json(app, &state, "/api/analytics/daily").await;

        assert_eq!(body.data.len(), 7);
        // All requests were created just now — today's bucket holds both.
        assert_eq!(body.data.last().unwrap().count, 2);
        assert!(body.data[..6].iter().all(|d| d.count == 0));
        assert_eq!(body.summary.total_requests, 2);
        assert_eq!(body.summary.period, "Last 7 days");
    }

    #[tokio::test]
    async fn status_counts_start_pending() {
        let state = seeded_state(3);
        let app = router().with_state(state.clone());
        let body: StatusResponse = get_json(app, &state, "/api/analytics/status").await;

        assert_eq!(body.data.pending, 3);
        assert_eq!(body.data.scheduled, 0);
        assert_eq!(body.total, 3);
    }

    #[tokio::test]
    async fn overview_reports_zero_utilization_without_assignments() {
        let state = seeded_state(4);
        let app = router().with_state(state.clone());
        let body: OverviewResponse = get_json(app, &state, "/api/analytics/overview").await;

        assert_eq!(body.data.total_requests, 4);
        assert_eq!(body.data.total_assignments, 0);
        assert_eq!(body.data.utilization_rate, "0.00%");
    }
}
