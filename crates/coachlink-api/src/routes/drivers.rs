//! # Driver Reference API
//!
//! Read-only endpoints; fleet changes happen through seeding and operator
//! tooling, not this API.
//!
//! - `GET /api/drivers`     — all drivers, name-ordered
//! - `GET /api/drivers/:id` — one driver

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use coachlink_core::DriverId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::{AppState, DriverView};

/// Response wrapping the driver list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverListResponse {
    pub success: bool,
    pub data: Vec<DriverView>,
    pub count: usize,
}

/// Response wrapping a single driver.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverResponse {
    pub success: bool,
    pub data: DriverView,
}

/// Build the drivers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/drivers", get(list_drivers))
        .route("/api/drivers/:id", get(get_driver))
}

/// GET /api/drivers — List all drivers, ordered by name.
#[utoipa::path(
    get,
    path = "/api/drivers",
    responses(
        (status = 200, description = "List of drivers", body = DriverListResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn list_drivers(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Json<DriverListResponse> {
    let mut data: Vec<DriverView> = state
        .drivers
        .iter()
        .map(|entry| DriverView {
            id: entry.id.as_i64(),
            name: entry.name.clone(),
            phone: entry.phone.clone(),
        })
        .collect();
    data.sort_by(|a, b| a.name.cmp(&b.name));
    let count = data.len();
    Json(DriverListResponse {
        success: true,
        data,
        count,
    })
}

/// GET /api/drivers/:id — Get a single driver.
#[utoipa::path(
    get,
    path = "/api/drivers/{id}",
    params(("id" = i64, Path, description = "Driver id")),
    responses(
        (status = 200, description = "Driver found", body = DriverResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn get_driver(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DriverResponse>, AppError> {
    let driver = state
        .drivers
        .get(&DriverId::new(id))
        .map(|entry| DriverView {
            id: entry.id.as_i64(),
            name: entry.name.clone(),
            phone: entry.phone.clone(),
        })
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;
    Ok(Json(DriverResponse {
        success: true,
        data: driver,
    }))
}
