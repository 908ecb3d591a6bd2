//! # Vehicle Reference API
//!
//! Read-only endpoints mirroring the drivers API.
//!
//! - `GET /api/vehicles`     — all vehicles, plate-ordered
//! - `GET /api/vehicles/:id` — one vehicle

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use coachlink_core::VehicleId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::{AppState, VehicleView};

/// Response wrapping the vehicle list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VehicleListResponse {
    pub success: bool,
    pub data: Vec<VehicleView>,
    pub count: usize,
}

/// Response wrapping a single vehicle.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VehicleResponse {
    pub success: bool,
    pub data: VehicleView,
}

/// Build the vehicles router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/vehicles/:id", get(get_vehicle))
}

/// GET /api/vehicles — List all vehicles, ordered by plate.
#[utoipa::path(
    get,
    path = "/api/vehicles",
    responses(
        (status = 200, description = "List of vehicles", body = VehicleListResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
async fn list_vehicles(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Json<VehicleListResponse> {
    let mut data: Vec<VehicleView> = state
        .vehicles
        .iter()
        .map(|entry| VehicleView {
            id: entry.id.as_i64(),
            plate: entry.plate.clone(),
            capacity: entry.capacity,
        })
        .collect();
    data.sort_by(|a, b| a.plate.cmp(&b.plate));
    let count = data.len();
    Json(VehicleListResponse {
        success: true,
        data,
        count,
    })
}

/// GET /api/vehicles/:id — Get a single vehicle.
#[utoipa::path(
    get,
    path = "/api/vehicles/{id}",
    params(("id" = i64, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Vehicle found", body = VehicleResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
async fn get_vehicle(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VehicleResponse>, AppError> {
    let vehicle = state
        .vehicles
        .get(&VehicleId::new(id))
        .map(|entry| VehicleView {
            id: entry.id.as_i64(),
            plate: entry.plate.clone(),
            capacity: entry.capacity,
        })
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;
    Ok(Json(VehicleResponse {
        success: true,
        data: vehicle,
    }))
}
