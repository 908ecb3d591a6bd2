//! # Trip Request API
//!
//! Intake, review, and transition endpoints for trip requests.
//!
//! ## Endpoints
//!
//! - `POST   /api/requests`     — Submit a request (public, lands as pending)
//! - `GET    /api/requests`     — Paginated list with search/status filters
//! - `GET    /api/requests/:id` — Single request with its assignment
//! - `PUT    /api/requests/:id` — Transition and/or edit (coordinator)
//! - `DELETE /api/requests/:id` — Delete, cascading the assignment (coordinator)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use coachlink_core::validation::RequestDraft;
use coachlink_core::{DriverId, RequestId, RequestStatus, VehicleId};
use coachlink_events::{RequestEvent, UpdateAction};
use coachlink_state::{ScheduleFields, TransitionError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthUser, CoordinatorUser};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, ListFilter, NewRequest, RequestEdits, RequestView};
use crate::transition::{self, TransitionCommand};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Body of a request submission.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateRequestBody {
    pub customer_name: String,
    pub phone: String,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub dropoff_location: Option<String>,
    /// ISO 8601 timestamp, strictly in the future.
    pub pickup_time: String,
    #[serde(default)]
    pub passengers: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for CreateRequestBody {
    fn validate(&self) -> Result<(), AppError> {
        // Field-level rules live in coachlink-core and run after the
        // timestamp parses; nothing shape-level to check here.
        Ok(())
    }
}

/// Body of a request update: a transition, field edits, or both.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateRequestBody {
    /// Target status (one of pending/approved/rejected/scheduled).
    #[serde(default)]
    pub status: Option<String>,
    /// Required when status is `scheduled`.
    #[serde(default)]
    pub driver_id: Option<i64>,
    /// Required when status is `scheduled`.
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    /// Required when status is `scheduled`. ISO 8601 timestamp.
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub dropoff_location: Option<String>,
}

impl Validate for UpdateRequestBody {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Query parameters for the request listing.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListRequestsParams {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size, 1..=100 (default 10).
    pub limit: Option<u32>,
    /// Case-insensitive substring match on customer name or phone.
    pub search: Option<String>,
    /// Exact status filter.
    pub status: Option<String>,
}

/// Response wrapping a single request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: RequestView,
}

/// Pagination metadata for list responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Response wrapping a page of requests.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestListResponse {
    pub success: bool,
    pub data: Vec<RequestView>,
    pub pagination: PaginationMeta,
}

/// Response carrying only an outcome message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the trip request router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/requests",
            get(list_requests).post(create_request),
        )
        .route(
            "/api/requests/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/requests — Submit a new trip request. Public; always lands
/// as `pending`.
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request created", body = RequestResponse),
        (status = 400, description = "Invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn create_request(
    State(state): State<AppState>,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestResponse>), AppError> {
    let body = extract_validated_json(body)?;
    let pickup_time = parse_instant(
        &body.pickup_time,
        "pickup_time",
        "Pickup time must be a valid date",
    )?;

    let draft = RequestDraft {
        customer_name: body.customer_name.trim().to_string(),
        phone: body.phone.trim().to_string(),
        pickup_location: normalize(body.pickup_location),
        dropoff_location: normalize(body.dropoff_location),
        pickup_time,
        passengers: body.passengers,
        notes: normalize(body.notes),
    };
    draft.validate(Utc::now())?;

    let record = state.fleet.create(NewRequest {
        customer_name: draft.customer_name,
        phone: draft.phone,
        pickup_location: draft.pickup_location,
        dropoff_location: draft.dropoff_location,
        pickup_time: draft.pickup_time,
        passengers: draft.passengers,
        notes: draft.notes,
    });

    // Persist to database (write-through). Failure is surfaced to the client
    // because the in-memory record would be lost on restart.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::requests::insert(pool, &record).await {
            tracing::error!(request_id = %record.id, error = %e, "failed to persist request");
            return Err(AppError::Internal(
                "request recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    let view = state.view(&record, None);
    if let Ok(request_json) = serde_json::to_value(&view) {
        state.events.publish(RequestEvent::RequestUpdate {
            action: UpdateAction::Created,
            request: request_json,
        });
    }
    tracing::info!(request_id = %record.id, "trip request submitted");

    Ok((
        StatusCode::CREATED,
        Json(RequestResponse {
            success: true,
            message: Some("Service request created successfully".to_string()),
            data: view,
        }),
    ))
}

/// GET /api/requests — Paginated listing with filters.
#[utoipa::path(
    get,
    path = "/api/requests",
    params(
        ("page" = Option<u32>, Query, description = "1-based page (default 1)"),
        ("limit" = Option<u32>, Query, description = "Page size 1..=100 (default 10)"),
        ("search" = Option<String>, Query, description = "Substring match on name or phone"),
        ("status" = Option<String>, Query, description = "Exact status filter"),
    ),
    responses(
        (status = 200, description = "Page of requests", body = RequestListResponse),
        (status = 400, description = "Invalid parameters", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn list_requests(
    _user: AuthUser,
    State(state): State<AppState>,
    params: Result<Query<ListRequestsParams>, QueryRejection>,
) -> Result<Json<RequestListResponse>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let page = match params.page {
        None => 1,
        Some(0) => {
            return Err(AppError::invalid_field(
                "page",
                "Page must be a positive integer",
            ))
        }
        Some(p) => p as usize,
    };
    let limit = match params.limit {
        None => 10,
        Some(l) if (1..=100).contains(&l) => l as usize,
        Some(_) => {
            return Err(AppError::invalid_field(
                "limit",
                "Limit must be between 1 and 100",
            ))
        }
    };
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            RequestStatus::parse(s).ok_or_else(|| {
                AppError::invalid_field(
                    "status",
                    "Status must be one of: pending, approved, rejected, scheduled",
                )
            })
        })
        .transpose()?;

    let filter = ListFilter {
        search: params.search.filter(|s| !s.trim().is_empty()),
        status,
        page,
        limit,
    };
    let (items, total) = state.fleet.list(&filter);
    let data = items
        .iter()
        .map(|(request, assignment)| state.view(request, assignment.as_ref()))
        .collect();

    let total_pages = total.div_ceil(limit);
    Ok(Json(RequestListResponse {
        success: true,
        data,
        pagination: PaginationMeta {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        },
    }))
}

/// GET /api/requests/:id — Single request with its assignment.
#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request found", body = RequestResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn get_request(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RequestResponse>, AppError> {
    let (request, assignment) = state
        .fleet
        .get(RequestId::new(id))
        .ok_or_else(|| AppError::NotFound("Service request not found".to_string()))?;
    Ok(Json(RequestResponse {
        success: true,
        message: None,
        data: state.view(&request, assignment.as_ref()),
    }))
}

/// PUT /api/requests/:id — Apply a transition and/or edit fields.
#[utoipa::path(
    put,
    path = "/api/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    request_body = UpdateRequestBody,
    responses(
        (status = 200, description = "Request updated", body = RequestResponse),
        (status = 400, description = "Gate failure", body = crate::error::ErrorBody),
        (status = 403, description = "Viewer token", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn update_request(
    _user: CoordinatorUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<UpdateRequestBody>, JsonRejection>,
) -> Result<Json<RequestResponse>, AppError> {
    let body = extract_validated_json(body)?;

    let target = body
        .status
        .as_deref()
        .map(|raw| {
            RequestStatus::parse(raw)
                .ok_or_else(|| TransitionError::InvalidStatus(raw.to_string()))
        })
        .transpose()?;

    let scheduled_time = body
        .scheduled_time
        .as_deref()
        .map(|raw| parse_instant(raw, "scheduled_time", "Scheduled time must be a valid date"))
        .transpose()?;

    let cmd = TransitionCommand {
        target,
        schedule_fields: ScheduleFields {
            driver_id: body.driver_id.map(DriverId::new),
            vehicle_id: body.vehicle_id.map(VehicleId::new),
            scheduled_time,
        },
        edits: RequestEdits {
            notes: normalize(body.notes),
            pickup_location: normalize(body.pickup_location),
            dropoff_location: normalize(body.dropoff_location),
        },
    };

    let view = transition::apply(&state, RequestId::new(id), cmd).await?;
    Ok(Json(RequestResponse {
        success: true,
        message: Some("Service request updated successfully".to_string()),
        data: view,
    }))
}

/// DELETE /api/requests/:id — Delete a request; its assignment cascades.
#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request deleted", body = MessageResponse),
        (status = 403, description = "Viewer token", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn delete_request(
    _user: CoordinatorUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let request_id = RequestId::new(id);
    let (request, assignment) = state
        .fleet
        .remove(request_id)
        .ok_or_else(|| AppError::NotFound("Service request not found".to_string()))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::requests::delete(pool, request_id).await {
            tracing::error!(request_id = %request_id, error = %e, "failed to delete request from database");
            return Err(AppError::Internal(
                "request removed in-memory but database delete failed".to_string(),
            ));
        }
    }

    let view = state.view(&request, assignment.as_ref());
    if let Ok(request_json) = serde_json::to_value(&view) {
        state.events.publish(RequestEvent::RequestUpdate {
            action: UpdateAction::Deleted,
            request: request_json,
        });
    }
    tracing::info!(request_id = %request_id, "trip request deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Service request deleted successfully".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 timestamp into UTC, or fail as a field error.
fn parse_instant(
    raw: &str,
    field: &'static str,
    message: &'static str,
) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::invalid_field(field, message))
}

/// Treat absent and blank optional strings alike.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
