//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single spec, served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Bearer token from POST /api/auth/login. SSE clients may \
                             pass the same token as a `token` query parameter.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the Coachlink API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coachlink API",
        version = "0.3.1",
        description = "Transportation-request coordination service.\n\nCustomers submit trip requests; coordinators approve, reject, and schedule them against a driver and vehicle; viewers get read-only visibility; all parties follow status changes live over SSE at `/api/events/requests`.\n\nAuthentication: Bearer token via `Authorization: Bearer <token>`. Request submission (`POST /api/requests`) and login are public; everything else requires a token.",
        license(name = "BUSL-1.1"),
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Auth ─────────────────────────────────────────────────────────
        crate::routes::auth::login,
        crate::routes::auth::verify,
        // ── Trip requests ────────────────────────────────────────────────
        crate::routes::requests::create_request,
        crate::routes::requests::list_requests,
        crate::routes::requests::get_request,
        crate::routes::requests::update_request,
        crate::routes::requests::delete_request,
        // ── Reference data ───────────────────────────────────────────────
        crate::routes::drivers::list_drivers,
        crate::routes::drivers::get_driver,
        crate::routes::vehicles::list_vehicles,
        crate::routes::vehicles::get_vehicle,
        // ── Live events ──────────────────────────────────────────────────
        crate::routes::events::request_events,
        // ── Analytics ────────────────────────────────────────────────────
        crate::routes::analytics::daily,
        crate::routes::analytics::status,
        crate::routes::analytics::overview,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::FieldIssue,
        crate::state::RequestView,
        crate::state::AssignmentView,
        crate::state::DriverView,
        crate::state::VehicleView,
        crate::routes::auth::LoginRequest,
        crate::routes::auth::LoginResponse,
        crate::routes::auth::VerifyResponse,
        crate::routes::auth::UserSummary,
        crate::routes::requests::CreateRequestBody,
        crate::routes::requests::UpdateRequestBody,
        crate::routes::requests::RequestResponse,
        crate::routes::requests::RequestListResponse,
        crate::routes::requests::PaginationMeta,
        crate::routes::requests::MessageResponse,
        crate::routes::drivers::DriverListResponse,
        crate::routes::drivers::DriverResponse,
        crate::routes::vehicles::VehicleListResponse,
        crate::routes::vehicles::VehicleResponse,
        crate::routes::analytics::DailyResponse,
        crate::routes::analytics::DailyCount,
        crate::routes::analytics::DailySummary,
        crate::routes::analytics::StatusResponse,
        crate::routes::analytics::StatusCounts,
        crate::routes::analytics::OverviewResponse,
        crate::routes::analytics::OverviewData,
    )),
    tags(
        (name = "auth", description = "Login and token introspection"),
        (name = "requests", description = "Trip request intake and workflow"),
        (name = "drivers", description = "Driver reference data"),
        (name = "vehicles", description = "Vehicle reference data"),
        (name = "events", description = "Live SSE updates"),
        (name = "analytics", description = "Aggregate counts"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Serve the generated spec.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_spec))
}

async fn serve_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
