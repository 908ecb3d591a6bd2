//! # Authentication API
//!
//! ## Endpoints
//!
//! - `POST /api/auth/login`  — credentials → signed access token
//! - `GET  /api/auth/verify` — token introspection
//!
//! Every failure path returns the same 401 "Invalid credentials" so the
//! endpoint does not leak which usernames exist.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{mint_token, verify_password, AuthUser};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if self.username.trim().is_empty() {
            issues.push(crate::error::FieldIssue::new(
                "username",
                "Username is required",
            ));
        }
        if self.password.is_empty() {
            issues.push(crate::error::FieldIssue::new(
                "password",
                "Password is required",
            ));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(issues))
        }
    }
}

/// Identity summary returned by login and verify.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub username: String,
    pub role: String,
}

/// Successful login response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    /// Signed bearer token.
    pub token: String,
    /// Token lifetime in seconds.
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
    pub user: UserSummary,
}

/// Token introspection response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
    pub valid: bool,
    pub user: UserSummary,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(verify))
}

/// POST /api/auth/login — Authenticate and mint an access token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing fields", body = crate::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let body = extract_validated_json(body)?;
    let username = body.username.trim();

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = state.users.get(username).ok_or_else(invalid)?;
    if !user.is_active || !verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = mint_token(&state.config, &user.username, user.role)?;
    tracing::info!(username = %user.username, role = %user.role, "login succeeded");

    Ok(Json(LoginResponse {
        success: true,
        token,
        expires_in: state.config.token_expiry.as_secs(),
        user: UserSummary {
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
        },
    }))
}

/// GET /api/auth/verify — Check a presented token and echo its identity.
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token valid", body = VerifyResponse),
        (status = 401, description = "Missing/invalid/expired token", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn verify(user: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        success: true,
        valid: true,
        user: UserSummary {
            username: user.username,
            role: user.role.as_str().to_string(),
        },
    })
}
