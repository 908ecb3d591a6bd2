//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from coachlink-state and coachlink-core to HTTP
//! status codes and the `{success, message, errors}` JSON body every
//! error response shares. Internal error details are logged server-side
//! and never appear in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coachlink_state::TransitionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON body shared by every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false` on errors.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Per-field failures, present for validation errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldIssue>>,
}

/// A single field-level failure in an error body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// One or more submitted fields are invalid (400, per-field detail).
    #[error("invalid data")]
    Validation(Vec<FieldIssue>),

    /// The request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing, invalid, or expired token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — authenticated but wrong role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldIssue::new(field, message)])
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Unauthorized(_) => tracing::debug!(error = %self, "rejected credential"),
            _ => {}
        }

        let body = match self {
            Self::Validation(issues) => ErrorBody {
                success: false,
                message: "Invalid data".to_string(),
                errors: Some(issues),
            },
            // Never expose internal error messages to clients.
            Self::Internal(_) => ErrorBody {
                success: false,
                message: "Internal server error".to_string(),
                errors: None,
            },
            other => ErrorBody {
                success: false,
                message: other.to_string(),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert submission validation failures to per-field API errors.
impl From<coachlink_core::ValidationError> for AppError {
    fn from(err: coachlink_core::ValidationError) -> Self {
        Self::Validation(
            err.errors
                .into_iter()
                .map(|e| FieldIssue::new(e.field, e.message))
                .collect(),
        )
    }
}

/// Convert transition failures to API errors.
///
/// `NotFound` keeps its 404; every business-rule gate maps to a 400 with
/// the field it concerns; storage failures surface as opaque 500s.
impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotFound(_) => {
                Self::NotFound("Service request not found".to_string())
            }
            TransitionError::InvalidStatus(_) => {
                Self::invalid_field("status", err.to_string())
            }
            TransitionError::MissingScheduleFields { ref missing } => Self::Validation(
                missing
                    .iter()
                    .map(|field| {
                        FieldIssue::new(*field, format!("{field} is required when scheduling"))
                    })
                    .collect(),
            ),
            TransitionError::DriverNotFound(_) => {
                Self::invalid_field("driver_id", "Driver not found")
            }
            TransitionError::VehicleNotFound(_) => {
                Self::invalid_field("vehicle_id", "Vehicle not found")
            }
            TransitionError::CapacityExceeded { .. } => {
                Self::invalid_field("vehicle_id", err.to_string())
            }
            TransitionError::Storage(detail) => Self::Internal(detail),
        }
    }
}
