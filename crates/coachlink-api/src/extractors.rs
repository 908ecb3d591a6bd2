//! # Request Extraction Helpers
//!
//! Body extraction that folds JSON deserialization failures and
//! structural validation into [`AppError`] so handlers stay linear.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Structural validation a request body performs on itself after
/// deserialization. Field-level business rules live in `coachlink-core`;
/// this trait covers shape-level checks the type system cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// Unwrap an optional-rejection JSON body and run its validation.
///
/// Handlers take `Result<Json<T>, JsonRejection>` so a malformed body
/// becomes a structured 400 instead of Axum's default plaintext reply.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate()?;
    Ok(value)
}
