//! # Trip Request Validation
//!
//! Per-field validation of customer trip submissions. Failures are
//! collected — a submission with three bad fields reports all three —
//! and each failure names the offending field so the boundary layer can
//! render per-field messages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Maximum length of the customer name.
pub const MAX_NAME_LEN: usize = 100;
/// Maximum length of a pickup/dropoff location.
pub const MAX_LOCATION_LEN: usize = 255;
/// Maximum length of the free-text notes.
pub const MAX_NOTES_LEN: usize = 1000;
/// Inclusive passenger count bounds.
pub const PASSENGER_RANGE: std::ops::RangeInclusive<i32> = 1..=100;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The submitted field the failure refers to (e.g. `"phone"`).
    pub field: &'static str,
    /// Human-readable description of what is wrong.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// One or more field-level failures for a submission.
#[derive(Debug, Clone, Error)]
#[error("invalid submission: {}", self.summary())]
pub struct ValidationError {
    /// Every failing field, in declaration order.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.field)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Raw fields of a trip request submission, before acceptance.
///
/// Optional fields that arrive as empty strings are treated as absent by
/// the boundary layer before validation runs.
#[derive(Debug, Clone)]
pub struct RequestDraft {
    pub customer_name: String,
    pub phone: String,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub passengers: Option<i32>,
    pub notes: Option<String>,
}

impl RequestDraft {
    /// Validate every field, collecting all failures.
    ///
    /// `now` is injected so the future-pickup rule is testable without
    /// racing the wall clock.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        let name = self.customer_name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("customer_name", "Customer name is required"));
        } else if name.chars().count() < 2 || name.chars().count() > MAX_NAME_LEN {
            errors.push(FieldError::new(
                "customer_name",
                format!("Customer name must be between 2 and {MAX_NAME_LEN} characters"),
            ));
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            errors.push(FieldError::new("phone", "Phone number is required"));
        } else if !phone.chars().all(is_phone_char) {
            errors.push(FieldError::new(
                "phone",
                "Phone number must contain only digits and valid separators",
            ));
        }

        for (field, location) in [
            ("pickup_location", &self.pickup_location),
            ("dropoff_location", &self.dropoff_location),
        ] {
            if let Some(loc) = location {
                if loc.chars().count() > MAX_LOCATION_LEN {
                    errors.push(FieldError::new(
                        field,
                        format!("Location must not exceed {MAX_LOCATION_LEN} characters"),
                    ));
                }
            }
        }

        if self.pickup_time <= now {
            errors.push(FieldError::new("pickup_time", "Pickup time must be in the future"));
        }

        if let Some(passengers) = self.passengers {
            if !PASSENGER_RANGE.contains(&passengers) {
                errors.push(FieldError::new(
                    "passengers",
                    "Passengers must be a number between 1 and 100",
                ));
            }
        }

        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                errors.push(FieldError::new(
                    "notes",
                    format!("Notes must not exceed {MAX_NOTES_LEN} characters"),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }
}

/// Accepted phone characters: digits plus the common separators customers
/// actually type (space, dash, plus, parentheses).
fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')')
}
