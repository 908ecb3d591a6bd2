//! # Transition Gates
//!
//! Validation gates for status transitions. The gates run in a fixed
//! order and all must pass before any mutation is committed:
//!
//! 1. The request exists ([`TransitionError::NotFound`] otherwise — raised
//!    by the engine, which owns the store lookup).
//! 2. The target status is one of the four enumeration values
//!    ([`TransitionError::InvalidStatus`] — raised at the boundary when
//!    the body fails to parse).
//! 3. For `scheduled` targets: the schedule triple is complete
//!    ([`complete_schedule`]), the driver and vehicle exist (engine-owned
//!    lookups), and the vehicle has capacity for the request's passenger
//!    count ([`check_capacity`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use coachlink_core::{DriverId, RequestId, VehicleId};

/// A complete, validated schedule for a request: who drives, in what, when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDetails {
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub scheduled_time: DateTime<Utc>,
}

/// The raw, possibly-incomplete schedule fields as they arrive in an
/// update body. All three are required when (and only when) the target
/// status is `scheduled`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ScheduleFields {
    pub driver_id: Option<DriverId>,
    pub vehicle_id: Option<VehicleId>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// A status transition failure. Every variant maps to a distinct,
/// client-visible failure; nothing here carries internal detail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The request being transitioned does not exist.
    #[error("service request {0} not found")]
    NotFound(RequestId),

    /// The target status is outside the four-value vocabulary.
    #[error("status must be one of: pending, approved, rejected, scheduled (got '{0}')")]
    InvalidStatus(String),

    /// A transition to `scheduled` is missing part of the schedule triple.
    #[error("scheduling requires {}", .missing.join(", "))]
    MissingScheduleFields {
        /// Names of the absent fields, in declaration order.
        missing: Vec<&'static str>,
    },

    /// The referenced driver does not exist.
    #[error("driver {0} not found")]
    DriverNotFound(DriverId),

    /// The referenced vehicle does not exist.
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),

    /// The vehicle cannot seat the request's passengers.
    #[error("vehicle capacity ({capacity}) is less than required passengers ({passengers})")]
    CapacityExceeded { capacity: i32, passengers: i32 },

    /// The persistence layer failed mid-mutation. Opaque to clients.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Gate 3a: require the complete schedule triple.
///
/// Reports every missing field at once so the client can fix the form in
/// one round trip.
pub fn complete_schedule(fields: &ScheduleFields) -> Result<ScheduleDetails, TransitionError> {
    match (fields.driver_id, fields.vehicle_id, fields.scheduled_time) {
        (Some(driver_id), Some(vehicle_id), Some(scheduled_time)) => Ok(ScheduleDetails {
            driver_id,
            vehicle_id,
            scheduled_time,
        }),
        _ => {
            let mut missing = Vec::new();
            if fields.driver_id.is_none() {
                missing.push("driver_id");
            }
            if fields.vehicle_id.is_none() {
                missing.push("vehicle_id");
            }
            if fields.scheduled_time.is_none() {
                missing.push("scheduled_time");
            }
            Err(TransitionError::MissingScheduleFields { missing })
        }
    }
}

/// Gate 3d: the vehicle must seat the request's passengers.
///
/// A request without a passenger count passes unconditionally; a count
/// exactly equal to the capacity is allowed.
pub fn check_capacity(passengers: Option<i32>, capacity: i32) -> Result<(), TransitionError> {
    match passengers {
        Some(p) if p > capacity => Err(TransitionError::CapacityExceeded {
            capacity,
            passengers: p,
        }),
        _ => Ok(()),
    }
}
