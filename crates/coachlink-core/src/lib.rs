//! # coachlink-core — Foundational Types
//!
//! Shared domain primitives for the Coachlink coordination service:
//!
//! - **Identifiers** ([`identity`]): integer-backed newtypes for requests,
//!   drivers, vehicles, and assignments. A [`DriverId`] cannot be passed
//!   where a [`VehicleId`] is expected.
//! - **Status** ([`status`]): the closed four-value request status
//!   enumeration. There is no fifth status anywhere — values outside the
//!   enumeration are rejected at deserialization time.
//! - **Roles** ([`role`]): the closed coordinator/viewer role enumeration
//!   used by the access gate.
//! - **Validation** ([`validation`]): per-field validation of trip request
//!   submissions with structured `{field, message}` errors.
//!
//! ## Crate Policy
//!
//! No I/O, no async, no framework types. Everything here is plain data
//! consumed by the state, events, and API crates.

pub mod identity;
pub mod role;
pub mod status;
pub mod validation;

pub use identity::{AssignmentId, DriverId, RequestId, VehicleId};
pub use role::Role;
pub use status::RequestStatus;
pub use validation::{FieldError, ValidationError};
