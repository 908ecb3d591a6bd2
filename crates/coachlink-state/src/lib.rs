//! # coachlink-state — Request Lifecycle State Machine
//!
//! The rules that govern a trip request's status changes, separated from
//! storage and transport so they can be tested exhaustively:
//!
//! - Which target statuses exist (the four-value vocabulary from
//!   `coachlink-core`).
//! - What a transition to `scheduled` requires: a complete schedule
//!   (driver, vehicle, time), referenced records that exist, and a vehicle
//!   with enough seats.
//! - The typed failure vocabulary the engine and the HTTP boundary share.
//!
//! Transitions between `pending`, `approved`, and `rejected` are
//! deliberately unrestricted once the request exists: coordinators may
//! re-approve, re-reject, or re-open at will. Only scheduling carries
//! gates.
//!
//! The engine that applies transitions against the entity store lives in
//! the API crate; this crate never touches a lock or a socket.

pub mod transition;

pub use transition::{check_capacity, complete_schedule, ScheduleDetails, ScheduleFields, TransitionError};
