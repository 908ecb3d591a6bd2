//! # API Route Modules
//!
//! Route modules for the Coachlink API surface:
//!
//! - `auth` — login (credentials → JWT) and token introspection.
//! - `requests` — trip request intake (public), listing, inspection,
//!   transition/edit, and deletion (coordinator).
//! - `drivers` / `vehicles` — read-only reference data.
//! - `events` — the live SSE stream of request changes.
//! - `analytics` — daily volumes, status breakdowns, and fleet overview.
//!
//! Access requirements are declared by the extractor each handler takes
//! ([`crate::auth::AuthUser`] / [`crate::auth::CoordinatorUser`]); public
//! handlers take neither.

pub mod analytics;
pub mod auth;
pub mod drivers;
pub mod events;
pub mod requests;
pub mod vehicles;
