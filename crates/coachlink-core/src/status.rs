//! # Request Status
//!
//! The closed lifecycle vocabulary for trip requests. Earlier iterations of
//! the product surfaced a "completed" label in a few dashboard mockups, but
//! it was never accepted by any validation path; the enumeration below is
//! the single vocabulary, enforced end to end.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a trip request.
///
/// New requests always start as [`Pending`](RequestStatus::Pending).
/// Transitions between statuses are applied by the transition engine;
/// apart from the scheduling gates there is no restriction on the
/// transition graph (a scheduled request can be re-approved, a rejected
/// one re-opened).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Submitted by a customer, awaiting coordinator review.
    Pending,
    /// Accepted by a coordinator, not yet scheduled.
    Approved,
    /// Declined by a coordinator.
    Rejected,
    /// Assigned a driver, vehicle, and scheduled time.
    Scheduled,
}

impl RequestStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Scheduled,
    ];

    /// The wire/database representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Scheduled => "scheduled",
        }
    }

    /// Parse a wire/database string. Returns `None` for anything outside
    /// the four-value vocabulary.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "scheduled" => Some(RequestStatus::Scheduled),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
