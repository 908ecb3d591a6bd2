//! # Roles
//!
//! The closed role enumeration for authenticated users. Role checks are
//! declared once per route group at the access gate, not re-implemented in
//! individual handlers.

use serde::{Deserialize, Serialize};

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full read/write access: review, transition, schedule, and delete
    /// requests, plus everything a viewer can do.
    Coordinator,
    /// Read-only access: list/inspect requests and reference data, and
    /// subscribe to the live event stream.
    Viewer,
}

impl Role {
    /// The wire/database representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coordinator => "coordinator",
            Role::Viewer => "viewer",
        }
    }

    /// Parse a wire/database string. Returns `None` for unknown roles.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "coordinator" => Some(Role::Coordinator),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// Whether this role may mutate requests (transition, edit, delete).
    pub fn can_mutate(&self) -> bool {
        matches!(self, Role::Coordinator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        assert_eq!(Role::parse("coordinator"), Some(Role::Coordinator));
        assert_eq!(Role::parse("viewer"), Some(Role::Viewer));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn only_coordinators_mutate() {
        assert!(Role::Coordinator.can_mutate());
        assert!(!Role::Viewer.can_mutate());
    }
}
