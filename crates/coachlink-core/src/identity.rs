//! # Identifier Newtypes
//!
//! Integer-backed newtypes for the four persisted entity kinds. Identifiers
//! are allocated by the entity store (monotonically increasing, starting at
//! 1) and are distinct types — mixing them up is a compile error.
//!
//! All four are thin wrappers over `i64` with `Display`/`FromStr` so they
//! round-trip through URL path segments and database columns unchanged.

use serde::{Deserialize, Serialize};

/// Implements the shared surface of an integer-backed identifier newtype.
macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw integer identifier.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Access the underlying integer.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

define_id! {
    /// A unique identifier for a customer trip request.
    RequestId
}

define_id! {
    /// A unique identifier for a driver.
    DriverId
}

define_id! {
    /// A unique identifier for a vehicle.
    VehicleId
}

define_id! {
    /// A unique identifier for a driver/vehicle assignment.
    AssignmentId
}
