//! Identifiers for ledger records
//!
//! Sources, evidence cards, claims and resolution groups are addressed by short
//! stable strings (`S1`, `E4`, `C2`, `R1`) assigned in deterministic order, so
//! the claim graph can live in an arena keyed by id rather than as linked nodes.
//! A run as a whole is identified by a UUIDv7.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix used for sequentially generated ids
            pub const PREFIX: &'static str = $prefix;

            /// Wrap an existing id string
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Build the `n`th sequential id (1-based)
            pub fn nth(n: usize) -> Self {
                Self(format!("{}{}", $prefix, n))
            }

            /// Borrow the raw id string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a [`Source`](crate::Source), e.g. `S3`
    SourceId,
    "S"
);

string_id!(
    /// Identifier of an [`EvidenceCard`](crate::EvidenceCard), e.g. `E12`
    EvidenceId,
    "E"
);

string_id!(
    /// Identifier of a [`Claim`](crate::Claim), e.g. `C2`
    ClaimId,
    "C"
);

string_id!(
    /// Identifier of a [`ResolutionGroup`](crate::ResolutionGroup), e.g. `R1`
    ResolutionId,
    "R"
);

/// Unique identifier for a pipeline run, based on UUIDv7
///
/// UUIDv7 keeps run ids chronologically sortable, which makes artifact
/// directories and traces from successive runs easy to order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generate a new UUIDv7-based run id
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_domain::RunId;
    ///
    /// let id = RunId::new();
    /// assert!(id.timestamp() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create a run id from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(uuid::Uuid::from_u128(value))
    }

    /// Parse a run id from its hyphenated string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid UUIDv7 string: {}", e))
    }

    /// Timestamp component of the UUIDv7 (milliseconds since Unix epoch)
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0.as_u128() >> 80) as u64
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
