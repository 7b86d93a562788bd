//! Strongly typed identifiers
//!
//! All identifiers are thin wrappers around `Uuid` to prevent accidental
//! mixing of different ID spaces (a `VoucherId` can never be passed where
//! a `SigningRequestId` is expected, even though both are UUIDs underneath).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

// The identityId assigned to an Agent by the external identity provider.
define_id_type!(AgentId, "Unique identifier for an Agent (the identity provider's identityId)");
define_id_type!(SigningRequestId, "Unique identifier for a SigningRequest");
define_id_type!(DiaryId, "Unique identifier for a Diary");
define_id_type!(DiaryEntryId, "Unique identifier for a DiaryEntry");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = AgentId::new();
        let uuid: Uuid = id.into();
        assert_eq!(AgentId::from_uuid(uuid), id);
    }

    #[test]
    fn test_id_parse() {
        let id = SigningRequestId::new();
        let parsed: SigningRequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
