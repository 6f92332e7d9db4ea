//! Identifier newtypes
//!
//! Every identifier is a thin `String` wrapper so records stay readable in
//! logs and storage while remaining distinct at the type level.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier of an agent in the population registry
    AgentId
);

string_id!(
    /// Unique identifier of an election cycle
    ElectionId
);

string_id!(
    /// Grouping key for apportionment and cell formation
    Specialization
);

string_id!(
    /// Identifier of an agent-generated post
    PostId
);

string_id!(
    /// Identifier of a persisted cell summary
    SummaryId
);

string_id!(
    /// Identifier of a persisted conflict report or verification record
    CrossCheckId
);

impl ElectionId {
    /// Generate a fresh election id
    pub fn generate() -> Self {
        Self(format!("election-{}", Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix() {
        assert!(ElectionId::generate().as_str().starts_with("election-"));
        assert_ne!(ElectionId::generate(), ElectionId::generate());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&AgentId::new("agent-7")).unwrap();
        assert_eq!(json, "\"agent-7\"");
    }
}
