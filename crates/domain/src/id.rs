//! Typed identifier newtypes.
//!
//! Programs and steps come from an external authoring tool that mints its own
//! identifiers (UUIDs, timestamps, hand-written slugs), so identifiers are
//! opaque strings. Locally minted identifiers are UUID v4 strings.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Program`](crate::program::Program).
    ProgramId
);

define_id!(
    /// Identifier of a [`Step`](crate::program::Step), unique within its program.
    StepId
);

define_id!(
    /// Unique identifier for an [`ActionLogEntry`](crate::action_log::ActionLogEntry).
    ActionLogEntryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = ProgramId::generate();
        let b = ProgramId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn should_keep_foreign_identifier_text_verbatim() {
        let id = StepId::from("1718022334455-0-3");
        assert_eq!(id.as_str(), "1718022334455-0-3");
        assert_eq!(id.to_string(), "1718022334455-0-3");
    }

    #[test]
    fn should_serialize_as_plain_string() {
        let id = ProgramId::from("morning-watering");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"morning-watering\"");
        let parsed: ProgramId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_mint_uuid_text() {
        let id = ActionLogEntryId::generate();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }
}
