use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a fresh random (UUID v4) instance.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Return the inner string as a str slice.
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
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(EntityId, "Stable identifier for a compliance entity.");
newtype_string!(LicenseId, "Identifier for a license record.");
newtype_string!(CredentialId, "Identifier for a vault credential record.");
newtype_string!(WorkflowId, "Identifier for a workflow instance.");
newtype_string!(ActionId, "Identifier for a compliance action.");
newtype_string!(EventId, "Identifier for an audit event.");
newtype_string!(ApprovalId, "Identifier for a governance approval request.");
newtype_string!(AlertId, "Identifier for a status alert.");
newtype_string!(AgentId, "Identifier for a registered agent.");
newtype_string!(TraceId, "Correlation id threaded through one logical operation.");

impl TraceId {
    /// Generate a new random trace id if the caller did not supply one.
    #[must_use]
    pub fn generate_or(existing: Option<TraceId>) -> Self {
        existing.unwrap_or_else(Self::generate)
    }
}
