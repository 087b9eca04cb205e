//! UUIDv4 identifiers used by the remote application.
//!
//! Both conversations and messages are keyed by UUIDv4 strings in the
//! canonical hyphenated form. Values are validated on construction and kept
//! verbatim afterwards, so an id read back from the page compares equal to
//! the string that was sent.

use crate::error::{Result, SessionError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::{Uuid, Variant, Version};

const HYPHENATED_LEN: usize = 36;

/// Whether `value` is a hyphenated RFC 4122 version-4 UUID.
pub fn is_uuid_v4(value: &str) -> bool {
    if value.len() != HYPHENATED_LEN {
        return false;
    }
    Uuid::parse_str(value)
        .map(|id| id.get_version() == Some(Version::Random) && id.get_variant() == Variant::RFC4122)
        .unwrap_or(false)
}

macro_rules! uuid4_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap `value`.
            pub fn parse(value: &str) -> Result<Self> {
                if is_uuid_v4(value) {
                    Ok(Self(value.to_string()))
                } else {
                    Err(SessionError::InvalidIdentifier {
                        value: value.to_string(),
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = SessionError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid4_id!(
    /// Identifier of a remote conversation.
    ConversationId
);

uuid4_id!(
    /// Identifier of a single rendered message.
    MessageId
);
