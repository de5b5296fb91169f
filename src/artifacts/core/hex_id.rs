//! Content and revision identifiers (SHA-1 hashes)
//!
//! Both identifiers are 40-character lowercase hexadecimal strings. They are
//! opaque to this crate: content ids name file contents held by some object
//! store, revision ids name nodes of the history graph.
//!
//! ## Format
//!
//! - Full: 40 hex characters (e.g., "abc123...def")
//! - Short: First 7 characters (e.g., "abc1234")

use crate::artifacts::core::HEX_ID_LENGTH;
use sha1::{Digest, Sha1};

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier
            ///
            /// Accepts exactly 40 lowercase hexadecimal characters.
            pub fn try_parse(id: impl Into<String>) -> anyhow::Result<Self> {
                let id = id.into();
                if id.len() != HEX_ID_LENGTH {
                    anyhow::bail!("invalid {} length: {}", $what, id.len());
                }
                if !id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
                    anyhow::bail!("invalid {} characters: {}", $what, id);
                }
                Ok(Self(id))
            }

            /// Identifier of the given bytes
            pub fn for_data(data: &[u8]) -> Self {
                let mut hasher = Sha1::new();
                hasher.update(data);
                Self(format!("{:x}", hasher.finalize()))
            }

            /// Abbreviated form (first 7 characters)
            pub fn to_short_id(&self) -> String {
                self.0.split_at(7).0.to_string()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_parse(s)
            }
        }
    };
}

hex_id!(
    /// Identifier of a file's content
    ContentId,
    "content id"
);

hex_id!(
    /// Identifier of a revision
    RevisionId,
    "revision id"
);
