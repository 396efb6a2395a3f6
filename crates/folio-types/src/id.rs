//! Sequential identifiers for albums and photos.
//!
//! Identifiers are a one-character prefix followed by a positive decimal
//! sequence number of at most 18 digits (`A1`, `A2`, `p17`). The owning
//! document allocates new identifiers past a high-water mark that never
//! moves backwards, so a deleted identifier is never handed out again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Highest sequence number an identifier can carry.
pub const MAX_SEQ: u64 = 999_999_999_999_999_999;
const MAX_DIGITS: usize = 18;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: char = $prefix;

            /// Build the identifier with the given sequence number, clamped
            /// to `1..=MAX_SEQ`.
            pub fn from_seq(seq: u64) -> Self {
                Self(format!("{}{}", $prefix, seq.clamp(1, MAX_SEQ)))
            }

            /// The numeric part of the identifier.
            pub fn seq(&self) -> u64 {
                // Validated on construction.
                self.0[1..].parse().unwrap_or(0)
            }

            /// The identifier following sequence number `seq`.
            pub fn after_seq(seq: u64) -> Result<Self, TypeError> {
                match seq.checked_add(1) {
                    Some(next) if next <= MAX_SEQ => Ok(Self::from_seq(next)),
                    _ => Err(TypeError::IdsExhausted { kind: $kind }),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let invalid = || TypeError::InvalidId {
                    kind: $kind,
                    prefix: $prefix,
                    value: s.to_string(),
                };
                let digits = s.strip_prefix($prefix).ok_or_else(invalid)?;
                if digits.is_empty()
                    || digits.len() > MAX_DIGITS
                    || digits.starts_with('0')
                    || !digits.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(invalid());
                }
                Ok(Self(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

sequential_id!(
    /// Identifier of an album (`A<n>`).
    AlbumId,
    "album",
    'A'
);

sequential_id!(
    /// Identifier of a photo (`p<n>`), unique across all albums.
    PhotoId,
    "photo",
    'p'
);
