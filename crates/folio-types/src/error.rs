use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid {kind} id {value:?}: expected {prefix} followed by a positive number")]
    InvalidId {
        kind: &'static str,
        prefix: char,
        value: String,
    },

    #[error("no {kind} ids left to allocate")]
    IdsExhausted { kind: &'static str },

    #[error("photo order is inconsistent at position {position}")]
    InconsistentOrder { position: usize },

    #[error("cover photo {0} is not part of the album")]
    DanglingCover(String),
}

/// Stable error categories.
///
/// Every error type in the workspace maps onto one of these codes. The
/// string forms are part of the external contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A document or entity is absent.
    NotFound,
    /// A domain invariant would be violated.
    ValidationError,
    /// Missing, expired or revoked session.
    Unauthenticated,
    /// Username or password did not verify.
    InvalidCredentials,
    /// Concurrent mutation or duplicate identifier.
    Conflict,
    /// Durable storage failure.
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::ValidationError => "validation_error",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Conflict => "conflict",
            Self::IoError => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
