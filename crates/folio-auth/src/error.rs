use folio_store::StoreError;
use folio_types::ErrorCode;
use thiserror::Error;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password did not verify.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The session token is unknown, expired, or revoked.
    #[error("authentication required")]
    Unauthenticated,

    /// The proposed password or username does not meet the policy.
    #[error("credential rejected: {0}")]
    Rejected(String),

    /// The administrator password is supplied by the operator override and
    /// cannot be changed at runtime.
    #[error("the administrator password is managed by the operator override")]
    OverrideActive,

    /// Hashing failed (invalid parameters or malformed salt).
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// The stable category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::Rejected(_) | Self::OverrideActive => ErrorCode::ValidationError,
            Self::Hash(_) => ErrorCode::IoError,
            Self::Store(e) => e.code(),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
