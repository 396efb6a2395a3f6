use std::io;

use folio_auth::AuthError;
use folio_store::StoreError;
use folio_types::ErrorCode;
use thiserror::Error;

/// Errors from domain service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The request failed validation; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// I/O on the upload directory failed.
    #[error("upload {op} failed for {file}: {source}")]
    Upload {
        file: String,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn album_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "album",
            id: id.to_string(),
        }
    }

    pub fn photo_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "photo",
            id: id.to_string(),
        }
    }

    pub fn upload(file: impl Into<String>, op: &'static str, source: io::Error) -> Self {
        Self::Upload {
            file: file.into(),
            op,
            source,
        }
    }

    /// The stable category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Upload { .. } => ErrorCode::IoError,
            Self::Store(e) => e.code(),
            Self::Auth(e) => e.code(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
