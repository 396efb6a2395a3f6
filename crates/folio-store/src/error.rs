use std::io;

use folio_types::ErrorCode;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document name is not acceptable as a file stem.
    #[error("invalid document name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The document bytes could not be encoded or decoded as JSON.
    #[error("serialization error in {document}: {reason}")]
    Serialization { document: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error during {op} of {document}: {source}")]
    Io {
        document: String,
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn io(document: impl Into<String>, op: &'static str, source: io::Error) -> Self {
        Self::Io {
            document: document.into(),
            op,
            source,
        }
    }

    /// The stable category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidName { .. } => ErrorCode::ValidationError,
            Self::Serialization { .. } | Self::Io { .. } => ErrorCode::IoError,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
