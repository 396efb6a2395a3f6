use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_auth::AuthError;
use folio_services::ServiceError;
use folio_store::StoreError;
use folio_types::ErrorCode;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request body or query could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Service(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::BadRequest(_) | Self::PayloadTooLarge(_) | Self::Config(_) => {
                ErrorCode::ValidationError
            }
            Self::Io(_) | Self::Internal(_) => ErrorCode::IoError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => status_for(self.code()),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

/// HTTP status for each error category.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Unauthenticated | ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::IoError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = self.status();
        let message = match code {
            // Storage detail (paths, OS errors) stays in the log.
            ErrorCode::IoError => {
                error!(error = %self, "request failed");
                "internal storage error".to_string()
            }
            _ => self.to_string(),
        };
        let mut response = (status, Json(ErrorBody { code, message })).into_response();
        if code == ErrorCode::Unauthenticated {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_codes() {
        let cases = [
            (ServerError::from(ServiceError::album_not_found("A1")), StatusCode::NOT_FOUND),
            (ServerError::from(ServiceError::Validation("x".into())), StatusCode::UNPROCESSABLE_ENTITY),
            (ServerError::from(AuthError::Unauthenticated), StatusCode::UNAUTHORIZED),
            (ServerError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ServerError::from(ServiceError::Conflict("x".into())), StatusCode::CONFLICT),
            (ServerError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServerError::PayloadTooLarge("limit".into()), StatusCode::PAYLOAD_TOO_LARGE),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn unauthenticated_carries_challenge() {
        let response = ServerError::from(AuthError::Unauthenticated).into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
