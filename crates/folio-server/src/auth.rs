//! Session extraction and the authentication middleware.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use folio_auth::{AuthError, SessionToken};

use crate::error::ServerError;
use crate::state::AppState;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "folio_session";

/// The session token presented by a request.
///
/// An `Authorization: Bearer` header wins over the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| SessionToken::from(token))
}

fn cookie_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::from(value))
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(token: &SessionToken, max_age_secs: u64) -> HeaderValue {
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}",
        token.as_str()
    );
    // Tokens are hex, so the cookie is always a valid header value.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value clearing the session cookie.
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("folio_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Reject requests without a valid session; otherwise attach the
/// [`Principal`](folio_auth::Principal) as a request extension.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = session_token(request.headers()).ok_or(AuthError::Unauthenticated)?;
    let principal = state.auth.validate(&token)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
