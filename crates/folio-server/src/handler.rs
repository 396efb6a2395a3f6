//! Request handlers.
//!
//! Core operations do blocking file I/O and password hashing, so each one
//! runs on the blocking pool via [`blocking`].

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection, QueryRejection};
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{async_trait, Extension, Json};
use chrono::{DateTime, Utc};
use folio_auth::Principal;
use folio_services::{
    AlbumPatch, NewAlbum, PhotoPatch, PhotoUpload, ReconciliationReport, ServiceError,
    SiteConfigPatch, StorageStats,
};
use folio_types::{Album, AlbumId, Photo, PhotoId, SiteConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{expired_session_cookie, session_cookie, session_token};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Run a blocking core operation off the async runtime.
pub async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
}

/// `Json` whose rejection is reported in the API's error format.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|e: JsonRejection| ServerError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Raw upload body. Rejections, the size limit included, are reported in the
/// API's error format.
pub struct UploadBody(pub Bytes);

#[async_trait]
impl<S> FromRequest<S> for UploadBody
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|e: BytesRejection| {
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ServerError::PayloadTooLarge(e.body_text())
                } else {
                    ServerError::BadRequest(e.body_text())
                }
            })?;
        Ok(Self(bytes))
    }
}

fn album_id(raw: &str) -> ServerResult<AlbumId> {
    raw.parse()
        .map_err(|_| ServiceError::album_not_found(raw).into())
}

fn photo_id(raw: &str) -> ServerResult<PhotoId> {
    raw.parse()
        .map_err(|_| ServiceError::photo_not_found(raw).into())
}

/// An album as served to clients: the password hash is replaced by a flag.
///
/// Visitors without a session see a protected album's title and description
/// only; its photos come back from a successful unlock.
#[derive(Debug, Serialize)]
pub struct AlbumView {
    #[serde(flatten)]
    pub album: Album,
    pub protected: bool,
    /// Photos and cover were withheld.
    pub locked: bool,
}

impl AlbumView {
    pub fn for_visitor(album: Album) -> Self {
        let mut view = Self::from(album);
        if view.protected {
            view.album.photos.clear();
            view.album.cover = None;
            view.locked = true;
        }
        view
    }

    fn for_caller(album: Album, signed_in: bool) -> Self {
        if signed_in {
            album.into()
        } else {
            Self::for_visitor(album)
        }
    }
}

impl From<Album> for AlbumView {
    fn from(mut album: Album) -> Self {
        let protected = album.password_hash.take().is_some();
        Self {
            album,
            protected,
            locked: false,
        }
    }
}

/// Whether the request carries a valid administrator session. Used by
/// public routes whose answer depends on it.
fn signed_in(state: &AppState, headers: &HeaderMap) -> bool {
    session_token(headers).is_some_and(|token| state.auth.validate(&token).is_ok())
}

// ---- Health ----

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "folio-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---- Sessions ----

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ServerResult<Response> {
    let auth = state.auth.clone();
    let session = blocking(move || Ok(auth.login(&body.username, &body.password)?)).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.token, state.session_ttl_secs),
    );
    let body = LoginResponse {
        token: session.token.as_str().to_string(),
        username: session.username,
        expires_at: session.expires_at,
    };
    Ok((headers, Json(body)).into_response())
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Response {
    state.auth.logout(&principal.token);
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, expired_session_cookie());
    (StatusCode::NO_CONTENT, headers).into_response()
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    #[serde(default = "keep_current_default")]
    pub keep_current: bool,
}

fn keep_current_default() -> bool {
    true
}

pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ServerResult<Json<serde_json::Value>> {
    let auth = state.auth.clone();
    let revoked = blocking(move || {
        Ok(auth.change_password(
            &principal,
            &body.old_password,
            &body.new_password,
            body.keep_current,
        )?)
    })
    .await?;
    Ok(Json(json!({ "revoked_sessions": revoked })))
}

// ---- Albums ----

pub async fn list_albums_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<AlbumView>>> {
    let signed_in = signed_in(&state, &headers);
    let albums = blocking(move || Ok(state.albums.list()?)).await?;
    Ok(Json(
        albums
            .into_iter()
            .map(|album| AlbumView::for_caller(album, signed_in))
            .collect(),
    ))
}

pub async fn get_album_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Json<AlbumView>> {
    let id = album_id(&id)?;
    let signed_in = signed_in(&state, &headers);
    let album = blocking(move || Ok(state.albums.get(&id)?)).await?;
    Ok(Json(AlbumView::for_caller(album, signed_in)))
}

pub async fn create_album_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewAlbum>,
) -> ServerResult<(StatusCode, Json<AlbumView>)> {
    let album = blocking(move || Ok(state.albums.create(body)?)).await?;
    Ok((StatusCode::CREATED, Json(album.into())))
}

pub async fn update_album_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<AlbumPatch>,
) -> ServerResult<Json<AlbumView>> {
    let id = album_id(&id)?;
    let album = blocking(move || Ok(state.albums.update(&id, patch)?)).await?;
    Ok(Json(album.into()))
}

pub async fn delete_album_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id = album_id(&id)?;
    blocking(move || Ok(state.albums.delete(&id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Photos ----

#[derive(Deserialize)]
pub struct UploadQuery {
    /// Original file name; its extension selects the stored type.
    pub name: String,
    pub caption: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub captured_at: Option<DateTime<Utc>>,
}

pub async fn add_photo_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    UploadBody(bytes): UploadBody,
) -> ServerResult<(StatusCode, Json<Photo>)> {
    let id = album_id(&id)?;
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let upload = PhotoUpload {
        original_name: query.name,
        bytes: bytes.to_vec(),
        width: query.width,
        height: query.height,
        captured_at: query.captured_at,
        caption: query.caption,
    };
    let photo = blocking(move || Ok(state.albums.add_photo(&id, upload)?)).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn update_photo_handler(
    State(state): State<AppState>,
    Path((id, photo)): Path<(String, String)>,
    ApiJson(patch): ApiJson<PhotoPatch>,
) -> ServerResult<Json<Photo>> {
    let id = album_id(&id)?;
    let photo = photo_id(&photo)?;
    let photo = blocking(move || Ok(state.albums.update_photo(&id, &photo, patch)?)).await?;
    Ok(Json(photo))
}

pub async fn remove_photo_handler(
    State(state): State<AppState>,
    Path((id, photo)): Path<(String, String)>,
) -> ServerResult<StatusCode> {
    let id = album_id(&id)?;
    let photo = photo_id(&photo)?;
    blocking(move || Ok(state.albums.remove_photo(&id, &photo)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct OrderRequest {
    pub order: Vec<PhotoId>,
}

pub async fn reorder_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<OrderRequest>,
) -> ServerResult<Json<AlbumView>> {
    let id = album_id(&id)?;
    let album = blocking(move || Ok(state.albums.reorder(&id, body.order)?)).await?;
    Ok(Json(album.into()))
}

#[derive(Deserialize)]
pub struct CoverRequest {
    pub photo: Option<PhotoId>,
}

pub async fn set_cover_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CoverRequest>,
) -> ServerResult<Json<AlbumView>> {
    let id = album_id(&id)?;
    let album = blocking(move || Ok(state.albums.set_cover(&id, body.photo)?)).await?;
    Ok(Json(album.into()))
}

#[derive(Deserialize)]
pub struct AlbumPasswordRequest {
    pub password: Option<String>,
}

pub async fn set_album_password_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AlbumPasswordRequest>,
) -> ServerResult<Json<AlbumView>> {
    let id = album_id(&id)?;
    let album = blocking(move || {
        Ok(state.albums.set_password(&id, body.password.as_deref())?)
    })
    .await?;
    Ok(Json(album.into()))
}

#[derive(Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub granted: bool,
    /// The full album, present only when access was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<AlbumView>,
}

/// Visitor check of an album password. Public.
pub async fn unlock_album_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UnlockRequest>,
) -> ServerResult<Json<UnlockResponse>> {
    let id = album_id(&id)?;
    let album = blocking(move || {
        if !state.albums.verify_password(&id, &body.password)? {
            return Ok(None);
        }
        Ok(Some(state.albums.get(&id)?))
    })
    .await?;
    Ok(Json(UnlockResponse {
        granted: album.is_some(),
        album: album.map(AlbumView::from),
    }))
}

// ---- Site config ----

pub async fn get_config_handler(State(state): State<AppState>) -> ServerResult<Json<SiteConfig>> {
    let config = blocking(move || Ok(state.site.get()?)).await?;
    Ok(Json(config))
}

pub async fn update_config_handler(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<SiteConfigPatch>,
) -> ServerResult<Json<SiteConfig>> {
    let config = blocking(move || Ok(state.site.update(patch)?)).await?;
    Ok(Json(config))
}

// ---- Storage ----

pub async fn storage_stats_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<StorageStats>> {
    let stats = blocking(move || Ok(state.uploads.stats()?)).await?;
    Ok(Json(stats))
}

pub async fn reconcile_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<ReconciliationReport>> {
    let report = blocking(move || Ok(state.reconciler.scan()?)).await?;
    Ok(Json(report))
}

pub async fn prune_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let removed = blocking(move || Ok(state.reconciler.prune_orphans()?)).await?;
    Ok(Json(json!({ "removed": removed })))
}
