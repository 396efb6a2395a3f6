use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_session;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Folio endpoints.
///
/// Reads of albums and the site config, login and the album unlock check are
/// public. Every other route requires a session. Public album reads withhold
/// the photos of protected albums unless the caller is signed in.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    let public = Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/auth/login", post(handler::login_handler))
        .route("/v1/albums", get(handler::list_albums_handler))
        .route("/v1/albums/:id", get(handler::get_album_handler))
        .route("/v1/albums/:id/unlock", post(handler::unlock_album_handler))
        .route("/v1/config", get(handler::get_config_handler));

    let protected = Router::new()
        .route("/v1/auth/logout", post(handler::logout_handler))
        .route("/v1/auth/password", post(handler::change_password_handler))
        .route("/v1/albums", post(handler::create_album_handler))
        .route(
            "/v1/albums/:id",
            axum::routing::patch(handler::update_album_handler)
                .delete(handler::delete_album_handler),
        )
        .route(
            "/v1/albums/:id/photos",
            post(handler::add_photo_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/v1/albums/:id/photos/:photo",
            axum::routing::patch(handler::update_photo_handler)
                .delete(handler::remove_photo_handler),
        )
        .route("/v1/albums/:id/order", put(handler::reorder_handler))
        .route("/v1/albums/:id/cover", put(handler::set_cover_handler))
        .route("/v1/albums/:id/password", put(handler::set_album_password_handler))
        .route("/v1/config", put(handler::update_config_handler))
        .route("/v1/storage/stats", get(handler::storage_stats_handler))
        .route("/v1/storage/reconcile", get(handler::reconcile_handler))
        .route("/v1/storage/prune", post(handler::prune_handler))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
