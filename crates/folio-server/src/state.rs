use std::sync::Arc;

use folio_auth::{Authenticator, Clock, PasswordHasher, SessionStore, SystemClock};
use folio_services::{AlbumService, ConfigService, Reconciler, UploadStore};
use folio_store::DocumentStore;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Everything a request handler needs, shared across the router.
#[derive(Clone)]
pub struct AppState {
    pub albums: Arc<AlbumService>,
    pub site: Arc<ConfigService>,
    pub uploads: Arc<UploadStore>,
    pub reconciler: Arc<Reconciler>,
    pub auth: Arc<Authenticator>,
    pub max_upload_bytes: usize,
    pub session_ttl_secs: u64,
}

impl AppState {
    /// Open the data and upload directories and wire up the services.
    pub fn open(config: &ServerConfig) -> ServerResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> ServerResult<Self> {
        let store = Arc::new(DocumentStore::open_dir(&config.data_dir)?);
        let uploads = Arc::new(UploadStore::open(&config.upload_dir)?);
        let sessions = Arc::new(SessionStore::new());
        let auth = Arc::new(Authenticator::with_clock(
            Arc::clone(&store),
            sessions,
            config.auth_config(),
            Arc::clone(&clock),
        )?);
        let hasher = PasswordHasher::new(config.password_hash)?;

        info!(
            data_dir = %config.data_dir.display(),
            upload_dir = %config.upload_dir.display(),
            credential_source = ?auth.credential_source(),
            "state opened"
        );
        Ok(Self {
            albums: Arc::new(AlbumService::new(
                Arc::clone(&store),
                Arc::clone(&uploads),
                hasher,
                Arc::clone(&clock),
            )),
            site: Arc::new(ConfigService::new(Arc::clone(&store), clock)),
            reconciler: Arc::new(Reconciler::new(store, Arc::clone(&uploads))),
            uploads,
            auth,
            max_upload_bytes: config.max_upload_bytes,
            session_ttl_secs: config.session_ttl_secs,
        })
    }
}
