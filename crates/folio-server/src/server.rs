use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The Folio HTTP server.
pub struct FolioServer {
    config: ServerConfig,
    state: AppState,
}

impl FolioServer {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::open(&config)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until ctrl-c or SIGTERM, running the session sweeper alongside.
    pub async fn serve(self) -> ServerResult<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = folio_auth::spawn_sweeper(
            self.state.auth.clone(),
            self.config.sweep_interval(),
            shutdown_rx,
        );

        let app = build_router(self.state.clone());
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "folio server listening");
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        let _ = shutdown_tx.send(true);
        if let Err(e) = sweeper.await {
            warn!(error = %e, "session sweeper ended abnormally");
        }
        info!("folio server stopped");
        served
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> ServerConfig {
        ServerConfig {
            data_dir: dir.join("data"),
            upload_dir: dir.join("uploads"),
            password_hash: folio_auth::HashParams::minimal(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn server_construction_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let server = FolioServer::new(config(dir.path())).unwrap();
        assert_eq!(server.config().bind_addr.port(), 8080);
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("uploads").is_dir());
        let _router = server.router();
    }

    #[test]
    fn override_is_reported_as_credential_source() {
        let dir = tempfile::tempdir().unwrap();
        let server = FolioServer::new(ServerConfig {
            admin_password_override: Some("operator-pass".into()),
            ..config(dir.path())
        })
        .unwrap();
        assert_eq!(
            server.state().auth.credential_source(),
            folio_auth::CredentialSource::Override
        );
    }
}
