//! HTTP server for Folio.
//!
//! A thin axum binding over the core crates: handlers decode requests, run
//! the blocking core operation on the blocking pool, and map
//! [`ErrorCode`](folio_types::ErrorCode)s onto HTTP statuses.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::FolioServer;
pub use state::AppState;
