//! Session authentication for Folio.
//!
//! The admin has a single credential: a username and an argon2 hash stored in
//! the `admin_config` document. Logging in mints an opaque random token bound
//! to a fixed TTL; every mutating request presents it and is validated here.
//!
//! # Modules
//!
//! - [`password`]: salted, slow one-way hashing ([`PasswordHasher`])
//! - [`session`]: tokens and the in-memory [`SessionStore`]
//! - [`authenticator`]: login, validation, logout, password rotation
//! - [`sweeper`]: periodic eviction of expired sessions
//! - [`clock`]: injectable time source
//!
//! Sessions are never persisted; every session is invalid after a restart.

pub mod authenticator;
pub mod clock;
pub mod error;
pub mod password;
pub mod session;
pub mod sweeper;

pub use authenticator::{
    AuthConfig, Authenticator, CredentialSource, Principal, ADMIN_DOCUMENT, MIN_PASSWORD_LEN,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use password::{HashParams, PasswordHasher};
pub use session::{Session, SessionState, SessionStore, SessionToken};
pub use sweeper::spawn_sweeper;
