use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_store::{DocumentName, DocumentStore};
use folio_types::AdminCredential;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::password::{HashParams, PasswordHasher};
use crate::session::{Session, SessionState, SessionStore, SessionToken};

/// Name of the document holding the [`AdminCredential`].
pub const ADMIN_DOCUMENT: &str = "admin_config";

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

const MAX_USERNAME_LEN: usize = 64;

/// A login that loses a race with a credential change retries once against
/// the new credential.
const LOGIN_ATTEMPTS: usize = 2;

/// Authenticator configuration, resolved once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    /// Lifetime of a session from login.
    pub session_ttl: Duration,
    /// Cost parameters for new password hashes.
    pub hash_params: HashParams,
    /// Username used while `password_override` is active.
    pub admin_username: String,
    /// Operator-supplied password that takes precedence over the stored
    /// credential.
    pub password_override: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(24 * 60 * 60),
            hash_params: HashParams::default(),
            admin_username: "admin".into(),
            password_override: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_ttl", &self.session_ttl)
            .field("hash_params", &self.hash_params)
            .field("admin_username", &self.admin_username)
            .field("password_override", &self.password_override.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where the effective administrator credential comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// The operator override; the stored document is ignored.
    Override,
    /// The `admin_config` document.
    Document,
}

/// An authenticated caller.
#[derive(Clone, Debug)]
pub struct Principal {
    pub username: String,
    pub token: SessionToken,
    pub expires_at: DateTime<Utc>,
}

/// Issues, validates and revokes sessions for the administrator.
pub struct Authenticator {
    store: Arc<DocumentStore>,
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
    ttl: chrono::Duration,
    document: DocumentName,
    override_credential: Option<AdminCredential>,
    /// Verified against when no credential exists, so a missing credential
    /// costs the same as a wrong password.
    dummy_hash: String,
    /// Bumped whenever the credential changes. Sessions are inserted, and
    /// revoked on a change, only while holding it.
    generation: Mutex<u64>,
}

impl Authenticator {
    pub fn new(
        store: Arc<DocumentStore>,
        sessions: Arc<SessionStore>,
        config: AuthConfig,
    ) -> AuthResult<Self> {
        Self::with_clock(store, sessions, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<DocumentStore>,
        sessions: Arc<SessionStore>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let hasher = PasswordHasher::new(config.hash_params)?;
        let ttl = chrono::Duration::from_std(config.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));

        let override_credential = match config.password_override {
            Some(password) => {
                validate_username(&config.admin_username)?;
                info!(username = %config.admin_username, "administrator password supplied by operator override");
                Some(AdminCredential {
                    username: config.admin_username,
                    password_hash: hasher.hash(&password)?,
                    updated_at: clock.now(),
                })
            }
            None => None,
        };
        let dummy_hash = hasher.hash("folio-dummy-password")?;

        Ok(Self {
            store,
            sessions,
            clock,
            hasher,
            ttl,
            document: DocumentName::from_static(ADMIN_DOCUMENT),
            override_credential,
            dummy_hash,
            generation: Mutex::new(0),
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn credential_source(&self) -> CredentialSource {
        if self.override_credential.is_some() {
            CredentialSource::Override
        } else {
            CredentialSource::Document
        }
    }

    /// The credential logins are checked against. The override wins over
    /// the stored document.
    fn effective_credential(&self) -> AuthResult<Option<AdminCredential>> {
        if let Some(credential) = &self.override_credential {
            return Ok(Some(credential.clone()));
        }
        Ok(self
            .store
            .read_json_or_default::<Option<AdminCredential>>(&self.document)?)
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Verify credentials and open a session.
    ///
    /// The session is only inserted if the credential it was checked against
    /// is still current, so a login racing a password change either lands
    /// before the change's revocation or is re-checked against the new hash.
    pub fn login(&self, username: &str, password: &str) -> AuthResult<Session> {
        for _ in 0..LOGIN_ATTEMPTS {
            let seen = *self.generation();
            let Some(stored_username) = self.check_credentials(username, password)? else {
                info!(username, "login rejected");
                return Err(AuthError::InvalidCredentials);
            };

            let generation = self.generation();
            if *generation != seen {
                debug!(username, "credential changed during login; checking again");
                continue;
            }
            let now = self.clock.now();
            let session = Session {
                token: SessionToken::generate(),
                username: stored_username,
                created_at: now,
                expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
                state: SessionState::Active,
            };
            self.sessions.insert(session.clone());
            drop(generation);
            info!(username = %session.username, expires_at = %session.expires_at, "session opened");
            return Ok(session);
        }
        info!(username, "login rejected after concurrent credential changes");
        Err(AuthError::InvalidCredentials)
    }

    /// Check a username and password against the effective credential,
    /// returning the stored username on success.
    fn check_credentials(&self, username: &str, password: &str) -> AuthResult<Option<String>> {
        let credential = self.effective_credential()?;
        let (stored_username, stored_hash) = match &credential {
            Some(c) => (c.username.as_str(), c.password_hash.as_str()),
            None => {
                warn!("login attempted but no administrator credential is configured");
                ("", self.dummy_hash.as_str())
            }
        };

        // Always pay for the hash so timing does not reveal which half failed.
        let password_ok = self.hasher.verify(password, stored_hash);
        let username_ok = credential.is_some() && usernames_match(username, stored_username);
        Ok((password_ok && username_ok).then(|| stored_username.to_string()))
    }

    /// Resolve a token to its principal.
    pub fn validate(&self, token: &SessionToken) -> AuthResult<Principal> {
        let session = self
            .sessions
            .get_active(token, self.clock.now())
            .ok_or(AuthError::Unauthenticated)?;
        Ok(Principal {
            username: session.username,
            token: session.token,
            expires_at: session.expires_at,
        })
    }

    /// End a session. Unknown tokens are ignored.
    pub fn logout(&self, token: &SessionToken) {
        if let Some(session) = self.sessions.remove(token) {
            info!(username = %session.username, "session closed");
        }
    }

    /// Invalidate a single session. Returns `true` if it existed.
    pub fn revoke(&self, token: &SessionToken) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Invalidate every session of `username`.
    pub fn revoke_user(&self, username: &str) -> usize {
        let revoked = self.sessions.revoke_user(username, None);
        info!(username, revoked, "sessions revoked");
        revoked
    }

    /// Rotate the administrator password.
    ///
    /// The old password is re-verified under the credential document's lock
    /// and the new hash is persisted atomically. Every other session of the
    /// user is then revoked; the calling session survives if `keep_current`.
    /// Returns the number of sessions revoked.
    pub fn change_password(
        &self,
        principal: &Principal,
        old_password: &str,
        new_password: &str,
        keep_current: bool,
    ) -> AuthResult<usize> {
        if self.override_credential.is_some() {
            return Err(AuthError::OverrideActive);
        }
        self.validate(&principal.token)?;
        check_password_policy(new_password)?;
        if old_password == new_password {
            return Err(AuthError::Rejected(
                "new password must differ from the current one".into(),
            ));
        }

        let new_hash = self.hasher.hash(new_password)?;
        let now = self.clock.now();
        self.store
            .update_json(&self.document, |current: &mut Option<AdminCredential>| {
                let credential = current.as_mut().ok_or(AuthError::InvalidCredentials)?;
                if credential.username != principal.username
                    || !self.hasher.verify(old_password, &credential.password_hash)
                {
                    return Err(AuthError::InvalidCredentials);
                }
                credential.password_hash = new_hash;
                credential.updated_at = now;
                Ok(())
            })?;

        let mut generation = self.generation();
        *generation += 1;
        let keep = keep_current.then_some(&principal.token);
        let revoked = self.sessions.revoke_user(&principal.username, keep);
        if !keep_current {
            self.sessions.remove(&principal.token);
        }
        drop(generation);
        info!(username = %principal.username, revoked, "administrator password changed");
        Ok(revoked)
    }

    /// Replace the stored credential outright and drop every session.
    ///
    /// This is the operator bootstrap path; it does not require the old
    /// password.
    pub fn set_credential(&self, username: &str, password: &str) -> AuthResult<()> {
        validate_username(username)?;
        check_password_policy(password)?;
        let credential = AdminCredential {
            username: username.to_string(),
            password_hash: self.hasher.hash(password)?,
            updated_at: self.clock.now(),
        };
        self.store
            .update_json(&self.document, |current: &mut Option<AdminCredential>| {
                *current = Some(credential);
                Ok::<_, AuthError>(())
            })?;
        let revoked = {
            let mut generation = self.generation();
            *generation += 1;
            self.sessions.clear()
        };
        if self.override_credential.is_some() {
            warn!("credential stored, but the operator override remains in effect");
        }
        info!(username, revoked, "administrator credential set");
        Ok(())
    }

    /// Evict expired sessions. Advisory: validation enforces expiry itself.
    pub fn sweep_expired(&self) -> usize {
        let evicted = self.sessions.sweep(self.clock.now());
        if evicted > 0 {
            debug!(evicted, "expired sessions swept");
        }
        evicted
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("ttl", &self.ttl)
            .field("source", &self.credential_source())
            .field("sessions", &self.sessions)
            .finish()
    }
}

/// Compare usernames without an early exit on the first differing byte.
fn usernames_match(supplied: &str, stored: &str) -> bool {
    // blake3::Hash equality is constant time.
    blake3::hash(supplied.as_bytes()) == blake3::hash(stored.as_bytes())
}

fn validate_username(username: &str) -> AuthResult<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AuthError::Rejected(format!(
            "username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AuthError::Rejected(
            "username must not contain whitespace".into(),
        ));
    }
    Ok(())
}

fn check_password_policy(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Rejected(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
