//! Session tokens and the in-memory session table.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// An opaque bearer token (64 hex characters).
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mint a new cryptographically random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lookup key for the session table.
    ///
    /// Sessions are indexed by a digest of the token rather than the token
    /// itself, so map lookups do not leak timing about the secret.
    fn digest(&self) -> [u8; 32] {
        *blake3::hash(self.0.as_bytes()).as_bytes()
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<redacted>)")
    }
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Valid until `expires_at`.
    Active,
    /// TTL elapsed. Terminal.
    Expired,
    /// Logged out or invalidated. Terminal.
    Revoked,
}

/// A login session.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Active && !self.is_expired_at(now)
    }
}

/// Process-wide table of live sessions.
///
/// Constructed once at startup and shared by reference; dropping it drops
/// every session.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<[u8; 32], Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) {
        let mut map = self.sessions.write().expect("session lock poisoned");
        map.insert(session.token.digest(), session);
    }

    pub fn get(&self, token: &SessionToken) -> Option<Session> {
        let map = self.sessions.read().expect("session lock poisoned");
        map.get(&token.digest()).cloned()
    }

    /// Look up a session that is active at `now`.
    ///
    /// A session found past its expiry is marked [`SessionState::Expired`]
    /// and left for the sweeper.
    pub fn get_active(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<Session> {
        let key = token.digest();
        {
            let map = self.sessions.read().expect("session lock poisoned");
            match map.get(&key) {
                None => return None,
                Some(session) if session.is_active_at(now) => return Some(session.clone()),
                Some(session) if session.state != SessionState::Active => return None,
                Some(_) => {}
            }
        }
        let mut map = self.sessions.write().expect("session lock poisoned");
        if let Some(session) = map.get_mut(&key) {
            if session.is_expired_at(now) {
                session.state = SessionState::Expired;
            }
        }
        None
    }

    /// Remove a session, returning it in the `Revoked` state.
    pub fn remove(&self, token: &SessionToken) -> Option<Session> {
        let mut map = self.sessions.write().expect("session lock poisoned");
        map.remove(&token.digest()).map(|mut session| {
            session.state = SessionState::Revoked;
            session
        })
    }

    /// Remove every session of `username` except `keep`. Returns the count.
    pub fn revoke_user(&self, username: &str, keep: Option<&SessionToken>) -> usize {
        let keep = keep.map(SessionToken::digest);
        let mut map = self.sessions.write().expect("session lock poisoned");
        let before = map.len();
        map.retain(|key, session| session.username != username || Some(*key) == keep);
        before - map.len()
    }

    /// Remove every session. Returns the count.
    pub fn clear(&self) -> usize {
        let mut map = self.sessions.write().expect("session lock poisoned");
        let count = map.len();
        map.clear();
        count
    }

    /// Evict sessions that are expired at `now`. Returns the count.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.sessions.write().expect("session lock poisoned");
        let before = map.len();
        map.retain(|_, session| session.is_active_at(now));
        before - map.len()
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self, now: DateTime<Utc>) -> usize {
        let map = self.sessions.read().expect("session lock poisoned");
        map.values().filter(|s| s.is_active_at(now)).count()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session_count", &self.len())
            .finish()
    }
}
