use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `admin_config` singleton: the administrator's login.
///
/// Only a one-way hash is stored. The salt lives inside the PHC string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredential {
    pub username: String,
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
