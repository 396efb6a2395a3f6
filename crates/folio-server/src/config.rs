use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_auth::{AuthConfig, HashParams};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Prefix of every environment variable read by [`ServerConfig::apply_env`].
pub const ENV_PREFIX: &str = "FOLIO_";

/// Server configuration, resolved once at startup.
///
/// Sources, later winning: built-in defaults, an optional TOML file, then
/// `FOLIO_*` environment variables. The administrator password override is
/// only ever taken from the environment.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the JSON documents.
    pub data_dir: PathBuf,
    /// Directory holding photo files.
    pub upload_dir: PathBuf,
    pub session_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_upload_bytes: usize,
    /// Username accepted while the password override is active.
    pub admin_username: String,
    pub password_hash: HashParams,
    #[serde(skip)]
    pub admin_password_override: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from("data"),
            upload_dir: PathBuf::from("uploads"),
            session_ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 5 * 60,
            max_upload_bytes: 25 * 1024 * 1024,
            admin_username: "admin".into(),
            password_hash: HashParams::default(),
            admin_password_override: None,
        }
    }
}

impl ServerConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Override fields from `FOLIO_*` variables. Unrelated variables are
    /// ignored; malformed values are an error.
    pub fn apply_env<I>(&mut self, vars: I) -> ServerResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match field {
                "BIND_ADDR" => self.bind_addr = parse_env(&key, &value)?,
                "DATA_DIR" => self.data_dir = PathBuf::from(value),
                "UPLOAD_DIR" => self.upload_dir = PathBuf::from(value),
                "SESSION_TTL_SECS" => self.session_ttl_secs = parse_env(&key, &value)?,
                "SWEEP_INTERVAL_SECS" => self.sweep_interval_secs = parse_env(&key, &value)?,
                "MAX_UPLOAD_BYTES" => self.max_upload_bytes = parse_env(&key, &value)?,
                "ADMIN_USERNAME" => self.admin_username = value,
                "ADMIN_PASSWORD" if !value.is_empty() => {
                    self.admin_password_override = Some(value)
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            session_ttl: self.session_ttl(),
            hash_params: self.password_hash,
            admin_username: self.admin_username.clone(),
            password_override: self.admin_password_override.clone(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("upload_dir", &self.upload_dir)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("admin_username", &self.admin_username)
            .field("password_hash", &self.password_hash)
            .field(
                "admin_password_override",
                &self.admin_password_override.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn parse_env<T>(key: &str, value: &str) -> ServerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ServerError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.session_ttl(), Duration::from_secs(86_400));
        assert_eq!(c.sweep_interval_secs, 300);
        assert!(c.admin_password_override.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:9000"
            data_dir = "/srv/folio/data"
            session_ttl_secs = 3600

            [password_hash]
            memory_kib = 8
            iterations = 1
            parallelism = 1
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.data_dir, PathBuf::from("/srv/folio/data"));
        assert_eq!(c.upload_dir, PathBuf::from("uploads"));
        assert_eq!(c.session_ttl_secs, 3600);
        assert_eq!(c.password_hash.memory_kib, 8);
    }

    #[test]
    fn toml_never_supplies_the_password_override() {
        let err = ServerConfig::from_toml(r#"admin_password_override = "secret""#);
        assert!(err.is_err());
    }

    #[test]
    fn env_wins_over_file() {
        let mut c = ServerConfig::from_toml("session_ttl_secs = 3600").unwrap();
        c.apply_env(vars(&[
            ("FOLIO_SESSION_TTL_SECS", "60"),
            ("FOLIO_UPLOAD_DIR", "/tmp/up"),
            ("FOLIO_ADMIN_PASSWORD", "operator-pass"),
            ("HOME", "/root"),
        ]))
        .unwrap();
        assert_eq!(c.session_ttl_secs, 60);
        assert_eq!(c.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(c.auth_config().password_override.as_deref(), Some("operator-pass"));
        assert!(!format!("{c:?}").contains("operator-pass"));
    }

    #[test]
    fn malformed_env_is_an_error() {
        let mut c = ServerConfig::default();
        let err = c
            .apply_env(vars(&[("FOLIO_BIND_ADDR", "not an address")]))
            .unwrap_err();
        assert!(err.to_string().contains("FOLIO_BIND_ADDR"));
    }

    #[test]
    fn empty_password_override_is_ignored() {
        let mut c = ServerConfig::default();
        c.apply_env(vars(&[("FOLIO_ADMIN_PASSWORD", "")])).unwrap();
        assert!(c.admin_password_override.is_none());
    }
}
