use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::AlbumId;

/// The `site_config` singleton: global display settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// The album shown as the main portfolio. Must name an existing album.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_album: Option<AlbumId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Portfolio".into(),
            tagline: None,
            contact_email: None,
            main_album: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_main_album() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Portfolio");
        assert!(config.main_album.is_none());
    }

    #[test]
    fn partial_document_deserializes() {
        let config: SiteConfig = serde_json::from_str(r#"{"title":"Shore","main_album":"A2"}"#).unwrap();
        assert_eq!(config.main_album.unwrap().as_str(), "A2");
        assert!(config.tagline.is_none());
    }
}
