//! Document name validation.
//!
//! A document name becomes a file stem (`<name>.json`), so the accepted
//! alphabet is deliberately narrow:
//! - Must be non-empty and at most 64 characters
//! - Must start with an ASCII lowercase letter
//! - May contain only ASCII lowercase letters, digits, `_` and `-`

use std::fmt;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Maximum length of a document name.
pub const MAX_NAME_LEN: usize = 64;

/// Validate a document name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use folio_store::validate_document_name;
///
/// assert!(validate_document_name("albums").is_ok());
/// assert!(validate_document_name("site_config").is_ok());
/// assert!(validate_document_name("../etc/passwd").is_err());
/// assert!(validate_document_name("").is_err());
/// ```
pub fn validate_document_name(name: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("must be at most 64 characters"));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("must start with a lowercase letter"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
    {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// A validated document name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentName(String);

impl DocumentName {
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_document_name(&name)?;
        Ok(Self(name))
    }

    /// Build a name from a compile-time constant.
    ///
    /// The constant must satisfy [`validate_document_name`]; this is checked
    /// in debug builds.
    pub fn from_static(name: &'static str) -> Self {
        debug_assert!(
            validate_document_name(name).is_ok(),
            "invalid static document name {name:?}"
        );
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the document inside the data directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl FromStr for DocumentName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DocumentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentName({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["albums", "site_config", "admin-config", "a", "doc2"] {
            assert!(validate_document_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_names() {
        for name in [
            "",
            "Albums",
            "2albums",
            "_albums",
            "albums.json",
            "a/b",
            "..",
            "a b",
            "albüms",
        ] {
            assert!(validate_document_name(name).is_err(), "{name:?} should be invalid");
        }
        assert!(validate_document_name(&"a".repeat(65)).is_err());
        assert!(validate_document_name(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn file_name_appends_extension() {
        let name = DocumentName::new("albums").unwrap();
        assert_eq!(name.file_name(), "albums.json");
        assert_eq!(name.to_string(), "albums");
    }

    #[test]
    fn parse_reports_reason() {
        let err = "../x".parse::<DocumentName>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidName { .. }));
    }
}
