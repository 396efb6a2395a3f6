//! Helpers shared by the patch types.

use serde::{Deserialize, Deserializer};

use crate::error::{ServiceError, ServiceResult};

/// Maximum length of titles, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// an absent field is `None`, `null` is `Some(None)`, a value is
/// `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim optional free text; blank text becomes `None`.
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim a required text field and enforce its length bound.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}
