use crate::error::{FileSearchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The provider accepts at most this many entries per document.
pub const MAX_CUSTOM_METADATA: usize = 20;

/// One key/value pair attached to a document at import time.
///
/// Serializes to the provider shape, e.g.
/// `{"key":"author","stringValue":"Ada"}` or
/// `{"key":"tags","stringListValue":{"values":["a","b"]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetadata {
    pub key: String,
    #[serde(flatten)]
    pub value: MetadataValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "stringListValue")]
    StringList(StringList),
    #[serde(rename = "numericValue")]
    Numeric(f64),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StringList {
    #[serde(default)]
    pub values: Vec<String>,
}

impl CustomMetadata {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: MetadataValue::String(value.into()),
        }
    }

    pub fn string_list<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            value: MetadataValue::StringList(StringList {
                values: values.into_iter().map(Into::into).collect(),
            }),
        }
    }

    pub fn numeric(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: MetadataValue::Numeric(value),
        }
    }
}

/// Checks count, key presence and key uniqueness.
pub fn validate_custom_metadata(entries: &[CustomMetadata]) -> Result<()> {
    if entries.len() > MAX_CUSTOM_METADATA {
        return Err(FileSearchError::InvalidMetadata(format!(
            "{} entries given, at most {} allowed",
            entries.len(),
            MAX_CUSTOM_METADATA
        )));
    }

    let mut seen = HashSet::new();
    for entry in entries {
        if entry.key.trim().is_empty() {
            return Err(FileSearchError::InvalidMetadata("empty key".to_string()));
        }
        if !seen.insert(entry.key.as_str()) {
            return Err(FileSearchError::InvalidMetadata(format!(
                "duplicate key '{}'",
                entry.key
            )));
        }
        if let MetadataValue::Numeric(n) = entry.value {
            if !n.is_finite() {
                return Err(FileSearchError::InvalidMetadata(format!(
                    "non-finite value for '{}'",
                    entry.key
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let entries = vec![
            CustomMetadata::string("author", "Ada"),
            CustomMetadata::string_list("tags", ["a", "b"]),
            CustomMetadata::numeric("year", 1843.0),
        ];
        let value = serde_json::to_value(&entries).unwrap();
        assert_eq!(
            value,
            json!([
                {"key": "author", "stringValue": "Ada"},
                {"key": "tags", "stringListValue": {"values": ["a", "b"]}},
                {"key": "year", "numericValue": 1843.0}
            ])
        );

        let parsed: Vec<CustomMetadata> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_validate_limits() {
        let many: Vec<_> = (0..=MAX_CUSTOM_METADATA)
            .map(|i| CustomMetadata::numeric(format!("k{i}"), i as f64))
            .collect();
        assert!(validate_custom_metadata(&many).is_err());
        assert!(validate_custom_metadata(&many[..MAX_CUSTOM_METADATA]).is_ok());
    }

    #[test]
    fn test_validate_keys() {
        let dup = [CustomMetadata::string("k", "a"), CustomMetadata::string("k", "b")];
        assert!(validate_custom_metadata(&dup).is_err());
        assert!(validate_custom_metadata(&[CustomMetadata::string(" ", "a")]).is_err());
        assert!(validate_custom_metadata(&[CustomMetadata::numeric("n", f64::NAN)]).is_err());
    }
}
