//! Normalized provider resource names.
//!
//! Callers may pass either a bare id (`my-store`) or a full name
//! (`fileSearchStores/my-store`); both normalize to the full form used in
//! request paths.

use crate::error::{FileSearchError, Result};
use serde::{Deserialize, Serialize};

const STORES: &str = "fileSearchStores";
const DOCUMENTS: &str = "documents";
const FILES: &str = "files";
const MODELS: &str = "models";

fn check_segment(full: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(FileSearchError::invalid_name(full, "empty id"));
    }
    if segment == "." || segment == ".." {
        return Err(FileSearchError::invalid_name(full, "relative path segment"));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%' | ':'))
    {
        return Err(FileSearchError::invalid_name(
            full,
            format!("unexpected character {c:?}"),
        ));
    }
    Ok(())
}

macro_rules! name_accessors {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = FileSearchError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }
    };
}

/// `fileSearchStores/{store}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreName(String);

impl StoreName {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let id = raw
            .strip_prefix(STORES)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(raw);
        check_segment(raw, id)?;
        Ok(Self(format!("{STORES}/{id}")))
    }

    /// The trailing id segment.
    pub fn id(&self) -> &str {
        &self.0[STORES.len() + 1..]
    }

    pub fn document(&self, document: &str) -> Result<DocumentName> {
        let id = document
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_prefix(DOCUMENTS))
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(document);
        check_segment(document, id)?;
        Ok(DocumentName(format!("{}/{DOCUMENTS}/{id}", self.0)))
    }
}

name_accessors!(StoreName);

/// `fileSearchStores/{store}/documents/{document}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentName(String);

impl DocumentName {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let parts: Vec<&str> = raw.split('/').collect();
        match parts.as_slice() {
            [STORES, store, DOCUMENTS, _document] => {
                StoreName::parse(store).and_then(|s| s.document(raw))
            }
            _ => Err(FileSearchError::invalid_name(
                raw,
                "expected fileSearchStores/{store}/documents/{document}",
            )),
        }
    }

    pub fn store(&self) -> StoreName {
        let end = self.0.find(&format!("/{DOCUMENTS}/")).unwrap_or(self.0.len());
        StoreName(self.0[..end].to_string())
    }
}

name_accessors!(DocumentName);

/// `files/{file}`, the identifier the upload endpoint assigns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let id = raw
            .strip_prefix(FILES)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(raw);
        check_segment(raw, id)?;
        Ok(Self(format!("{FILES}/{id}")))
    }
}

name_accessors!(FileName);

/// Long-running operation name. The provider owns its layout
/// (`fileSearchStores/s/operations/o`, `.../upload/operations/o`), so only
/// path safety is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationName(String);

impl OperationName {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim().trim_start_matches('/');
        if raw.is_empty() {
            return Err(FileSearchError::invalid_name(raw, "empty operation name"));
        }
        for segment in raw.split('/') {
            check_segment(raw, segment)?;
        }
        Ok(Self(raw.to_string()))
    }
}

name_accessors!(OperationName);

/// `models/{model}`, e.g. `models/gemini-2.5-flash`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let id = raw
            .strip_prefix(MODELS)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(raw);
        check_segment(raw, id)?;
        Ok(Self(format!("{MODELS}/{id}")))
    }

    /// The bare model id, as listings show it
    pub fn id(&self) -> &str {
        &self.0[MODELS.len() + 1..]
    }
}

name_accessors!(ModelName);

macro_rules! string_conversions {
    ($($ty:ident),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = FileSearchError;

                fn try_from(value: String) -> Result<Self> {
                    Self::parse(&value)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> String {
                    value.0
                }
            }
        )*
    };
}

string_conversions!(StoreName, DocumentName, FileName, OperationName, ModelName);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_name_normalizes_bare_id() {
        let bare = StoreName::parse("my-store-1").unwrap();
        let full = StoreName::parse("fileSearchStores/my-store-1").unwrap();
        assert_eq!(bare, full);
        assert_eq!(bare.as_str(), "fileSearchStores/my-store-1");
        assert_eq!(bare.id(), "my-store-1");
    }

    #[test]
    fn test_store_name_rejects_path_tricks() {
        assert!(StoreName::parse("").is_err());
        assert!(StoreName::parse("fileSearchStores/").is_err());
        assert!(StoreName::parse("a/b").is_err());
        assert!(StoreName::parse("..").is_err());
        assert!(StoreName::parse("store?force=true").is_err());
        assert!(StoreName::parse("with space").is_err());
    }

    #[test]
    fn test_document_name_from_store() {
        let store = StoreName::parse("s1").unwrap();
        let doc = store.document("d1").unwrap();
        assert_eq!(doc.as_str(), "fileSearchStores/s1/documents/d1");
        assert_eq!(store.document(doc.as_str()).unwrap(), doc);
        assert_eq!(doc.store(), store);
    }

    #[test]
    fn test_document_name_parse() {
        let doc = DocumentName::parse("fileSearchStores/s1/documents/d-9").unwrap();
        assert_eq!(doc.store().id(), "s1");
        assert!(DocumentName::parse("fileSearchStores/s1").is_err());
        assert!(DocumentName::parse("files/abc").is_err());
    }

    #[test]
    fn test_file_name_normalizes() {
        assert_eq!(FileName::parse("abc123").unwrap().as_str(), "files/abc123");
        assert_eq!(FileName::parse("files/abc123").unwrap().as_str(), "files/abc123");
        assert!(FileName::parse("files/").is_err());
    }

    #[test]
    fn test_operation_name_keeps_provider_layout() {
        let op = OperationName::parse("/fileSearchStores/s/upload/operations/op-1").unwrap();
        assert_eq!(op.as_str(), "fileSearchStores/s/upload/operations/op-1");
        assert!(OperationName::parse("fileSearchStores/../secrets").is_err());
        assert!(OperationName::parse("   ").is_err());
    }

    #[test]
    fn test_model_name_normalizes() {
        let model = ModelName::parse("gemini-2.5-flash").unwrap();
        assert_eq!(model.as_str(), "models/gemini-2.5-flash");
        assert_eq!(model.id(), "gemini-2.5-flash");
        assert_eq!(ModelName::parse("models/gemini-2.5-pro").unwrap().id(), "gemini-2.5-pro");
        assert!(ModelName::parse("gemini:generateContent").is_err());
        assert!(ModelName::parse("models/").is_err());
    }

    #[test]
    fn test_names_serde_as_strings() {
        let store: StoreName = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(serde_json::to_string(&store).unwrap(), "\"fileSearchStores/abc\"");
        assert!(serde_json::from_str::<FileName>("\"a b\"").is_err());
    }
}
