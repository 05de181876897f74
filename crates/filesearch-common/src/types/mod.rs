//! Provider wire types and resource names
//!
//! Field names follow the provider's JSON (camelCase). int64 fields arrive as
//! JSON strings and are decoded into integers by [`int64`].

mod metadata;
mod names;
mod operation;
mod resources;
mod search;

pub use metadata::{
    validate_custom_metadata, CustomMetadata, MetadataValue, StringList, MAX_CUSTOM_METADATA,
};
pub use names::{DocumentName, FileName, ModelName, OperationName, StoreName};
pub use operation::{Operation, OperationError};
pub use resources::{
    ChunkingConfig, Document, DocumentList, DocumentState, FileResource, Store, StoreList,
    DEFAULT_MAX_OVERLAP_TOKENS, DEFAULT_MAX_TOKENS_PER_CHUNK,
};
pub use search::{
    Candidate, Content, GenerateContentResponse, GroundingMetadata, Model, ModelList,
    ModelSummary, Part, PromptFeedback, SearchAnswer, DEFAULT_SEARCH_MODEL, NO_ANSWER,
};

/// Serde helpers for int64 values, which the provider encodes as strings.
pub mod int64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    fn to_u64<E: de::Error>(raw: Raw) -> Result<u64, E> {
        match raw {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| E::custom(format!("invalid int64 string: {s:?}"))),
        }
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        to_u64(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::{to_u64, Raw};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_str(&v.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(to_u64)
                .transpose()
        }
    }
}
