//! `generateContent` and model listing wire types
//!
//! Only the parts search reads are modelled. Grounding chunks are kept as
//! raw JSON since their shape varies by retrieval source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operation::OperationError;

/// Model used when a search names none
pub const DEFAULT_SEARCH_MODEL: &str = "gemini-2.5-flash";

/// Answer text when the model returned no text parts
pub const NO_ANSWER: &str = "No answer found.";

const GENERATE_CONTENT: &str = "generateContent";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Some gateways report failures inside a 200 body
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// What a search hands back to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnswer {
    pub answer: String,
    #[serde(default)]
    pub grounding_chunks: Vec<Value>,
    /// Distinct source URIs (or titles), first-seen order
    #[serde(default)]
    pub sources: Vec<String>,
}

impl GenerateContentResponse {
    /// Why the prompt was refused, if it was
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .filter(|r| !r.is_empty())
    }

    /// Answer and grounding of the first candidate.
    pub fn answer(&self) -> SearchAnswer {
        let Some(candidate) = self.candidates.first() else {
            return SearchAnswer {
                answer: NO_ANSWER.to_string(),
                grounding_chunks: Vec::new(),
                sources: Vec::new(),
            };
        };

        let answer = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        let grounding_chunks = candidate
            .grounding_metadata
            .as_ref()
            .map(|g| g.grounding_chunks.clone())
            .unwrap_or_default();

        let mut sources: Vec<String> = Vec::new();
        for chunk in &grounding_chunks {
            let Some(context) = chunk.get("retrievedContext") else {
                continue;
            };
            let source = context
                .get("uri")
                .or_else(|| context.get("title"))
                .and_then(Value::as_str);
            if let Some(source) = source {
                if !sources.iter().any(|s| s == source) {
                    sources.push(source.to_string());
                }
            }
        }

        SearchAnswer {
            answer: if answer.is_empty() {
                NO_ANSWER.to_string()
            } else {
                answer
            },
            grounding_chunks,
            sources,
        }
    }
}

/// Model resource from `GET /models`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A model that can answer searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    /// Bare id, without the `models/` prefix
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub supported_methods: Vec<String>,
}

impl Model {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self
                .name
                .strip_prefix("models/")
                .unwrap_or(&self.name)
                .to_string(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            supported_methods: self.supported_generation_methods.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_answer_joins_text_and_dedupes_sources() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Torque is"}, {"inlineData": {}}, {"text": "12 Nm."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"retrievedContext": {"uri": "manual.pdf", "text": "..."}},
                    {"retrievedContext": {"title": "errata.md"}},
                    {"retrievedContext": {"uri": "manual.pdf"}},
                    {"web": {"uri": "https://example.com"}}
                ]}
            }]
        }));

        let answer = response.answer();
        assert_eq!(answer.answer, "Torque is 12 Nm.");
        assert_eq!(answer.grounding_chunks.len(), 4);
        assert_eq!(answer.sources, ["manual.pdf", "errata.md"]);
    }

    #[test]
    fn test_answer_without_candidates() {
        let answer = parse(json!({})).answer();
        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.sources.is_empty());

        let empty_text = parse(json!({"candidates": [{"content": {"parts": []}}]})).answer();
        assert_eq!(empty_text.answer, NO_ANSWER);
    }

    #[test]
    fn test_block_reason() {
        let blocked = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert_eq!(blocked.block_reason(), Some("SAFETY"));
        assert_eq!(parse(json!({"promptFeedback": {}})).block_reason(), None);
    }

    #[test]
    fn test_answer_serializes_camel_case() {
        let value = serde_json::to_value(parse(json!({})).answer()).unwrap();
        assert!(value.get("groundingChunks").is_some());
        assert!(value.get("sources").is_some());
    }

    #[test]
    fn test_model_summary() {
        let list: ModelList = serde_json::from_value(json!({
            "models": [
                {"name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash",
                 "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
            ]
        }))
        .unwrap();

        let usable: Vec<_> = list
            .models
            .iter()
            .filter(|m| m.supports_generate_content())
            .map(Model::summary)
            .collect();
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].name, "gemini-2.5-flash");
        assert_eq!(usable[0].supported_methods, ["generateContent", "countTokens"]);
    }
}
