use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Long-running operation descriptor as returned by the provider.
///
/// Never mutated locally: a newer view only comes from re-fetching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// `google.rpc.Status` payload on a failed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Value>,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

impl Operation {
    /// Terminal once the provider reports `done`.
    pub fn is_terminal(&self) -> bool {
        self.done
    }

    /// The error payload of a finished operation. A not-yet-done operation
    /// never counts as failed, whatever else it carries.
    pub fn failure(&self) -> Option<&OperationError> {
        if self.done {
            self.error.as_ref()
        } else {
            None
        }
    }

    /// Name of the document the import produced, when the response carries one.
    pub fn document_name(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.get("documentName"))
            .and_then(Value::as_str)
    }
}
