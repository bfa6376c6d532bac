use serde::{Deserialize, Serialize};

/// Signature of a traded item: stable id plus an opaque metadata blob.
/// Two signatures match only when both fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl ItemKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: None,
        }
    }

    pub fn with_data(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Some(data.into()),
        }
    }

    /// Serialize for the store's item_config column
    pub fn to_config(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a stored item_config value
    pub fn from_config(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
