use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::calculate_checksum;

/// A loaded source document, before chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub content: String,
    pub checksum: String,
    pub loaded_at: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: String) -> Self {
        let checksum = calculate_checksum(&content);
        Self {
            name: name.into(),
            content,
            checksum,
            loaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Length of the text in characters.
    pub fn text_length(&self) -> usize {
        self.content.chars().count()
    }
}

/// A contiguous span of document text, the unit of embedding.
///
/// Identity is the chunk's position in the sequence it was produced in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }
}
