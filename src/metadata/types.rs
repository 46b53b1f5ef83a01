use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DEFAULT_PLATFORM;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Basic properties of an already-stored product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub mode: String,
}

impl ImageInfo {
    pub fn check(&self) -> Result<(), MetadataError> {
        if self.width == 0 || self.height == 0 {
            return Err(MetadataError::InvalidInput(format!(
                "image dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.format.trim().is_empty() {
            return Err(MetadataError::InvalidInput(
                "image format is missing".to_string(),
            ));
        }
        if self.mode.trim().is_empty() {
            return Err(MetadataError::InvalidInput(
                "image color mode is missing".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub category: Option<String>,
    pub platform: String,
    pub style: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext {
            category: None,
            platform: DEFAULT_PLATFORM.to_string(),
            style: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

impl RequestContext {
    /// Blank optional values are treated as absent.
    pub fn new(category: Option<String>, platform: &str, style: Option<String>) -> Self {
        RequestContext {
            category: non_blank(category),
            platform: platform.trim().to_string(),
            style: non_blank(style),
        }
    }

    pub fn check(&self) -> Result<(), MetadataError> {
        if self.platform.trim().is_empty() {
            return Err(MetadataError::InvalidInput(
                "platform must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Typed form of the listing schema, used where this crate builds metadata itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingMetadata {
    pub title: String,
    pub bullets: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ListingMetadata {
    pub fn into_object(self) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert("title".to_string(), Value::String(self.title));
        object.insert(
            "bullets".to_string(),
            Value::Array(self.bullets.into_iter().map(Value::String).collect()),
        );
        object.insert("description".to_string(), Value::String(self.description));
        object.insert(
            "tags".to_string(),
            Value::Array(self.tags.into_iter().map(Value::String).collect()),
        );
        object.insert("attributes".to_string(), Value::Object(self.attributes));
        object
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPath {
    Generated,
    Repaired,
    Fallback,
}

impl GenerationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPath::Generated => "generated",
            GenerationPath::Repaired => "repaired",
            GenerationPath::Fallback => "fallback",
        }
    }

    pub fn ai_used(&self) -> bool {
        !matches!(self, GenerationPath::Fallback)
    }
}

/// Final orchestration result: the schema-valid object plus provenance.
///
/// Remote objects are kept as-is (extra keys included); `ai_used` is written
/// into the object exactly once, when the result is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMetadata {
    object: Map<String, Value>,
    path: GenerationPath,
}

impl GeneratedMetadata {
    pub fn new(mut object: Map<String, Value>, path: GenerationPath) -> Self {
        object.insert("ai_used".to_string(), Value::Bool(path.ai_used()));
        GeneratedMetadata { object, path }
    }

    pub fn ai_used(&self) -> bool {
        self.path.ai_used()
    }

    pub fn path(&self) -> GenerationPath {
        self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.object.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        if key == "ai_used" {
            return;
        }
        self.object.insert(key.to_string(), value);
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}
