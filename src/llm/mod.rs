pub mod openai;

use async_trait::async_trait;

pub use openai::OpenAiClient;

/// What a remote text capability produced for a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Text(String),
    /// No credential or capability configured.
    Unavailable,
    /// Network, timeout, auth or API error. The reason is for logs only.
    Failed(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> GenerationOutcome;
}

#[async_trait]
pub trait JsonRepairer: Send + Sync {
    async fn repair(&self, original_text: &str, schema_description: &str) -> GenerationOutcome;
}
