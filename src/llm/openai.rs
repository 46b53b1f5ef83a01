use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::{GenerationOutcome, JsonRepairer, TextGenerator};
use crate::metadata::prompt::{build_repair_prompt, GENERATION_SYSTEM_PROMPT, REPAIR_SYSTEM_PROMPT};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

const ERROR_BODY_LOG_LIMIT: usize = 2000;

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_payload(payload: &Value) -> String {
    let model = payload
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let message_count = payload
        .get("messages")
        .and_then(|v| v.as_array())
        .map(|messages| messages.len())
        .unwrap_or(0);
    let temperature = payload
        .get("temperature")
        .and_then(|v| v.as_f64())
        .unwrap_or_default();

    format!(
        "model={}, messages={}, temperature={:.2}",
        model, message_count, temperature
    )
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (
            message,
            truncate_for_log(&value.to_string(), ERROR_BODY_LOG_LIMIT),
        );
    }

    (None, truncate_for_log(trimmed, ERROR_BODY_LOG_LIMIT))
}

fn extract_message_content(response: &Value) -> String {
    response
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// Serves as both the generation and the repair capability. An empty API key
/// makes every call report [`GenerationOutcome::Unavailable`].
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    repair_temperature: f32,
    max_tokens: u32,
    request_timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        OpenAiClient {
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: 0.6,
            repair_temperature: 0.0,
            max_tokens: 400,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        OpenAiClient {
            temperature: config.openai_temperature,
            repair_temperature: config.openai_repair_temperature,
            max_tokens: config.openai_max_tokens,
            request_timeout: config.llm_timeout(),
            ..OpenAiClient::new(
                &config.openai_api_key,
                &config.openai_base_url,
                &config.openai_model,
            )
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn call_api(&self, payload: &Value) -> Result<Value> {
        debug!("OpenAI request: {}", summarize_payload(payload));

        let response = get_http_client()
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("OpenAI API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "OpenAI request failed with status {}: {}",
                status,
                detail
            ));
        }

        let value = response.json::<Value>().await?;
        debug!("OpenAI response received for model={}", self.model);
        Ok(value)
    }

    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        operation: &str,
    ) -> GenerationOutcome {
        if !self.is_configured() {
            return GenerationOutcome::Unavailable;
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        });

        let result = log_llm_timing("openai", &self.model, operation, None, || async {
            let response = self.call_api(&payload).await?;
            let content = extract_message_content(&response);
            if content.is_empty() {
                warn!(
                    "OpenAI response had empty content: {}",
                    truncate_for_log(&response.to_string(), ERROR_BODY_LOG_LIMIT)
                );
                return Err(anyhow!("OpenAI returned an empty completion"));
            }
            Ok(content)
        })
        .await;

        match result {
            Ok(text) => GenerationOutcome::Text(text),
            Err(err) => {
                warn!("OpenAI {} call failed: {}", operation, err);
                GenerationOutcome::Failed(err.to_string())
            }
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        self.chat(
            GENERATION_SYSTEM_PROMPT,
            prompt,
            self.temperature,
            "openai:generate_metadata",
        )
        .await
    }
}

#[async_trait]
impl JsonRepairer for OpenAiClient {
    async fn repair(&self, original_text: &str, schema_description: &str) -> GenerationOutcome {
        let prompt = build_repair_prompt(original_text, schema_description);
        self.chat(
            REPAIR_SYSTEM_PROMPT,
            &prompt,
            self.repair_temperature,
            "openai:repair_metadata",
        )
        .await
    }
}
