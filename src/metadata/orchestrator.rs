use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::llm::{GenerationOutcome, JsonRepairer, TextGenerator};
use crate::metadata::fallback::generate_fallback;
use crate::metadata::prompt::{build_generation_prompt, repair_schema_description};
use crate::metadata::schema::{validate_metadata, SchemaViolation};
use crate::metadata::types::{
    GeneratedMetadata, GenerationPath, ImageInfo, MetadataError, RequestContext,
};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*[ \t]*\r?\n?(.*?)\s*```\s*$")
        .expect("code fence pattern is valid")
});

#[derive(Debug)]
enum FallbackReason {
    RemoteUnavailable,
    RemoteCallFailed(String),
    MalformedResponse(String),
    SchemaViolation(SchemaViolation),
}

impl FallbackReason {
    fn describe(&self) -> String {
        match self {
            FallbackReason::RemoteUnavailable => "remote generator unavailable".to_string(),
            FallbackReason::RemoteCallFailed(reason) => format!("remote call failed: {reason}"),
            FallbackReason::MalformedResponse(reason) => format!("malformed response: {reason}"),
            FallbackReason::SchemaViolation(violation) => format!("schema violation: {violation}"),
        }
    }
}

#[derive(Debug)]
enum Rejected {
    Malformed(String),
    Schema(SchemaViolation),
}

impl From<Rejected> for FallbackReason {
    fn from(rejected: Rejected) -> Self {
        match rejected {
            Rejected::Malformed(reason) => FallbackReason::MalformedResponse(reason),
            Rejected::Schema(violation) => FallbackReason::SchemaViolation(violation),
        }
    }
}

fn remote_text(outcome: GenerationOutcome) -> Result<String, FallbackReason> {
    match outcome {
        GenerationOutcome::Text(text) if text.trim().is_empty() => Err(
            FallbackReason::RemoteCallFailed("empty completion".to_string()),
        ),
        GenerationOutcome::Text(text) => Ok(text),
        GenerationOutcome::Unavailable => Err(FallbackReason::RemoteUnavailable),
        GenerationOutcome::Failed(reason) => Err(FallbackReason::RemoteCallFailed(reason)),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|inner| inner.as_str())
        .unwrap_or(raw)
}

/// Decodes remote text and checks it against the listing schema.
fn decode_listing(raw: &str) -> Result<Map<String, Value>, Rejected> {
    let value: Value = serde_json::from_str(strip_code_fence(raw).trim())
        .map_err(|err| Rejected::Malformed(err.to_string()))?;
    validate_metadata(&value).map_err(Rejected::Schema)?;
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(Rejected::Malformed("expected a JSON object".to_string())),
    }
}

/// Runs generate, validate, repair once, then falls back to the local template.
///
/// Capabilities are injected; without a generator every run takes the
/// fallback path. Each remote call is bounded by `timeout`, so a run never
/// waits longer than twice that on the network.
#[derive(Clone)]
pub struct MetadataOrchestrator {
    generator: Option<Arc<dyn TextGenerator>>,
    repairer: Option<Arc<dyn JsonRepairer>>,
    timeout: Duration,
}

impl MetadataOrchestrator {
    pub fn new(timeout: Duration) -> Self {
        MetadataOrchestrator {
            generator: None,
            repairer: None,
            timeout,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_repairer(mut self, repairer: Arc<dyn JsonRepairer>) -> Self {
        self.repairer = Some(repairer);
        self
    }

    async fn bounded<F>(&self, stage: &str, call: F) -> GenerationOutcome
    where
        F: Future<Output = GenerationOutcome>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Remote {} call exceeded {:.1}s timeout",
                    stage,
                    self.timeout.as_secs_f64()
                );
                GenerationOutcome::Failed(format!(
                    "{stage} timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                ))
            }
        }
    }

    async fn try_remote(
        &self,
        info: &ImageInfo,
        context: &RequestContext,
    ) -> Result<(Map<String, Value>, GenerationPath), FallbackReason> {
        let Some(generator) = &self.generator else {
            return Err(FallbackReason::RemoteUnavailable);
        };

        let prompt = build_generation_prompt(info, context);
        let raw = remote_text(self.bounded("generate", generator.generate(&prompt)).await)?;

        let rejected = match decode_listing(&raw) {
            Ok(object) => return Ok((object, GenerationPath::Generated)),
            Err(rejected) => rejected,
        };
        info!("Generated metadata rejected ({:?}); attempting repair", rejected);

        let Some(repairer) = &self.repairer else {
            return Err(rejected.into());
        };

        let schema = repair_schema_description();
        let repaired = match self.bounded("repair", repairer.repair(&raw, &schema)).await {
            // The generator answered, so a missing repairer here is a failure.
            GenerationOutcome::Unavailable => {
                return Err(FallbackReason::RemoteCallFailed(
                    "repair capability unavailable".to_string(),
                ))
            }
            outcome => remote_text(outcome)?,
        };

        // A second rejection is final; partially valid content is discarded.
        decode_listing(&repaired)
            .map(|object| (object, GenerationPath::Repaired))
            .map_err(FallbackReason::from)
    }

    pub async fn produce_metadata(
        &self,
        info: &ImageInfo,
        context: &RequestContext,
    ) -> Result<GeneratedMetadata, MetadataError> {
        info.check()?;
        context.check()?;

        match self.try_remote(info, context).await {
            Ok((object, path)) => {
                info!("Listing metadata produced via {} path", path.as_str());
                Ok(GeneratedMetadata::new(object, path))
            }
            Err(reason) => {
                if matches!(reason, FallbackReason::RemoteUnavailable) {
                    debug!("Using fallback: {}", reason.describe());
                } else {
                    warn!("Using fallback: {}", reason.describe());
                }
                let fallback = generate_fallback(info, context);
                Ok(GeneratedMetadata::new(
                    fallback.into_object(),
                    GenerationPath::Fallback,
                ))
            }
        }
    }
}
