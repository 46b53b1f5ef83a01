use crate::metadata::schema::{schema_description, schema_description_pretty};
use crate::metadata::types::{ImageInfo, RequestContext};

pub const GENERATION_SYSTEM_PROMPT: &str =
    "You are an assistant that returns a single valid JSON object given the user's request.";

pub const REPAIR_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that fixes JSON to match the requested schema.";

pub fn build_generation_prompt(info: &ImageInfo, context: &RequestContext) -> String {
    let category = context.category.as_deref().unwrap_or("N/A");
    let style_line = context
        .style
        .as_deref()
        .map(|style| format!(" Tone/style: {style}."))
        .unwrap_or_default();

    format!(
        "Produce a JSON object with keys: title (short string), bullets (array of 3 concise bullet points), \
description (short marketing paragraph), tags (array), and attributes (object), based on the following image metadata: \
width={}, height={}, format={}, mode={}. Category: {}. Platform: {}.{} \
The JSON must conform to this schema: {}. Return only a single valid JSON object.",
        info.width,
        info.height,
        info.format,
        info.mode,
        category,
        context.platform,
        style_line,
        schema_description()
    )
}

pub fn build_repair_prompt(invalid_text: &str, schema: &str) -> String {
    format!(
        "The user provided the following (possibly invalid) JSON for an ecommerce product listing metadata:\n\
{invalid_text}\n\n\
Please return a single valid JSON object that conforms to this schema:\n\
{schema}\n\
Return ONLY the JSON object, no explanation."
    )
}

/// Schema text handed to the repair capability.
pub fn repair_schema_description() -> String {
    schema_description_pretty()
}
