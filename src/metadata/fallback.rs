use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};

use crate::metadata::types::{ImageInfo, ListingMetadata, RequestContext};

const DEFAULT_CATEGORY: &str = "Product";
const DEFAULT_STYLE: &str = "stylish";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

const DESCRIPTION_TEMPLATE: &str = "Discover this {style} {category_lower}, presented for {platform} shoppers. \
The product photo is a {width}x{height} {format} image in {mode} color mode, \
giving buyers a clear look at the details. \
A dependable choice for everyday use that fits naturally into any collection.";

fn capitalize(value: &str) -> String {
    let lowered = value.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Fills the template in one pass, so substituted values are never rescanned.
fn render_description(fields: &[(&str, String)]) -> String {
    let values: HashMap<&str, &str> = fields
        .iter()
        .map(|(key, value)| (*key, value.as_str()))
        .collect();
    PLACEHOLDER
        .replace_all(DESCRIPTION_TEMPLATE, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Builds schema-valid listing metadata from local inputs only.
///
/// Deterministic: identical inputs always give identical output.
pub fn generate_fallback(info: &ImageInfo, context: &RequestContext) -> ListingMetadata {
    let category = context.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
    let style = context.style.as_deref().unwrap_or(DEFAULT_STYLE);
    let format = info.format.as_str();

    let title = format!("{} {} — {}", capitalize(style), category, format);

    let description = render_description(&[
        ("style", style.to_lowercase()),
        ("category_lower", category.to_lowercase()),
        ("platform", context.platform.clone()),
        ("width", info.width.to_string()),
        ("height", info.height.to_string()),
        ("format", format.to_string()),
        ("mode", info.mode.clone()),
    ]);

    let bullets = vec![
        format!("{} design perfect for everyday use.", capitalize(style)),
        format!(
            "Made from quality {} materials for lasting performance.",
            format.to_lowercase()
        ),
        format!(
            "Dimensions: {}x{} px · Color mode: {}",
            info.width, info.height, info.mode
        ),
    ];

    let tags = vec![
        category.to_lowercase(),
        style.to_lowercase(),
        format.to_lowercase(),
    ];

    let mut attributes = Map::new();
    attributes.insert("width".to_string(), json!(info.width));
    attributes.insert("height".to_string(), json!(info.height));
    attributes.insert("format".to_string(), Value::String(format.to_string()));
    attributes.insert("color_mode".to_string(), Value::String(info.mode.clone()));

    ListingMetadata {
        title,
        bullets,
        description,
        tags,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::schema::validate_metadata;

    fn info(width: u32, height: u32, format: &str, mode: &str) -> ImageInfo {
        ImageInfo {
            width,
            height,
            format: format.to_string(),
            mode: mode.to_string(),
        }
    }

    #[test]
    fn output_always_passes_validation() {
        let infos = [
            info(400, 300, "JPEG", "RGB"),
            info(1, 1, "PNG", "RGBA"),
            info(4096, 2160, "unknown", "L"),
        ];
        let contexts = [
            RequestContext::default(),
            RequestContext::new(Some("Handmade Mug".to_string()), "etsy", None),
            RequestContext::new(None, "amazon", Some("RUSTIC".to_string())),
            RequestContext::new(Some("Ü-Boot Lamp".to_string()), "shopify", Some("ärmlich".to_string())),
        ];
        for info in &infos {
            for context in &contexts {
                let object = Value::Object(generate_fallback(info, context).into_object());
                assert!(validate_metadata(&object).is_ok(), "{object}");
            }
        }
    }

    #[test]
    fn builds_three_bullets_from_style_format_and_dimensions() {
        let metadata = generate_fallback(
            &info(400, 300, "JPEG", "RGB"),
            &RequestContext::new(Some("Handmade Mug".to_string()), "etsy", Some("rustic".to_string())),
        );
        assert_eq!(metadata.title, "Rustic Handmade Mug — JPEG");
        assert_eq!(metadata.bullets.len(), 3);
        assert!(metadata.bullets[0].starts_with("Rustic design"));
        assert!(metadata.bullets[1].contains("jpeg"));
        assert_eq!(metadata.bullets[2], "Dimensions: 400x300 px · Color mode: RGB");
        assert!(metadata.description.contains("etsy shoppers"));
        assert!(!metadata.description.contains('{'));
    }

    #[test]
    fn braces_in_caller_text_are_kept_literally() {
        let metadata = generate_fallback(
            &info(400, 300, "JPEG", "RGB"),
            &RequestContext::new(
                Some("{platform} Mug".to_string()),
                "etsy",
                Some("{mode} {platform}".to_string()),
            ),
        );
        assert!(
            metadata
                .description
                .starts_with("Discover this {mode} {platform} {platform} mug, presented for etsy shoppers."),
            "{}",
            metadata.description
        );
        assert!(metadata.description.contains("in RGB color mode"));
    }

    #[test]
    fn tags_include_lowercased_category_and_style() {
        let metadata = generate_fallback(
            &info(10, 20, "PNG", "RGBA"),
            &RequestContext::new(Some("Wall Art".to_string()), "generic", Some("Bold".to_string())),
        );
        assert_eq!(metadata.tags, vec!["wall art", "bold", "png"]);

        let defaults = generate_fallback(&info(10, 20, "PNG", "RGBA"), &RequestContext::default());
        assert_eq!(defaults.tags, vec!["product", "stylish", "png"]);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let image = info(640, 480, "WEBP", "RGB");
        let context = RequestContext::new(Some("Vase".to_string()), "etsy", None);
        let first = generate_fallback(&image, &context);
        let second = generate_fallback(&image, &context);
        assert_eq!(first, second);
        assert_eq!(first.attributes["width"], json!(640));
        assert_eq!(first.attributes["height"], json!(480));
        assert_eq!(first.attributes["format"], json!("WEBP"));
        assert_eq!(first.attributes["color_mode"], json!("RGB"));
    }
}
