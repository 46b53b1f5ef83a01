use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub const REQUIRED_FIELDS: [&str; 3] = ["title", "bullets", "description"];

pub static METADATA_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "bullets": { "type": "array", "minItems": 1, "items": { "type": "string" } },
            "description": { "type": "string" },
            "tags": { "type": "array", "items": { "type": "string" } },
            "attributes": { "type": "object" }
        },
        "required": REQUIRED_FIELDS,
        "additionalProperties": true
    })
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SchemaViolation {
    pub field: Option<String>,
    pub message: String,
}

impl SchemaViolation {
    fn at(field: &str, message: String) -> Self {
        SchemaViolation {
            field: Some(field.to_string()),
            message,
        }
    }
}

pub fn schema_description() -> String {
    serde_json::to_string(&*METADATA_SCHEMA).unwrap_or_default()
}

pub fn schema_description_pretty() -> String {
    serde_json::to_string_pretty(&*METADATA_SCHEMA).unwrap_or_default()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_string_items(field: &str, items: &[Value]) -> Result<(), SchemaViolation> {
    for (index, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(SchemaViolation::at(
                field,
                format!(
                    "{field}[{index}] must be a string, got {}",
                    json_type_name(item)
                ),
            ));
        }
    }
    Ok(())
}

/// Checks a decoded value against the listing metadata schema.
///
/// Works on any JSON value and reports the first violation found. Unknown
/// keys are accepted.
pub fn validate_metadata(candidate: &Value) -> Result<(), SchemaViolation> {
    let Some(object) = candidate.as_object() else {
        return Err(SchemaViolation {
            field: None,
            message: format!(
                "metadata must be a JSON object, got {}",
                json_type_name(candidate)
            ),
        });
    };

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(SchemaViolation::at(
                field,
                format!("missing required property: {field}"),
            ));
        }
    }

    for field in ["title", "description"] {
        let value = &object[field];
        if !value.is_string() {
            return Err(SchemaViolation::at(
                field,
                format!("{field} must be a string, got {}", json_type_name(value)),
            ));
        }
    }

    let bullets = match &object["bullets"] {
        Value::Array(items) => items,
        other => {
            return Err(SchemaViolation::at(
                "bullets",
                format!("bullets must be an array, got {}", json_type_name(other)),
            ))
        }
    };
    if bullets.is_empty() {
        return Err(SchemaViolation::at(
            "bullets",
            "bullets must contain at least one item".to_string(),
        ));
    }
    check_string_items("bullets", bullets)?;

    if let Some(tags) = object.get("tags") {
        match tags {
            Value::Array(items) => check_string_items("tags", items)?,
            other => {
                return Err(SchemaViolation::at(
                    "tags",
                    format!("tags must be an array, got {}", json_type_name(other)),
                ))
            }
        }
    }

    if let Some(attributes) = object.get("attributes") {
        if !attributes.is_object() {
            return Err(SchemaViolation::at(
                "attributes",
                format!(
                    "attributes must be an object, got {}",
                    json_type_name(attributes)
                ),
            ));
        }
    }

    Ok(())
}

pub fn is_valid_metadata(candidate: &Value) -> (bool, Option<String>) {
    match validate_metadata(candidate) {
        Ok(()) => (true, None),
        Err(violation) => (false, Some(violation.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        json!({
            "title": "Stylish Ceramic Mug",
            "bullets": ["Handmade", "Microwave safe", "12 oz capacity"],
            "description": "A beautiful ceramic mug perfect for coffee lovers.",
            "tags": ["ceramic", "mug", "kitchen"],
            "attributes": { "color": "white", "material": "ceramic" }
        })
    }

    #[test]
    fn accepts_complete_listing() {
        assert_eq!(is_valid_metadata(&sample()), (true, None));
    }

    #[test]
    fn optional_fields_may_be_omitted_and_extras_are_allowed() {
        let candidate = json!({
            "title": "t",
            "bullets": ["b"],
            "description": "d",
            "price_hint": 12.5
        });
        assert!(validate_metadata(&candidate).is_ok());
    }

    #[test]
    fn removing_a_required_field_names_it() {
        for field in REQUIRED_FIELDS {
            let mut candidate = sample();
            candidate.as_object_mut().unwrap().remove(field);
            let (ok, err) = is_valid_metadata(&candidate);
            assert!(!ok);
            let err = err.unwrap();
            assert!(err.contains(field), "error '{err}' should mention {field}");
        }
    }

    #[test]
    fn non_object_values_are_reported_not_panicked_on() {
        for candidate in [
            json!("just text"),
            json!(42),
            json!(null),
            json!([1, 2]),
            json!(true),
        ] {
            let (ok, err) = is_valid_metadata(&candidate);
            assert!(!ok);
            assert!(!err.unwrap().is_empty());
        }
    }

    #[test]
    fn empty_object_is_missing_title_first() {
        let err = validate_metadata(&json!({})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("title"));
    }

    #[test]
    fn bullets_shape_is_enforced() {
        let mut candidate = sample();
        candidate["bullets"] = json!("one bullet");
        assert_eq!(
            validate_metadata(&candidate).unwrap_err().message,
            "bullets must be an array, got string"
        );

        candidate["bullets"] = json!([]);
        assert!(validate_metadata(&candidate)
            .unwrap_err()
            .message
            .contains("at least one"));

        candidate["bullets"] = json!(["ok", 3]);
        assert_eq!(
            validate_metadata(&candidate).unwrap_err().message,
            "bullets[1] must be a string, got number"
        );
    }

    #[test]
    fn title_and_description_must_be_strings() {
        let mut candidate = sample();
        candidate["title"] = json!(["not", "a", "string"]);
        assert_eq!(
            validate_metadata(&candidate).unwrap_err().field.as_deref(),
            Some("title")
        );

        let mut candidate = sample();
        candidate["description"] = Value::Null;
        assert_eq!(
            validate_metadata(&candidate).unwrap_err().field.as_deref(),
            Some("description")
        );
    }

    #[test]
    fn optional_fields_are_checked_when_present() {
        let mut candidate = sample();
        candidate["tags"] = json!({ "a": 1 });
        assert_eq!(
            validate_metadata(&candidate).unwrap_err().field.as_deref(),
            Some("tags")
        );

        let mut candidate = sample();
        candidate["tags"] = json!(["ok", null]);
        assert!(validate_metadata(&candidate).is_err());

        let mut candidate = sample();
        candidate["attributes"] = json!(["color", "white"]);
        assert_eq!(
            validate_metadata(&candidate).unwrap_err().field.as_deref(),
            Some("attributes")
        );
    }

    #[test]
    fn schema_description_lists_required_fields() {
        let description = schema_description();
        let parsed: Value = serde_json::from_str(&description).unwrap();
        assert_eq!(parsed["required"], json!(["title", "bullets", "description"]));
        assert!(schema_description_pretty().contains('\n'));
    }
}
