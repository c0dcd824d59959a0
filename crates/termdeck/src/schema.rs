//! JSON Schema for the deck configuration file.
//!
//! schemars emits draft 2020-12; most YAML editors and language servers still
//! expect draft-07, so the schema is rewritten before it is printed.

use schemars::schema_for;
use serde_json::{Map, Value};

use termdeck_core::DeckConfig;

const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Draft-07 schema of [`DeckConfig`].
pub fn config_schema() -> Value {
    let schema = schema_for!(DeckConfig);
    to_draft07(schema.to_value())
}

/// Rewrite a draft 2020-12 schema as draft-07: `$defs` becomes
/// `definitions` and every `$ref` follows.
pub fn to_draft07(mut schema: Value) -> Value {
    if let Value::Object(root) = &mut schema {
        if let Some(defs) = root.remove("$defs") {
            root.insert("definitions".to_string(), defs);
        }
        root.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
        rewrite_refs(root);
    }
    schema
}

fn rewrite_refs(object: &mut Map<String, Value>) {
    for (key, value) in object.iter_mut() {
        match value {
            Value::String(target) if key == "$ref" => {
                if let Some(name) = target.strip_prefix("#/$defs/") {
                    *target = format!("#/definitions/{name}");
                }
            }
            Value::Object(nested) => rewrite_refs(nested),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(nested) = item {
                        rewrite_refs(nested);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defs_become_definitions() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$defs": {"Cell": {"type": "object"}},
            "properties": {
                "cell": {"$ref": "#/$defs/Cell"},
                "cells": {"type": "array", "items": {"$ref": "#/$defs/Cell"}},
                "either": {"oneOf": [{"$ref": "#/$defs/Cell"}, {"type": "null"}]}
            }
        });

        let result = to_draft07(schema);
        assert!(result["$defs"].is_null());
        assert_eq!(result["$schema"], DRAFT_07);
        assert!(result["definitions"]["Cell"].is_object());
        assert_eq!(result["properties"]["cell"]["$ref"], "#/definitions/Cell");
        assert_eq!(
            result["properties"]["cells"]["items"]["$ref"],
            "#/definitions/Cell"
        );
        assert_eq!(
            result["properties"]["either"]["oneOf"][0]["$ref"],
            "#/definitions/Cell"
        );
    }

    #[test]
    fn test_external_refs_untouched() {
        let result = to_draft07(json!({"$ref": "https://example.com/other.json"}));
        assert_eq!(result["$ref"], "https://example.com/other.json");
    }

    #[test]
    fn test_config_schema_sections() {
        let schema = config_schema();
        let properties = schema["properties"].as_object().unwrap();
        for section in ["deck", "session", "terminal", "capture", "thumbnail"] {
            assert!(properties.contains_key(section), "missing {section}");
        }
        assert!(!schema.to_string().contains("#/$defs/"));
    }
}
