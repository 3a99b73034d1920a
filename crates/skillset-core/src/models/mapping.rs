//! Field mappings wiring a skill's parameters to document paths

use serde::{Deserialize, Serialize};

/// Maps a skill input parameter to a source path in the enriched document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFieldMappingEntry {
    /// Name of the skill parameter being fed
    pub name: String,
    /// Source path expression, e.g. `/document/content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
    /// Nested inputs, used when building complex types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputFieldMappingEntry>,
}

impl InputFieldMappingEntry {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            source_context: None,
            inputs: Vec::new(),
        }
    }

    /// Build a complex input from nested entries evaluated under `source_context`
    pub fn nested(
        name: impl Into<String>,
        source_context: impl Into<String>,
        inputs: Vec<InputFieldMappingEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            source: None,
            source_context: Some(source_context.into()),
            inputs,
        }
    }
}

/// Maps a skill output to a field name in the enriched document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFieldMappingEntry {
    /// Name of the output produced by the skill
    pub name: String,
    /// Field the output is written to; defaults to `name` on the service side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
}

impl OutputFieldMappingEntry {
    pub fn new(name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_name: Some(target_name.into()),
        }
    }

    /// Output written under its own name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_mapping_wire_shape() {
        let entry = InputFieldMappingEntry::new("text", "/document/content");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"name": "text", "source": "/document/content"})
        );
    }

    #[test]
    fn test_nested_input_mapping() {
        let entry = InputFieldMappingEntry::nested(
            "address",
            "/document/addresses/*",
            vec![InputFieldMappingEntry::new("city", "/document/addresses/*/city")],
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["sourceContext"], "/document/addresses/*");
        assert!(value.get("source").is_none());
        assert_eq!(value["inputs"][0]["name"], "city");
    }

    #[test]
    fn test_output_mapping_target_name() {
        let entry = OutputFieldMappingEntry::new("organizations", "organizationsS1");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"name": "organizations", "targetName": "organizationsS1"})
        );

        let parsed: OutputFieldMappingEntry =
            serde_json::from_value(json!({"name": "entities"})).unwrap();
        assert_eq!(parsed, OutputFieldMappingEntry::named("entities"));
    }
}
