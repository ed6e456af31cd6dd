//! Options controlling a synthesis run.

use serde::{Deserialize, Serialize};

/// What the walker does with a field whose annotation cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedAnnotationPolicy {
    /// Report a diagnostic and leave the field out of the model.
    #[default]
    Skip,
    /// Report a diagnostic and keep the field under its declared name, without directives.
    FallbackToName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Skip meta field detection; every record is treated as having no meta fields.
    #[serde(default)]
    pub disable_meta_fields_detection: bool,

    #[serde(default)]
    pub malformed_annotation: MalformedAnnotationPolicy,

    /// Name of the reserved top-level `map<string, bool>` field used as index registry.
    #[serde(default = "default_reserved_index_field")]
    pub reserved_index_field: String,

    /// Attribute the Rust source inspector reads annotations from.
    #[serde(default = "default_annotation_attribute")]
    pub annotation_attribute: String,

    /// Collection name written into the model. Defaults to the record name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,

    /// Documents live in a collection nested under a parent document.
    #[serde(default)]
    pub subcollection: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            disable_meta_fields_detection: false,
            malformed_annotation: MalformedAnnotationPolicy::default(),
            reserved_index_field: default_reserved_index_field(),
            annotation_attribute: default_annotation_attribute(),
            collection_name: None,
            subcollection: false,
        }
    }
}

fn default_reserved_index_field() -> String {
    "Indexes".to_string()
}

fn default_annotation_attribute() -> String {
    "store".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SynthesisOptions::default();
        assert!(!options.disable_meta_fields_detection);
        assert_eq!(options.malformed_annotation, MalformedAnnotationPolicy::Skip);
        assert_eq!(options.reserved_index_field, "Indexes");
        assert_eq!(options.annotation_attribute, "store");
        assert_eq!(options.collection_name, None);
        assert!(!options.subcollection);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options: SynthesisOptions = toml::from_str(
            r#"
            disable_meta_fields_detection = true
            malformed_annotation = "fallback_to_name"
            collection_name = "people"
            subcollection = true
            "#,
        )
        .unwrap();
        assert!(options.disable_meta_fields_detection);
        assert_eq!(options.malformed_annotation, MalformedAnnotationPolicy::FallbackToName);
        assert_eq!(options.reserved_index_field, "Indexes");
        assert_eq!(options.collection_name.as_deref(), Some("people"));
        assert!(options.subcollection);
    }
}
