//! Synthesized schema model handed to renderers.

use convert_case::{Case, Casing};
use serde::Serialize;

use crate::types::SourcePosition;

/// How identifier values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Callers supply identifier values.
    Manual,
    /// The store generates identifier values.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    /// Index name, unique within the schema.
    pub name: String,
    pub field_path: String,
    pub storage_key: String,
}

/// One flattened field of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRecord {
    /// Dot-joined declared names, e.g. `profile.address.city`.
    pub logical_path: String,
    /// Dot-joined storage names. Absent for the document identifier, which is never stored as a field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Storage path after duplicate disambiguation; registries refer to fields by this key.
    /// The document identifier uses its logical path and never takes part in disambiguation.
    pub storage_key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Logical paths of optional ancestors, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub optional_ancestors: Vec<String>,
    pub is_identifier: bool,
    pub is_document_id: bool,
    pub is_unique: bool,
    pub is_sequence: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDescriptor>,
    #[serde(skip)]
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierDescriptor {
    pub field_name: String,
    pub logical_path: String,
    pub field_type: String,
    pub generation: GenerationMode,
    /// Lower camel case accessor derived from the field name.
    pub accessor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetaFields {
    pub enabled: bool,
    /// Declared names of the matched meta fields, in reserved-table order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl MetaFields {
    pub fn disabled() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub field_path: String,
    pub storage_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UniqueRegistry {
    pub entries: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexRegistry {
    /// Set when the record declares the reserved index field.
    pub enabled: bool,
    /// Storage name of the reserved index field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<String>,
    pub entries: Vec<RegistryEntry>,
}

/// Immutable result of synthesizing one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaModel {
    record: String,
    collection_name: String,
    is_sub_collection: bool,
    fields: Vec<FieldRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<IdentifierDescriptor>,
    meta_fields: MetaFields,
    unique: UniqueRegistry,
    indexes: IndexRegistry,
    has_sequence_field: bool,
    has_optional_nested_field: bool,
}

impl SchemaModel {
    pub(crate) fn new(parts: SchemaParts) -> Self {
        Self {
            record: parts.record,
            collection_name: parts.collection_name,
            is_sub_collection: parts.is_sub_collection,
            fields: parts.fields,
            identifier: parts.identifier,
            meta_fields: parts.meta_fields,
            unique: parts.unique,
            indexes: parts.indexes,
            has_sequence_field: parts.has_sequence_field,
            has_optional_nested_field: parts.has_optional_nested_field,
        }
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    /// Collection the documents live in; the record name unless overridden.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Whether the collection is nested under a parent document.
    pub fn is_sub_collection(&self) -> bool {
        self.is_sub_collection
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn field(&self, logical_path: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|field| field.logical_path == logical_path)
    }

    pub fn identifier(&self) -> Option<&IdentifierDescriptor> {
        self.identifier.as_ref()
    }

    pub fn meta_fields(&self) -> &MetaFields {
        &self.meta_fields
    }

    pub fn unique(&self) -> &UniqueRegistry {
        &self.unique
    }

    pub fn indexes(&self) -> &IndexRegistry {
        &self.indexes
    }

    pub fn has_sequence_field(&self) -> bool {
        self.has_sequence_field
    }

    pub fn has_optional_nested_field(&self) -> bool {
        self.has_optional_nested_field
    }

    /// Pretty JSON rendering, stable across runs for the same input.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// File name used when the model is written to disk, e.g. `user_profile.schema.json`.
    pub fn snapshot_file_name(&self) -> String {
        snapshot_file_name(&self.record)
    }
}

/// Snapshot file name for a record name, available before synthesis.
pub fn snapshot_file_name(record: &str) -> String {
    format!("{}.schema.json", record.to_case(Case::Snake))
}

/// Pieces collected by the pipeline before the model is frozen.
#[derive(Debug, Default)]
pub(crate) struct SchemaParts {
    pub record: String,
    pub collection_name: String,
    pub is_sub_collection: bool,
    pub fields: Vec<FieldRecord>,
    pub identifier: Option<IdentifierDescriptor>,
    pub meta_fields: MetaFields,
    pub unique: UniqueRegistry,
    pub indexes: IndexRegistry,
    pub has_sequence_field: bool,
    pub has_optional_nested_field: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_file_name_is_snake_case() {
        let model = SchemaModel::new(SchemaParts {
            record: "UserProfile".to_string(),
            ..Default::default()
        });
        assert_eq!(model.snapshot_file_name(), "user_profile.schema.json");
        assert!(!model.has_sequence_field());
    }

    #[test]
    fn test_identifier_is_omitted_from_json_when_absent() {
        let model = SchemaModel::new(SchemaParts {
            record: "Note".to_string(),
            ..Default::default()
        });
        let json = model.to_json().unwrap();
        assert!(!json.contains("\"identifier\""));
        assert!(json.contains("\"record\": \"Note\""));
    }
}
