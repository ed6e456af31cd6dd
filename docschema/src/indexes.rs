//! Unique and index registries.

use std::collections::{BTreeMap, BTreeSet};

use crate::annotation::AnnotationDirectives;
use crate::errors::SchemaError;
use crate::model::{FieldRecord, IndexDescriptor, IndexRegistry, RegistryEntry, UniqueRegistry};
use crate::types::FieldDefinition;

/// Hands out names that are unique within one schema.
///
/// The first request for a name gets it unchanged; later requests get `_2`,
/// `_3`, ... in request order, skipping suffixed names that are already taken.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: BTreeSet<String>,
    last_suffix: BTreeMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_string()) {
            return name.to_string();
        }

        let mut suffix = self.last_suffix.get(name).copied().unwrap_or(1);
        loop {
            suffix += 1;
            let candidate = format!("{name}_{suffix}");
            if self.taken.insert(candidate.clone()) {
                self.last_suffix.insert(name.to_string(), suffix);
                return candidate;
            }
        }
    }
}

/// Collects unique constraints and index declarations in field order.
#[derive(Debug, Default)]
pub struct IndexAggregator {
    storage_keys: NameAllocator,
    index_names: NameAllocator,
    unique: UniqueRegistry,
    indexes: IndexRegistry,
}

impl IndexAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the storage key for a field about to be recorded.
    pub fn storage_key(&mut self, storage_path: &str) -> String {
        self.storage_keys.allocate(storage_path)
    }

    /// Forward the unique and index directives of an ordinary field.
    pub fn register_field(
        &mut self,
        record: &mut FieldRecord,
        field: &FieldDefinition,
        directives: &AnnotationDirectives,
    ) -> Result<(), SchemaError> {
        if directives.unique {
            if !field.ty.is_string() {
                return Err(SchemaError::UnsupportedUniqueFieldType {
                    position: field.position.clone(),
                    field: record.logical_path.clone(),
                    actual: field.ty.type_name(),
                });
            }
            record.is_unique = true;
            self.unique.entries.push(RegistryEntry {
                field_path: record.logical_path.clone(),
                storage_name: record.storage_key.clone(),
            });
        }

        if let Some(index) = &directives.index {
            let requested = index.name.as_deref().unwrap_or(&record.storage_key);
            let name = self.index_names.allocate(requested);
            record.indexes.push(IndexDescriptor {
                name: name.clone(),
                field_path: record.logical_path.clone(),
                storage_key: record.storage_key.clone(),
            });
            self.indexes.entries.push(RegistryEntry {
                field_path: record.logical_path.clone(),
                storage_name: name,
            });
        }

        Ok(())
    }

    /// Enable index support through the reserved registry field.
    /// The field's own storage name overrides its declared name.
    pub fn enable_registry(&mut self, field: &FieldDefinition, directives: &AnnotationDirectives) {
        self.indexes.enabled = true;
        let name = directives.storage_segment().unwrap_or(&field.name);
        self.indexes.registry_name = Some(name.to_string());
    }

    pub fn finish(self) -> (UniqueRegistry, IndexRegistry) {
        (self.unique, self.indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::parse_annotation;
    use crate::types::{DeclaredType, SourcePosition};

    fn definition(name: &str, ty: DeclaredType) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            ty,
            annotation: None,
            declaration_index: 0,
            position: SourcePosition::new("order.rs", 7, 5),
        }
    }

    fn record(path: &str, key: &str) -> FieldRecord {
        FieldRecord {
            logical_path: path.to_string(),
            storage_path: Some(key.to_string()),
            storage_key: key.to_string(),
            type_name: "string".to_string(),
            optional_ancestors: Vec::new(),
            is_identifier: false,
            is_document_id: false,
            is_unique: false,
            is_sequence: false,
            indexes: Vec::new(),
            position: SourcePosition::default(),
        }
    }

    #[test]
    fn test_allocator_suffixes_in_request_order() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("status"), "status");
        assert_eq!(names.allocate("status_2"), "status_2");
        assert_eq!(names.allocate("status"), "status_3");
        assert_eq!(names.allocate("status"), "status_4");
        assert_eq!(names.allocate("state"), "state");
    }

    #[test]
    fn test_unique_on_string_is_registered() {
        let mut aggregator = IndexAggregator::new();
        let mut field = record("Email", "email");
        let directives = parse_annotation(Some("email,unique")).unwrap();
        aggregator
            .register_field(&mut field, &definition("Email", DeclaredType::string()), &directives)
            .unwrap();

        assert!(field.is_unique);
        let (unique, _) = aggregator.finish();
        assert_eq!(unique.entries[0].storage_name, "email");
    }

    #[test]
    fn test_unique_on_non_string_is_rejected() {
        let mut aggregator = IndexAggregator::new();
        let mut field = record("Age", "age");
        let directives = parse_annotation(Some("age,unique")).unwrap();
        let err = aggregator
            .register_field(&mut field, &definition("Age", DeclaredType::integer()), &directives)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedUniqueFieldType { ref actual, .. } if actual == "int"));
    }

    #[test]
    fn test_index_names_default_and_override() {
        let mut aggregator = IndexAggregator::new();

        let mut name = record("Name", "name");
        let directives = parse_annotation(Some("name,index")).unwrap();
        aggregator
            .register_field(&mut name, &definition("Name", DeclaredType::string()), &directives)
            .unwrap();

        let mut nick = record("Nick", "nick");
        let directives = parse_annotation(Some("nick,index=name")).unwrap();
        aggregator
            .register_field(&mut nick, &definition("Nick", DeclaredType::string()), &directives)
            .unwrap();

        assert_eq!(name.indexes[0].name, "name");
        assert_eq!(nick.indexes[0].name, "name_2");

        let (_, indexes) = aggregator.finish();
        assert!(!indexes.enabled);
        let names: Vec<&str> = indexes.entries.iter().map(|e| e.storage_name.as_str()).collect();
        assert_eq!(names, vec!["name", "name_2"]);
    }

    #[test]
    fn test_registry_name_override() {
        let mut aggregator = IndexAggregator::new();
        let field = definition("Indexes", DeclaredType::map(DeclaredType::string(), DeclaredType::bool()));
        aggregator.enable_registry(&field, &parse_annotation(Some("search_terms")).unwrap());

        let (_, indexes) = aggregator.finish();
        assert!(indexes.enabled);
        assert_eq!(indexes.registry_name.as_deref(), Some("search_terms"));
    }
}
