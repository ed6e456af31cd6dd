//! Recursive flattening of a record definition into field records.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::annotation::{AnnotationDirectives, parse_annotation};
use crate::config::{MalformedAnnotationPolicy, SynthesisOptions};
use crate::errors::{Diagnostic, SchemaError};
use crate::identifier::{document_id_record, resolve_identifier};
use crate::indexes::IndexAggregator;
use crate::meta_fields::same_name;
use crate::model::{FieldRecord, IdentifierDescriptor, MetaFields, SchemaParts};
use crate::types::{FieldDefinition, RecordDefinition};

/// Paths and optional ancestors of the record being walked.
/// Every nested record gets its own frame, so siblings never see each other's ancestors.
#[derive(Debug, Clone, Default)]
struct Frame {
    logical: String,
    storage: String,
    optional_ancestors: Vec<String>,
    depth: usize,
}

impl Frame {
    fn is_top_level(&self) -> bool {
        self.depth == 0
    }

    fn nested(&self, logical: String, storage: String, optional: bool) -> Self {
        let mut optional_ancestors = self.optional_ancestors.clone();
        if optional {
            optional_ancestors.push(logical.clone());
        }
        Self {
            logical,
            storage,
            optional_ancestors,
            depth: self.depth + 1,
        }
    }
}

/// Join path segments with dots, dropping empty segments.
pub fn join_path(parent: &str, segment: &str) -> String {
    match (parent.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}.{segment}"),
    }
}

pub(crate) struct Walker<'a> {
    root: &'a RecordDefinition,
    options: &'a SynthesisOptions,
    diagnostics: Vec<Diagnostic>,
    fields: Vec<FieldRecord>,
    logical_paths: BTreeSet<String>,
    identifier: Option<IdentifierDescriptor>,
    aggregator: IndexAggregator,
    has_sequence_field: bool,
    has_optional_nested_field: bool,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(root: &'a RecordDefinition, options: &'a SynthesisOptions) -> Self {
        Self {
            root,
            options,
            diagnostics: Vec::new(),
            fields: Vec::new(),
            logical_paths: BTreeSet::new(),
            identifier: None,
            aggregator: IndexAggregator::new(),
            has_sequence_field: false,
            has_optional_nested_field: false,
        }
    }

    /// Walk the whole record. Diagnostics are returned even when the walk fails.
    pub(crate) fn run(mut self, meta_fields: MetaFields) -> (Result<SchemaParts, SchemaError>, Vec<Diagnostic>) {
        let root = self.root;
        if let Err(err) = self.walk(root, &Frame::default()) {
            return (Err(err), self.diagnostics);
        }

        let (unique, indexes) = self.aggregator.finish();
        let parts = SchemaParts {
            record: self.root.name.clone(),
            collection_name: self.options.collection_name.clone().unwrap_or_else(|| self.root.name.clone()),
            is_sub_collection: self.options.subcollection,
            fields: self.fields,
            identifier: self.identifier,
            meta_fields,
            unique,
            indexes,
            has_sequence_field: self.has_sequence_field,
            has_optional_nested_field: self.has_optional_nested_field,
        };
        (Ok(parts), self.diagnostics)
    }

    fn walk(&mut self, record: &RecordDefinition, frame: &Frame) -> Result<(), SchemaError> {
        for field in record.fields_in_declaration_order() {
            let Some(directives) = self.directives_for(field, frame) else {
                continue;
            };

            let logical = join_path(&frame.logical, &field.name);
            let storage = join_path(&frame.storage, directives.storage_segment().unwrap_or(&field.name));

            // Nested records are always flattened; omission only applies to leaves.
            if let Some((nested, optional)) = field.ty.nested_record() {
                if optional {
                    self.has_optional_nested_field = true;
                }
                let child = frame.nested(logical, storage, optional);
                self.walk(nested, &child)?;
                continue;
            }

            if field.ty.is_sequence() {
                self.has_sequence_field = true;
            }

            if directives.is_omitted() {
                debug!("{}: skipping omitted field {logical}", field.position);
                continue;
            }

            if self.is_index_registry_field(field, &directives, frame) {
                debug!("{}: {logical} is the index registry field", field.position);
                self.aggregator.enable_registry(field, &directives);
                continue;
            }

            if directives.identifier.is_some() {
                let descriptor = resolve_identifier(field, &logical, &directives, self.identifier.as_ref())?;
                let record = document_id_record(&descriptor, field, frame.optional_ancestors.clone());
                self.push(record)?;
                self.identifier = Some(descriptor);
                continue;
            }

            let storage_key = self.aggregator.storage_key(&storage);
            let mut record = FieldRecord {
                logical_path: logical,
                storage_path: Some(storage),
                storage_key,
                type_name: field.ty.type_name(),
                optional_ancestors: frame.optional_ancestors.clone(),
                is_identifier: false,
                is_document_id: false,
                is_unique: false,
                is_sequence: field.ty.is_sequence(),
                indexes: Vec::new(),
                position: field.position.clone(),
            };
            self.aggregator.register_field(&mut record, field, &directives)?;
            self.push(record)?;
        }

        Ok(())
    }

    /// Parse a field annotation, turning a parse failure into a diagnostic.
    /// Returns `None` when the field should be skipped.
    fn directives_for(&mut self, field: &FieldDefinition, frame: &Frame) -> Option<AnnotationDirectives> {
        match parse_annotation(field.annotation.as_deref()) {
            Ok(directives) => Some(directives),
            Err(err) => {
                let diagnostic = Diagnostic {
                    position: field.position.clone(),
                    record: self.root.name.clone(),
                    field: join_path(&frame.logical, &field.name),
                    annotation: err.annotation.clone(),
                    message: err.reason.clone(),
                };
                warn!("{diagnostic}");
                self.diagnostics.push(diagnostic);

                match self.options.malformed_annotation {
                    MalformedAnnotationPolicy::Skip => None,
                    MalformedAnnotationPolicy::FallbackToName => Some(AnnotationDirectives::default()),
                }
            }
        }
    }

    fn is_index_registry_field(&self, field: &FieldDefinition, directives: &AnnotationDirectives, frame: &Frame) -> bool {
        frame.is_top_level()
            && directives.identifier.is_none()
            && same_name(&field.name, &self.options.reserved_index_field)
            && field.ty.is_bool_map()
    }

    fn push(&mut self, record: FieldRecord) -> Result<(), SchemaError> {
        if !self.logical_paths.insert(record.logical_path.clone()) {
            return Err(SchemaError::DuplicateFieldPath {
                position: record.position.clone(),
                path: record.logical_path,
            });
        }
        self.fields.push(record);
        Ok(())
    }
}
