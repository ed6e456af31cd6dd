//! Identifier field resolution.

use convert_case::{Case, Casing};

use crate::annotation::AnnotationDirectives;
use crate::errors::SchemaError;
use crate::model::{FieldRecord, IdentifierDescriptor};
use crate::types::FieldDefinition;

/// Validate a field carrying an identifier directive.
///
/// `existing` is the identifier already resolved for this record, if any.
/// Rules are checked in a fixed order so the reported error is stable:
/// uniqueness, directive value, omit storage name, then the field type.
pub fn resolve_identifier(
    field: &FieldDefinition,
    logical_path: &str,
    directives: &AnnotationDirectives,
    existing: Option<&IdentifierDescriptor>,
) -> Result<IdentifierDescriptor, SchemaError> {
    if let Some(existing) = existing {
        return Err(SchemaError::DuplicateIdentifierField {
            position: field.position.clone(),
            field: logical_path.to_string(),
            existing: existing.logical_path.clone(),
        });
    }

    let directive = directives
        .identifier
        .as_ref()
        .ok_or_else(|| SchemaError::InvalidIdentifierDirective {
            position: field.position.clone(),
            field: logical_path.to_string(),
            value: String::new(),
        })?;

    let generation = directive
        .generation_mode()
        .ok_or_else(|| SchemaError::InvalidIdentifierDirective {
            position: field.position.clone(),
            field: logical_path.to_string(),
            value: directive.value.clone(),
        })?;

    if !directives.has_omit_storage() {
        return Err(SchemaError::MissingOmitOnIdentifier {
            position: field.position.clone(),
            field: logical_path.to_string(),
        });
    }

    if !field.ty.is_string() {
        return Err(SchemaError::NonStringIdentifier {
            position: field.position.clone(),
            field: logical_path.to_string(),
            actual: field.ty.type_name(),
        });
    }

    Ok(IdentifierDescriptor {
        field_name: field.name.clone(),
        logical_path: logical_path.to_string(),
        field_type: field.ty.type_name(),
        generation,
        accessor: field.name.to_case(Case::Camel),
    })
}

/// Record used for document-identifier lookups. It has no storage path: the
/// identifier is the document key, not a stored field.
pub(crate) fn document_id_record(
    descriptor: &IdentifierDescriptor,
    field: &FieldDefinition,
    optional_ancestors: Vec<String>,
) -> FieldRecord {
    FieldRecord {
        logical_path: descriptor.logical_path.clone(),
        storage_path: None,
        storage_key: descriptor.logical_path.clone(),
        type_name: descriptor.field_type.clone(),
        optional_ancestors,
        is_identifier: true,
        is_document_id: true,
        is_unique: false,
        is_sequence: false,
        indexes: Vec::new(),
        position: field.position.clone(),
    }
}
