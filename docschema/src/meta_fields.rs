//! Detection of the reserved bookkeeping fields.

use convert_case::{Case, Casing};
use log::warn;

use crate::errors::SchemaError;
use crate::model::MetaFields;
use crate::types::RecordDefinition;

/// Reserved meta field names and the type each must be declared with.
pub const META_FIELDS: [(&str, &str); 7] = [
    ("CreatedAt", "timestamp"),
    ("CreatedBy", "string"),
    ("UpdatedAt", "timestamp"),
    ("UpdatedBy", "string"),
    ("DeletedAt", "optional<timestamp>"),
    ("DeletedBy", "string"),
    ("Version", "int"),
];

/// Field names are compared in snake case so `CreatedAt` and `created_at` both match.
pub(crate) fn same_name(declared: &str, reserved: &str) -> bool {
    declared.to_case(Case::Snake) == reserved.to_case(Case::Snake)
}

/// Scan the top-level fields of `record` for the reserved meta field set.
///
/// The set is all-or-nothing: a record declaring none of the fields has meta
/// fields disabled, one declaring all of them with the expected types has
/// them enabled, and anything in between is an error. A field with a reserved
/// name but the wrong type counts as not matched, so a record whose only
/// reserved names are mistyped is treated as having no meta fields.
pub fn detect_meta_fields(record: &RecordDefinition) -> Result<MetaFields, SchemaError> {
    let mut matched: Vec<Option<String>> = vec![None; META_FIELDS.len()];
    let mut mistyped = Vec::new();

    for field in record.fields_in_declaration_order() {
        let Some(slot) = META_FIELDS
            .iter()
            .position(|(reserved, _)| same_name(&field.name, reserved))
        else {
            continue;
        };
        if matched[slot].is_some() {
            continue;
        }

        let (reserved, expected) = META_FIELDS[slot];
        let actual = field.ty.type_name();
        if actual != expected {
            warn!(
                "{}: {} in meta fields should be {expected}, but got {actual}",
                field.position, field.name
            );
            mistyped.push(reserved.to_string());
            continue;
        }

        matched[slot] = Some(field.name.clone());
    }

    if matched.iter().all(Option::is_some) {
        return Ok(MetaFields {
            enabled: true,
            fields: matched.into_iter().flatten().collect(),
        });
    }

    if matched.iter().all(Option::is_none) {
        return Ok(MetaFields::disabled());
    }

    let missing = META_FIELDS
        .iter()
        .zip(&matched)
        .filter(|((reserved, _), found)| found.is_none() && !mistyped.iter().any(|name| name == reserved))
        .map(|((reserved, _), _)| reserved.to_string())
        .collect();

    Err(SchemaError::IncompleteMetaFields {
        position: record.position.clone(),
        record: record.name.clone(),
        missing,
        mistyped,
    })
}
