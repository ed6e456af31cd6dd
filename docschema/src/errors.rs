use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::SourcePosition;

/// Structural error that aborts synthesis for one record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The identifier directive carried a value other than empty or `auto`.
    #[error("{position}: identifier directive on `{field}` must be `key` or `key=auto`, found `key={value}`")]
    InvalidIdentifierDirective {
        position: SourcePosition,
        field: String,
        value: String,
    },

    #[error("{position}: identifier field `{field}` must be a string, found `{actual}`")]
    NonStringIdentifier {
        position: SourcePosition,
        field: String,
        actual: String,
    },

    /// Identifier fields are never stored under their own name.
    #[error("{position}: identifier field `{field}` must be annotated with the omit storage name `-`")]
    MissingOmitOnIdentifier { position: SourcePosition, field: String },

    #[error("{position}: `unique` is only supported on string fields, but `{field}` is `{actual}`")]
    UnsupportedUniqueFieldType {
        position: SourcePosition,
        field: String,
        actual: String,
    },

    #[error(
        "{position}: meta fields of `{record}` are incomplete (missing: {}; mistyped: {})",
        list_or_none(.missing),
        list_or_none(.mistyped)
    )]
    IncompleteMetaFields {
        position: SourcePosition,
        record: String,
        missing: Vec<String>,
        mistyped: Vec<String>,
    },

    #[error("{position}: `{field}` declares a second identifier, `{existing}` is already the identifier")]
    DuplicateIdentifierField {
        position: SourcePosition,
        field: String,
        existing: String,
    },

    #[error("{position}: field path `{path}` is declared more than once")]
    DuplicateFieldPath { position: SourcePosition, path: String },
}

impl SchemaError {
    /// Position of the declaration that violated the rule.
    pub fn position(&self) -> &SourcePosition {
        match self {
            SchemaError::InvalidIdentifierDirective { position, .. }
            | SchemaError::NonStringIdentifier { position, .. }
            | SchemaError::MissingOmitOnIdentifier { position, .. }
            | SchemaError::UnsupportedUniqueFieldType { position, .. }
            | SchemaError::IncompleteMetaFields { position, .. }
            | SchemaError::DuplicateIdentifierField { position, .. }
            | SchemaError::DuplicateFieldPath { position, .. } => position,
        }
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// The annotation string could not be read as a list of directives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed annotation `{annotation}`: {reason}")]
pub struct AnnotationError {
    pub annotation: String,
    pub reason: String,
}

impl AnnotationError {
    pub fn new(annotation: &str, reason: impl Into<String>) -> Self {
        Self {
            annotation: annotation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal problem reported while walking a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub position: SourcePosition,
    pub record: String,
    pub field: String,
    pub annotation: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: annotation `{}` for `{}` in record {}: {}",
            self.position, self.annotation, self.field, self.record, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_position() {
        let err = SchemaError::UnsupportedUniqueFieldType {
            position: SourcePosition::new("user.rs", 12, 5),
            field: "profile.age".to_string(),
            actual: "int".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "user.rs:12:5: `unique` is only supported on string fields, but `profile.age` is `int`"
        );
        assert_eq!(err.position().line, 12);
    }

    #[test]
    fn test_incomplete_meta_fields_message() {
        let err = SchemaError::IncompleteMetaFields {
            position: SourcePosition::new("task.rs", 3, 1),
            record: "Task".to_string(),
            missing: vec!["DeletedBy".to_string()],
            mistyped: Vec::new(),
        };
        let message = err.to_string();
        assert!(message.contains("missing: DeletedBy"));
        assert!(message.contains("mistyped: none"));
    }
}
