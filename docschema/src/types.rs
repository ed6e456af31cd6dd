//! Input model supplied by a source-type inspector.
//!
//! These values describe a record exactly as it was declared. The synthesis
//! pipeline only ever borrows them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a declaration in its source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Scalar types the pipeline knows how to reason about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Bool,
    Integer,
    Float,
    Timestamp,
    Bytes,
    /// Any other type, kept by its declared name.
    Named(String),
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Bool => write!(f, "bool"),
            PrimitiveType::Integer => write!(f, "int"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
            PrimitiveType::Bytes => write!(f, "bytes"),
            PrimitiveType::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Primitive(PrimitiveType),
    /// A nested record whose fields are flattened into the parent.
    Record(RecordDefinition),
    Optional(Box<DeclaredType>),
    Sequence(Box<DeclaredType>),
    Map {
        key: Box<DeclaredType>,
        value: Box<DeclaredType>,
    },
}

impl DeclaredType {
    pub fn string() -> Self {
        DeclaredType::Primitive(PrimitiveType::String)
    }

    pub fn bool() -> Self {
        DeclaredType::Primitive(PrimitiveType::Bool)
    }

    pub fn integer() -> Self {
        DeclaredType::Primitive(PrimitiveType::Integer)
    }

    pub fn float() -> Self {
        DeclaredType::Primitive(PrimitiveType::Float)
    }

    pub fn timestamp() -> Self {
        DeclaredType::Primitive(PrimitiveType::Timestamp)
    }

    pub fn named(name: impl Into<String>) -> Self {
        DeclaredType::Primitive(PrimitiveType::Named(name.into()))
    }

    pub fn optional(inner: DeclaredType) -> Self {
        DeclaredType::Optional(Box::new(inner))
    }

    pub fn sequence(element: DeclaredType) -> Self {
        DeclaredType::Sequence(Box::new(element))
    }

    pub fn map(key: DeclaredType, value: DeclaredType) -> Self {
        DeclaredType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// The canonical name used in synthesized records and error messages.
    pub fn type_name(&self) -> String {
        self.to_string()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DeclaredType::Primitive(PrimitiveType::String))
    }

    /// Whether values of this type are sequences, looking through one optional wrapper.
    pub fn is_sequence(&self) -> bool {
        match self {
            DeclaredType::Sequence(_) => true,
            DeclaredType::Optional(inner) => matches!(**inner, DeclaredType::Sequence(_)),
            _ => false,
        }
    }

    /// `map<string, bool>`, the only shape accepted for the index registry field.
    pub fn is_bool_map(&self) -> bool {
        match self {
            DeclaredType::Map { key, value } => {
                key.is_string() && matches!(**value, DeclaredType::Primitive(PrimitiveType::Bool))
            }
            _ => false,
        }
    }

    /// Returns the nested record and whether it sits behind an optional wrapper.
    pub fn nested_record(&self) -> Option<(&RecordDefinition, bool)> {
        match self {
            DeclaredType::Record(record) => Some((record, false)),
            DeclaredType::Optional(inner) => match inner.as_ref() {
                DeclaredType::Record(record) => Some((record, true)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Primitive(primitive) => write!(f, "{primitive}"),
            DeclaredType::Record(record) => write!(f, "{}", record.name),
            DeclaredType::Optional(inner) => write!(f, "optional<{inner}>"),
            DeclaredType::Sequence(element) => write!(f, "sequence<{element}>"),
            DeclaredType::Map { key, value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

/// A record type: the root of a synthesis call, or a nested field type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDefinition {
    pub name: String,
    pub position: SourcePosition,
    pub fields: Vec<FieldDefinition>,
}

impl RecordDefinition {
    pub fn new(name: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            name: name.into(),
            position,
            fields: Vec::new(),
        }
    }

    /// Append a field, assigning the next declaration index.
    pub fn with_field(mut self, name: impl Into<String>, ty: DeclaredType, annotation: Option<&str>) -> Self {
        let index = self.fields.len();
        let position = SourcePosition::new(self.position.file.clone(), self.position.line + index + 1, 5);
        self.fields.push(FieldDefinition {
            name: name.into(),
            ty,
            annotation: annotation.map(str::to_string),
            declaration_index: index,
            position,
        });
        self
    }

    /// Fields sorted by declaration index. The sort is stable, so ties keep input order.
    pub fn fields_in_declaration_order(&self) -> Vec<&FieldDefinition> {
        let mut fields: Vec<&FieldDefinition> = self.fields.iter().collect();
        fields.sort_by_key(|field| field.declaration_index);
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: DeclaredType,
    /// Raw annotation string, `None` when the field carries no annotation at all.
    pub annotation: Option<String>,
    pub declaration_index: usize,
    pub position: SourcePosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(DeclaredType::string().type_name(), "string");
        assert_eq!(DeclaredType::optional(DeclaredType::timestamp()).type_name(), "optional<timestamp>");
        assert_eq!(DeclaredType::sequence(DeclaredType::integer()).type_name(), "sequence<int>");
        assert_eq!(
            DeclaredType::map(DeclaredType::string(), DeclaredType::bool()).type_name(),
            "map<string, bool>"
        );
        assert_eq!(DeclaredType::named("Uuid").type_name(), "Uuid");
    }

    #[test]
    fn test_bool_map_detection() {
        assert!(DeclaredType::map(DeclaredType::string(), DeclaredType::bool()).is_bool_map());
        assert!(!DeclaredType::map(DeclaredType::string(), DeclaredType::float()).is_bool_map());
        assert!(!DeclaredType::map(DeclaredType::integer(), DeclaredType::bool()).is_bool_map());
    }

    #[test]
    fn test_nested_record_detection() {
        let inner = RecordDefinition::new("Address", SourcePosition::default());
        let direct = DeclaredType::Record(inner.clone());
        let optional = DeclaredType::optional(DeclaredType::Record(inner));

        assert_eq!(direct.nested_record().map(|(_, opt)| opt), Some(false));
        assert_eq!(optional.nested_record().map(|(_, opt)| opt), Some(true));
        assert!(DeclaredType::string().nested_record().is_none());
    }

    #[test]
    fn test_declaration_order_is_stable() {
        let mut record = RecordDefinition::new("User", SourcePosition::new("user.rs", 1, 1))
            .with_field("a", DeclaredType::string(), None)
            .with_field("b", DeclaredType::string(), None);
        record.fields.reverse();

        let names: Vec<&str> = record
            .fields_in_declaration_order()
            .iter()
            .map(|field| field.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
