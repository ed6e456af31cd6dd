//! Rust source inspector built on `syn`.
//!
//! Records are named-field structs carrying the bare marker attribute (by
//! default `#[store]`). Field annotations are read from the same attribute
//! with a string literal argument:
//!
//! ```ignore
//! #[store]
//! struct User {
//!     #[store("-,key=auto")]
//!     id: String,
//!     #[store("email,unique")]
//!     email: String,
//!     profile: Option<Profile>,
//! }
//! ```
//!
//! Any other struct declared in the same source is resolved as a nested record
//! when a field refers to it by name.

use std::collections::BTreeMap;

use quote::ToTokens;
use syn::{Attribute, Fields, GenericArgument, ItemStruct, Lit, Meta, PathArguments, Type};
use thiserror::Error;

use crate::config::SynthesisOptions;
use crate::types::{DeclaredType, FieldDefinition, PrimitiveType, RecordDefinition, SourcePosition};

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: syn::Error,
    },

    #[error("{position}: record `{record}` contains itself through field `{field}`")]
    RecursiveRecord {
        position: SourcePosition,
        record: String,
        field: String,
    },
}

/// Inspect Rust source text and return every marked record, in source order.
pub fn inspect_source(
    source: &str,
    file: &str,
    options: &SynthesisOptions,
) -> Result<Vec<RecordDefinition>, InspectError> {
    let syntax = syn::parse_file(source).map_err(|source| InspectError::Parse {
        file: file.to_string(),
        source,
    })?;

    let structs: Vec<&ItemStruct> = syntax
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Struct(item_struct) if matches!(item_struct.fields, Fields::Named(_)) => Some(item_struct),
            _ => None,
        })
        .collect();

    let inspector = Inspector {
        file,
        attribute: &options.annotation_attribute,
        structs: structs.iter().map(|s| (s.ident.to_string(), *s)).collect(),
    };

    let mut records = Vec::new();
    for item in structs {
        if has_marker(&item.attrs, inspector.attribute) {
            let mut stack = Vec::new();
            records.push(inspector.record(item, &mut stack)?);
        }
    }

    Ok(records)
}

struct Inspector<'a> {
    file: &'a str,
    attribute: &'a str,
    structs: BTreeMap<String, &'a ItemStruct>,
}

impl Inspector<'_> {
    fn record(&self, item: &ItemStruct, stack: &mut Vec<String>) -> Result<RecordDefinition, InspectError> {
        let name = item.ident.to_string();
        let mut record = RecordDefinition::new(name.clone(), self.position(item.ident.span()));

        stack.push(name);
        if let Fields::Named(named) = &item.fields {
            for (index, field) in named.named.iter().enumerate() {
                let Some(ident) = &field.ident else {
                    continue;
                };
                let field_name = ident.to_string();
                let position = self.position(ident.span());
                let ty = self.declared_type(&field.ty, stack, &field_name, &position)?;

                record.fields.push(FieldDefinition {
                    name: field_name,
                    ty,
                    annotation: field_annotation(&field.attrs, self.attribute),
                    declaration_index: index,
                    position,
                });
            }
        }
        stack.pop();

        Ok(record)
    }

    fn declared_type(
        &self,
        ty: &Type,
        stack: &mut Vec<String>,
        field: &str,
        position: &SourcePosition,
    ) -> Result<DeclaredType, InspectError> {
        let type_path = match ty {
            Type::Path(type_path) => type_path,
            Type::Reference(reference) => return self.declared_type(&reference.elem, stack, field, position),
            Type::Paren(paren) => return self.declared_type(&paren.elem, stack, field, position),
            Type::Slice(slice) => {
                let element = self.declared_type(&slice.elem, stack, field, position)?;
                return Ok(DeclaredType::sequence(element));
            }
            Type::Array(array) => {
                let element = self.declared_type(&array.elem, stack, field, position)?;
                return Ok(DeclaredType::sequence(element));
            }
            other => return Ok(DeclaredType::named(type_to_string(other))),
        };

        let Some(segment) = type_path.path.segments.last() else {
            return Ok(DeclaredType::named(type_to_string(ty)));
        };
        let ident = segment.ident.to_string();
        let args = generic_types(&segment.arguments);

        let declared = match (ident.as_str(), args.as_slice()) {
            ("String" | "str", []) => DeclaredType::string(),
            ("bool", []) => DeclaredType::bool(),
            (
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128" | "usize",
                [],
            ) => DeclaredType::integer(),
            ("f32" | "f64", []) => DeclaredType::float(),
            ("DateTime" | "NaiveDateTime" | "SystemTime" | "OffsetDateTime" | "Timestamp", _) => {
                DeclaredType::timestamp()
            }
            ("Option", [inner]) => DeclaredType::optional(self.declared_type(inner, stack, field, position)?),
            ("Vec", [inner]) if is_u8(inner) => DeclaredType::Primitive(PrimitiveType::Bytes),
            ("Vec" | "VecDeque" | "HashSet" | "BTreeSet", [inner]) => {
                DeclaredType::sequence(self.declared_type(inner, stack, field, position)?)
            }
            ("HashMap" | "BTreeMap", [key, value]) => DeclaredType::map(
                self.declared_type(key, stack, field, position)?,
                self.declared_type(value, stack, field, position)?,
            ),
            ("Box" | "Arc" | "Rc", [inner]) => self.declared_type(inner, stack, field, position)?,
            (name, []) if self.structs.contains_key(name) => {
                if stack.iter().any(|seen| seen == name) {
                    return Err(InspectError::RecursiveRecord {
                        position: position.clone(),
                        record: name.to_string(),
                        field: field.to_string(),
                    });
                }
                DeclaredType::Record(self.record(self.structs[name], stack)?)
            }
            _ => DeclaredType::named(type_to_string(ty)),
        };

        Ok(declared)
    }

    fn position(&self, span: proc_macro2::Span) -> SourcePosition {
        let start = span.start();
        SourcePosition::new(self.file, start.line, start.column + 1)
    }
}

/// Check for the bare marker attribute, e.g. `#[store]`.
fn has_marker(attrs: &[Attribute], attribute: &str) -> bool {
    attrs
        .iter()
        .any(|attr| attr.path().is_ident(attribute) && matches!(attr.meta, Meta::Path(_)))
}

/// Raw annotation text of a field.
///
/// The string literal form `#[store("name,unique")]` is read verbatim. Any
/// other argument list is passed on as its token text and left to the
/// annotation parser to accept or reject.
fn field_annotation(attrs: &[Attribute], attribute: &str) -> Option<String> {
    attrs.iter().find(|attr| attr.path().is_ident(attribute)).map(|attr| match &attr.meta {
        Meta::List(list) => match syn::parse2::<Lit>(list.tokens.clone()) {
            Ok(Lit::Str(lit)) => lit.value(),
            _ => list.tokens.to_string(),
        },
        Meta::NameValue(name_value) => match &name_value.value {
            syn::Expr::Lit(syn::ExprLit { lit: Lit::Str(lit), .. }) => lit.value(),
            other => quote_tokens(other),
        },
        Meta::Path(_) => String::new(),
    })
}

fn quote_tokens(expr: &syn::Expr) -> String {
    expr.to_token_stream().to_string()
}

fn generic_types(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(inner) => Some(inner),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(type_path) if type_path.path.is_ident("u8"))
}

/// Render a type the way it was written, e.g. `chrono::DateTime<Utc>`.
fn type_to_string(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .iter()
            .map(|seg| {
                let ident = seg.ident.to_string();
                let inner: Vec<String> = generic_types(&seg.arguments).into_iter().map(type_to_string).collect();
                if inner.is_empty() {
                    ident
                } else {
                    format!("{}<{}>", ident, inner.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("::"),
        Type::Tuple(tuple) if tuple.elems.is_empty() => "()".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspect(source: &str) -> Vec<RecordDefinition> {
        inspect_source(source, "src/model.rs", &SynthesisOptions::default()).unwrap()
    }

    #[test]
    fn test_marked_structs_only() {
        let records = inspect(
            r#"
            #[store]
            struct User {
                #[store("-,key=auto")]
                id: String,
                name: String,
            }

            struct Helper {
                value: i32,
            }
            "#,
        );

        assert_eq!(records.len(), 1);
        let user = &records[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.fields.len(), 2);
        assert_eq!(user.fields[0].annotation.as_deref(), Some("-,key=auto"));
        assert_eq!(user.fields[1].annotation, None);
        assert_eq!(user.fields[1].declaration_index, 1);
    }

    #[test]
    fn test_type_mapping() {
        let records = inspect(
            r#"
            #[store]
            struct Sample {
                a: String,
                b: Option<chrono::DateTime<Utc>>,
                c: Vec<String>,
                d: HashMap<String, bool>,
                e: u64,
                f: Vec<u8>,
                g: Uuid,
            }
            "#,
        );

        let names: Vec<String> = records[0].fields.iter().map(|f| f.ty.type_name()).collect();
        assert_eq!(
            names,
            vec![
                "string",
                "optional<timestamp>",
                "sequence<string>",
                "map<string, bool>",
                "int",
                "bytes",
                "Uuid",
            ]
        );
    }

    #[test]
    fn test_nested_structs_resolve_to_records() {
        let records = inspect(
            r#"
            struct Address {
                city: String,
            }

            #[store]
            struct User {
                home: Address,
                work: Option<Address>,
            }
            "#,
        );

        let user = &records[0];
        assert!(matches!(user.fields[0].ty.nested_record(), Some((_, false))));
        assert!(matches!(user.fields[1].ty.nested_record(), Some((_, true))));
    }

    #[test]
    fn test_positions_come_from_spans() {
        let records = inspect("#[store]\nstruct User {\n    name: String,\n}\n");
        assert_eq!(records[0].position.line, 2);
        assert_eq!(records[0].fields[0].position, SourcePosition::new("src/model.rs", 3, 5));
    }

    #[test]
    fn test_recursive_record_is_rejected() {
        let result = inspect_source(
            r#"
            #[store]
            struct Node {
                next: Option<Box<Node>>,
            }
            "#,
            "src/node.rs",
            &SynthesisOptions::default(),
        );
        assert!(matches!(result, Err(InspectError::RecursiveRecord { .. })));
    }

    #[test]
    fn test_invalid_source_is_a_parse_error() {
        let result = inspect_source("struct {", "src/bad.rs", &SynthesisOptions::default());
        assert!(matches!(result, Err(InspectError::Parse { .. })));
    }
}
