//! docschema core library.
//!
//! Turns an annotated record definition into a [`SchemaModel`] describing how
//! the record maps onto a document store: its identifier, unique and indexed
//! fields, flattened nested records and bookkeeping meta fields.
//!
//! ```
//! use docschema::{DeclaredType, RecordDefinition, SourcePosition, SynthesisOptions, synthesize};
//!
//! let user = RecordDefinition::new("User", SourcePosition::new("user.rs", 1, 1))
//!     .with_field("ID", DeclaredType::string(), Some("-,key=auto"))
//!     .with_field("Email", DeclaredType::string(), Some("email,unique"));
//!
//! let model = synthesize(&user, &SynthesisOptions::default()).into_result().unwrap();
//! assert_eq!(model.unique().entries[0].field_path, "Email");
//! ```

pub mod annotation;
pub mod config;
pub mod errors;
pub mod identifier;
pub mod indexes;
pub mod inspector;
pub mod meta_fields;
pub mod model;
pub mod types;
pub mod walker;

pub use config::{MalformedAnnotationPolicy, SynthesisOptions};
pub use errors::{AnnotationError, Diagnostic, SchemaError};
pub use model::{
    FieldRecord, GenerationMode, IdentifierDescriptor, IndexDescriptor, IndexRegistry, MetaFields, RegistryEntry,
    SchemaModel, UniqueRegistry, snapshot_file_name,
};
pub use types::{DeclaredType, FieldDefinition, PrimitiveType, RecordDefinition, SourcePosition};

use meta_fields::detect_meta_fields;
use walker::Walker;

/// Outcome of synthesizing one record.
///
/// Diagnostics are collected independently of the result: a successful model
/// may come with diagnostics for skipped fields, and a failed synthesis keeps
/// whatever diagnostics were reported before the failure.
#[derive(Debug)]
pub struct Synthesis {
    pub result: Result<SchemaModel, SchemaError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Synthesis {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<SchemaModel, SchemaError> {
        self.result
    }
}

/// Synthesize the schema model for `record`.
///
/// Each call is independent; records of a batch can be synthesized in any
/// order or in parallel with identical results.
pub fn synthesize(record: &RecordDefinition, options: &SynthesisOptions) -> Synthesis {
    let meta_fields = if options.disable_meta_fields_detection {
        MetaFields::disabled()
    } else {
        match detect_meta_fields(record) {
            Ok(meta_fields) => meta_fields,
            Err(err) => {
                return Synthesis {
                    result: Err(err),
                    diagnostics: Vec::new(),
                };
            }
        }
    };

    let (parts, diagnostics) = Walker::new(record, options).run(meta_fields);
    Synthesis {
        result: parts.map(SchemaModel::new),
        diagnostics,
    }
}
