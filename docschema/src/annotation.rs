//! Field annotation mini-language.
//!
//! An annotation is a comma-separated list of directives. The first token,
//! when it has no `=`, is positional and names the storage key (or `-` to
//! keep the field out of storage). Every other token is `key` or
//! `key=value`:
//!
//! ```text
//! "display_name,unique,index=by_name"
//! "-,key=auto"
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AnnotationError;
use crate::model::GenerationMode;

/// Positional storage name that keeps a field out of storage.
pub const OMIT_SENTINEL: &str = "-";
/// Identifier directive value requesting generated identifiers.
pub const AUTO_SENTINEL: &str = "auto";

const IDENTIFIER_KEY: &str = "key";
const UNIQUE_KEY: &str = "unique";
const INDEX_KEY: &str = "index";

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("directive key pattern is valid"));

/// Identifier directive with its raw value. Validation of the value is left to
/// the identifier resolver so that a bad value is a structural error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierDirective {
    pub value: String,
}

impl IdentifierDirective {
    /// `None` when the value is neither empty nor the auto sentinel.
    pub fn generation_mode(&self) -> Option<GenerationMode> {
        match self.value.as_str() {
            "" => Some(GenerationMode::Manual),
            AUTO_SENTINEL => Some(GenerationMode::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDirective {
    /// Override for the index name; the field's storage key is used when absent.
    pub name: Option<String>,
}

/// Directives decoded from one field annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationDirectives {
    /// Positional token, `None` when absent or empty.
    pub storage_name: Option<String>,
    pub identifier: Option<IdentifierDirective>,
    pub unique: bool,
    pub index: Option<IndexDirective>,
    /// Keyed directives this crate does not interpret, in declaration order.
    pub unrecognized: Vec<(String, Option<String>)>,
}

impl AnnotationDirectives {
    /// The positional token is the omit sentinel.
    pub fn has_omit_storage(&self) -> bool {
        self.storage_name.as_deref() == Some(OMIT_SENTINEL)
    }

    /// The field is left out of the model. An identifier directive always wins over omission.
    pub fn is_omitted(&self) -> bool {
        self.has_omit_storage() && self.identifier.is_none()
    }

    /// Storage path segment to use instead of the field name, if any.
    pub fn storage_segment(&self) -> Option<&str> {
        match self.storage_name.as_deref() {
            Some(OMIT_SENTINEL) | None => None,
            Some(name) => Some(name),
        }
    }
}

/// Parse a raw annotation. A missing or blank annotation yields empty directives.
pub fn parse_annotation(raw: Option<&str>) -> Result<AnnotationDirectives, AnnotationError> {
    let mut directives = AnnotationDirectives::default();

    let Some(raw) = raw else {
        return Ok(directives);
    };
    if raw.trim().is_empty() {
        return Ok(directives);
    }

    for (position, token) in raw.split(',').map(str::trim).enumerate() {
        if position == 0 && !token.contains('=') {
            if !token.is_empty() {
                directives.storage_name = Some(token.to_string());
            }
            continue;
        }

        if token.is_empty() {
            return Err(AnnotationError::new(
                raw,
                format!("empty directive at position {}", position + 1),
            ));
        }

        let (key, value) = split_directive(raw, token)?;
        apply_directive(raw, &mut directives, key, value)?;
    }

    Ok(directives)
}

fn split_directive<'a>(raw: &str, token: &'a str) -> Result<(&'a str, Option<&'a str>), AnnotationError> {
    let mut parts = token.splitn(3, '=');
    let key = parts.next().unwrap_or_default().trim();
    let value = parts.next().map(str::trim);

    if parts.next().is_some() {
        return Err(AnnotationError::new(raw, format!("directive `{token}` has more than one `=`")));
    }
    if !KEY_PATTERN.is_match(key) {
        return Err(AnnotationError::new(raw, format!("`{key}` is not a valid directive key")));
    }

    Ok((key, value))
}

fn apply_directive(
    raw: &str,
    directives: &mut AnnotationDirectives,
    key: &str,
    value: Option<&str>,
) -> Result<(), AnnotationError> {
    match key {
        IDENTIFIER_KEY => {
            if directives.identifier.is_some() {
                return Err(duplicate(raw, key));
            }
            directives.identifier = Some(IdentifierDirective {
                value: value.unwrap_or_default().to_string(),
            });
        }
        UNIQUE_KEY => {
            if directives.unique {
                return Err(duplicate(raw, key));
            }
            if value.is_some() {
                return Err(AnnotationError::new(raw, "`unique` does not take a value"));
            }
            directives.unique = true;
        }
        INDEX_KEY => {
            if directives.index.is_some() {
                return Err(duplicate(raw, key));
            }
            let name = match value {
                Some("") => return Err(AnnotationError::new(raw, "`index=` requires an index name")),
                Some(name) => Some(name.to_string()),
                None => None,
            };
            directives.index = Some(IndexDirective { name });
        }
        _ => directives
            .unrecognized
            .push((key.to_string(), value.map(str::to_string))),
    }

    Ok(())
}

fn duplicate(raw: &str, key: &str) -> AnnotationError {
    AnnotationError::new(raw, format!("`{key}` is declared more than once"))
}
