//! Record scanning: discover annotated Rust files, inspect them and
//! synthesize a schema model for every record found.

mod discovery;

use discovery::discover_records;

use anyhow::{Context, Result};
use docschema::inspector::inspect_source;
use docschema::{Synthesis, synthesize};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::context::DocschemaConfig;

/// One record found while scanning, with its synthesis outcome
#[derive(Debug)]
pub struct ScannedRecord {
    /// Record (struct) name
    pub record: String,
    /// Source file relative to the project root
    pub source: String,
    pub synthesis: Synthesis,
}

/// A file that could not be inspected; records in other files are unaffected
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<ScannedRecord>,
    pub failures: Vec<FileFailure>,
}

/// Scan `search_dirs` and synthesize every record, in file then source order.
///
/// Unreadable directories still fail the scan. A file that does not parse,
/// or whose records contain themselves, is reported in `failures`.
pub fn scan_records(project_root: &Path, search_dirs: &[PathBuf], config: &DocschemaConfig) -> Result<ScanOutcome> {
    let files = discover_records(project_root, search_dirs, &config.synthesis.annotation_attribute)?;
    let mut outcome = ScanOutcome::default();

    for file in files {
        let source = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read file: {}", file.path.display()))?;

        let records = match inspect_source(&source, &file.relative_path, &config.synthesis) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("skipping {}: {err}", file.relative_path);
                outcome.failures.push(FileFailure {
                    source: file.relative_path.clone(),
                    message: err.to_string(),
                });
                continue;
            }
        };

        for definition in records {
            log::debug!("synthesizing {} from {}", definition.name, file.relative_path);
            let options = config.synthesis_options_for(&definition.name);
            outcome.records.push(ScannedRecord {
                record: definition.name.clone(),
                source: file.relative_path.clone(),
                synthesis: synthesize(&definition, &options),
            });
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_records_synthesizes_each_record() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("models.rs"),
            r#"
            #[store]
            struct User {
                #[store("-,key=auto")]
                id: String,
                #[store("email,unique")]
                email: String,
            }

            #[store]
            struct Broken {
                #[store("count,unique")]
                count: i64,
            }
            "#,
        )
        .unwrap();

        let config: DocschemaConfig = toml::from_str("[records.User]\ncollection_name = \"users\"\n").unwrap();
        let outcome = scan_records(dir.path(), &[src], &config).unwrap();
        let scanned = outcome.records;
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].record, "User");
        assert_eq!(scanned[0].source, "src/models.rs");
        let user = scanned[0].synthesis.result.as_ref().unwrap();
        assert_eq!(user.collection_name(), "users");
        assert!(!scanned[1].synthesis.is_ok());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_bad_file_does_not_hide_other_records() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a_broken.rs"), "#[store]\nstruct {").unwrap();
        std::fs::write(
            src.join("b_node.rs"),
            "#[store]\nstruct Node {\n    next: Option<Box<Node>>,\n}\n",
        )
        .unwrap();
        std::fs::write(src.join("c_user.rs"), "#[store]\nstruct User {\n    name: String,\n}\n").unwrap();

        let outcome = scan_records(dir.path(), &[src], &DocschemaConfig::default()).unwrap();
        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(failed, vec!["src/a_broken.rs", "src/b_node.rs"]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].record, "User");
    }
}
