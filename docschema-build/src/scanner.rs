//! Source file scanner for discovering marked records.

use anyhow::{Context, Result};
use docschema::inspector::inspect_source;
use docschema::{RecordDefinition, SynthesisOptions};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Scan a directory recursively for Rust files declaring marked records.
///
/// Files under `generated/` or `target/` are ignored.
pub fn scan_directory(path: &Path, options: &SynthesisOptions) -> Result<Vec<RecordDefinition>> {
    let marker = format!("#[{}]", options.annotation_attribute);
    let mut records = Vec::new();

    let mut files: Vec<_> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().extension().is_some_and(|ext| ext == "rs")
                && !e.path().to_string_lossy().contains("/generated/")
                && !e.path().to_string_lossy().contains("/target/")
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for file_path in files {
        records.extend(scan_file(&file_path, &marker, options)?);
    }

    Ok(records)
}

/// Inspect a single Rust file; files without the marker are not parsed.
fn scan_file(file_path: &Path, marker: &str, options: &SynthesisOptions) -> Result<Vec<RecordDefinition>> {
    let content =
        fs::read_to_string(file_path).with_context(|| format!("Failed to read {}", file_path.display()))?;

    if !content.contains(marker) {
        return Ok(Vec::new());
    }

    let file = file_path.to_string_lossy();
    inspect_source(&content, &file, options).with_context(|| format!("Failed to inspect {file}"))
}
