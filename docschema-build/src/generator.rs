//! Schema snapshot generator.

use crate::scanner::scan_directory;
use anyhow::{Context, Result};
use docschema::{RecordDefinition, SynthesisOptions, snapshot_file_name, synthesize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Builder for configuring and running the schema model generator.
pub struct ModelGenerator {
    scan_paths: Vec<PathBuf>,
    output_dir: PathBuf,
    options: SynthesisOptions,
}

/// What a generator run produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Records synthesized, sorted by name
    pub records: Vec<String>,
    /// Files whose content changed and were rewritten
    pub written: Vec<PathBuf>,
}

impl ModelGenerator {
    /// Create a new generator with default settings.
    pub fn new() -> Self {
        Self {
            scan_paths: Vec::new(),
            output_dir: PathBuf::from("schemas"),
            options: SynthesisOptions::default(),
        }
    }

    /// Add a path to scan for record definitions.
    ///
    /// Can be called multiple times to scan multiple directories.
    pub fn scan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scan_paths.push(path.into());
        self
    }

    /// Set the directory the schema files are written to.
    ///
    /// Default: `schemas`
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Set the synthesis options.
    pub fn options(mut self, options: SynthesisOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the generator.
    ///
    /// This scans all configured paths, synthesizes every record and writes
    /// the models that changed. The first fatal schema error aborts the run.
    pub fn run(self) -> Result<GenerationSummary> {
        let scan_paths = if self.scan_paths.is_empty() {
            vec![PathBuf::from("src/")]
        } else {
            self.scan_paths
        };

        let mut records = Vec::new();
        for path in &scan_paths {
            let found =
                scan_directory(path, &self.options).with_context(|| format!("Failed to scan {}", path.display()))?;
            records.extend(found);
        }

        // Same file reached through overlapping scan paths
        let mut seen = HashSet::new();
        records.retain(|record| seen.insert((record.position.file.clone(), record.name.clone())));
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.position.file.cmp(&b.position.file)));

        let mut targets: BTreeMap<String, &RecordDefinition> = BTreeMap::new();
        for record in &records {
            let file_name = snapshot_file_name(&record.name);
            if let Some(previous) = targets.insert(file_name.clone(), record) {
                anyhow::bail!(
                    "docschema-build: records `{}` ({}) and `{}` ({}) both map to {file_name}",
                    previous.name,
                    previous.position,
                    record.name,
                    record.position
                );
            }
        }

        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create directory {}", self.output_dir.display()))?;

        let mut summary = GenerationSummary::default();
        for record in &records {
            let synthesis = synthesize(record, &self.options);
            for diagnostic in &synthesis.diagnostics {
                eprintln!("docschema-build: warning: {}: {diagnostic}", record.name);
            }

            let model = synthesis
                .into_result()
                .map_err(|err| anyhow::anyhow!("docschema-build: record `{}`: {err}", record.name))?;

            let path = self.output_dir.join(model.snapshot_file_name());
            let json = model.to_json().context("Failed to serialize schema model")?;
            if write_if_changed(&path, &format!("{json}\n"))? {
                log::info!("wrote {}", path.display());
                summary.written.push(path);
            }
            summary.records.push(record.name.clone());
        }

        if !summary.written.is_empty() {
            eprintln!(
                "docschema-build: Generated {} of {} schema files in {}",
                summary.written.len(),
                summary.records.len(),
                self.output_dir.display()
            );
        }

        Ok(summary)
    }
}

impl Default for ModelGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Only write if content has changed (avoids unnecessary recompilation).
fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    let should_write = match fs::read_to_string(path) {
        Ok(existing) => existing != contents,
        Err(_) => true,
    };

    if should_write {
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(should_write)
}
