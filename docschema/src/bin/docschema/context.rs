use anyhow::{Context, Result};
use docschema::SynthesisOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project context for docschema operations
pub struct ProjectContext {
    /// Root directory of the project (where Cargo.toml is)
    pub project_root: PathBuf,
    /// Path to .docschema directory
    pub docschema_dir: PathBuf,
    /// Path to config file
    pub config_path: PathBuf,
    /// Loaded configuration, defaults when no config file exists
    pub config: DocschemaConfig,
}

/// Configuration stored in .docschema/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocschemaConfig {
    #[serde(default)]
    pub docschema: ProjectSettings,
    #[serde(default)]
    pub synthesis: SynthesisOptions,
    /// Per-record overrides keyed by record name, e.g. `[records.User]`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub records: BTreeMap<String, RecordSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSettings {
    pub collection_name: Option<String>,
    #[serde(default)]
    pub subcollection: bool,
}

impl DocschemaConfig {
    /// Synthesis options for one record, with its `[records.<Name>]` overrides applied
    pub fn synthesis_options_for(&self, record: &str) -> SynthesisOptions {
        let mut options = self.synthesis.clone();
        if let Some(settings) = self.records.get(record) {
            if settings.collection_name.is_some() {
                options.collection_name = settings.collection_name.clone();
            }
            options.subcollection |= settings.subcollection;
        }
        options
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default = "default_scan_dirs")]
    pub scan_dirs: Vec<String>,
    #[serde(default = "default_snapshots_dir")]
    pub snapshots_dir: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            scan_dirs: default_scan_dirs(),
            snapshots_dir: default_snapshots_dir(),
        }
    }
}

fn default_scan_dirs() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_snapshots_dir() -> String {
    ".docschema/schemas".to_string()
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    /// Find project context starting from the given directory
    pub fn find_from(start: &Path) -> Result<Self> {
        let project_root = Self::find_project_root(start)?;
        Self::from_root(project_root)
    }

    /// Create context from a known project root
    pub fn from_root(project_root: PathBuf) -> Result<Self> {
        let docschema_dir = project_root.join(".docschema");
        let config_path = docschema_dir.join("config.toml");

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).context("Failed to read config.toml")?;
            toml::from_str(&content).context("Failed to parse config.toml")?
        } else {
            DocschemaConfig::default()
        };

        Ok(Self {
            project_root,
            docschema_dir,
            config_path,
            config,
        })
    }

    /// Find project root by looking for Cargo.toml
    fn find_project_root(start: &Path) -> Result<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join("Cargo.toml").exists() {
                return Ok(current);
            }

            if !current.pop() {
                anyhow::bail!(
                    "Could not find Cargo.toml in {start:?} or any parent directory. \
                     Are you in a Rust project?"
                );
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path.exists()
    }

    /// Directories to scan, either the override from the command line or the configured ones
    pub fn scan_dirs(&self, override_path: Option<&Path>) -> Vec<PathBuf> {
        match override_path {
            Some(path) if path.is_absolute() => vec![path.to_path_buf()],
            Some(path) => vec![self.project_root.join(path)],
            None => self
                .config
                .docschema
                .scan_dirs
                .iter()
                .map(|dir| self.project_root.join(dir))
                .collect(),
        }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.project_root.join(&self.config.docschema.snapshots_dir)
    }
}
