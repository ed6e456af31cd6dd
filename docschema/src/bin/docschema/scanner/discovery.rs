//! File discovery for finding Rust files that declare stored records.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Discovered record file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to project root
    pub relative_path: String,
}

/// Discover all Rust files under `search_dirs` that mention the marker attribute.
///
/// Hidden directories and `target` are never entered. Results are sorted by
/// relative path so repeated scans report records in the same order.
pub fn discover_records(project_root: &Path, search_dirs: &[PathBuf], attribute: &str) -> Result<Vec<DiscoveredFile>> {
    let marker = format!("#[{attribute}]");
    let mut discovered = Vec::new();

    for search_path in search_dirs {
        if !search_path.exists() {
            log::debug!("scan directory {} does not exist", search_path.display());
            continue;
        }

        for entry in WalkDir::new(search_path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "rs") {
                continue;
            }

            if file_contains_marker(path, &marker)? {
                let relative_path = path
                    .strip_prefix(project_root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .to_string();

                discovered.push(DiscoveredFile {
                    path: path.to_path_buf(),
                    relative_path,
                });
            }
        }
    }

    discovered.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    discovered.dedup_by(|a, b| a.relative_path == b.relative_path);

    Ok(discovered)
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && name == "target")
}

/// Quick text check before doing full parsing.
fn file_contains_marker(path: &Path, marker: &str) -> Result<bool> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(content.contains(marker))
}
