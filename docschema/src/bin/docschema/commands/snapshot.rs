use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{ScanArgs, report_diagnostics, report_file_failures, scan};
use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::scanner::ScannedRecord;
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Snapshots",
    commands: &[
        "docschema snapshot                # Write one JSON model per record",
        "docschema snapshot --path models  # Snapshot records from another directory",
    ],
}];

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Outcome counters of one snapshot run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

pub fn handle_snapshot(args: SnapshotArgs, ctx: &ProjectContext, output: &OutputManager) -> Result<()> {
    let outcome = scan(ctx, &args.scan, output)?;
    report_file_failures(&outcome.failures, output);

    let dir = ctx.snapshots_dir();
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let colliding = colliding_file_names(&outcome.records);
    let mut summary = SnapshotSummary {
        failed: outcome.failures.len(),
        ..Default::default()
    };
    for record in &outcome.records {
        report_diagnostics(record, output);

        let file_name = docschema::snapshot_file_name(&record.record);
        if let Some(sources) = colliding.get(&file_name) {
            output.error(&format!(
                "{}: {file_name} is claimed by records in {}",
                record.record,
                sources.join(", ")
            ));
            summary.failed += 1;
            continue;
        }

        let model = match &record.synthesis.result {
            Ok(model) => model,
            Err(err) => {
                output.error(&format!("{}: {err}", record.record));
                summary.failed += 1;
                continue;
            }
        };

        let path = dir.join(file_name);
        let json = model.to_json().context("Failed to serialize schema model")?;
        if write_if_changed(&path, &format!("{json}\n"))? {
            output.indented(ICONS.changed, &format!("{}", path.display()));
            summary.written += 1;
        } else {
            output.verbose(&format!("{} unchanged", path.display()));
            summary.unchanged += 1;
        }
    }

    if summary.failed > 0 {
        anyhow::bail!("{} record(s) or file(s) could not be snapshotted", summary.failed);
    }

    output.success(&format!(
        "{} snapshot(s) written, {} unchanged",
        summary.written, summary.unchanged
    ));
    Ok(())
}

/// Snapshot file names shared by more than one record, with the sources claiming them.
fn colliding_file_names(records: &[ScannedRecord]) -> BTreeMap<String, Vec<String>> {
    let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records {
        claims
            .entry(docschema::snapshot_file_name(&record.record))
            .or_default()
            .push(record.source.clone());
    }
    claims.retain(|_, sources| sources.len() > 1);
    claims
}

/// Write `contents` to `path` unless the file already holds exactly that text.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::GlobalOptions;

    fn quiet() -> OutputManager {
        OutputManager::new(GlobalOptions {
            quiet: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_write_if_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.schema.json");
        assert!(write_if_changed(&path, "{}\n").unwrap());
        assert!(!write_if_changed(&path, "{}\n").unwrap());
        assert!(write_if_changed(&path, "{ }\n").unwrap());
    }

    #[test]
    fn test_snapshot_writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/lib.rs"),
            r#"
            #[store]
            struct UserProfile {
                #[store("-,key=auto")]
                id: String,
                #[store("handle,unique")]
                handle: String,
            }
            "#,
        )
        .unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        handle_snapshot(SnapshotArgs { scan: ScanArgs::default() }, &ctx, &quiet()).unwrap();

        let path = ctx.snapshots_dir().join("user_profile.schema.json");
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(first.contains("\"record\": \"UserProfile\""));

        handle_snapshot(SnapshotArgs { scan: ScanArgs::default() }, &ctx, &quiet()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_same_record_name_in_two_files_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src/a")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/b")).unwrap();
        std::fs::write(dir.path().join("src/a/user.rs"), "#[store]\nstruct User {\n    name: String,\n}\n").unwrap();
        std::fs::write(dir.path().join("src/b/user.rs"), "#[store]\nstruct User {\n    email: String,\n}\n").unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        let err = handle_snapshot(SnapshotArgs { scan: ScanArgs::default() }, &ctx, &quiet()).unwrap_err();
        assert!(err.to_string().contains("2 record(s)"));
        assert!(!ctx.snapshots_dir().join("user.schema.json").exists());
    }
}
