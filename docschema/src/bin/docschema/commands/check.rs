use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use super::{ScanArgs, report_diagnostics, report_file_failures, scan};
use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, add_table_header, create_table};
use crate::scanner::{FileFailure, ScanOutcome};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Validation",
    commands: &[
        "docschema check                   # Fail if any record cannot be synthesized",
        "docschema -q check                # Only print errors (useful in CI)",
    ],
}];

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub record: String,
    pub source: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub diagnostics: usize,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub failed: usize,
    pub records: Vec<CheckEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<FileFailure>,
}

impl CheckReport {
    pub fn new(outcome: &ScanOutcome) -> Self {
        let records: Vec<CheckEntry> = outcome
            .records
            .iter()
            .map(|record| CheckEntry {
                record: record.record.clone(),
                source: record.source.clone(),
                ok: record.synthesis.is_ok(),
                error: record.synthesis.result.as_ref().err().map(ToString::to_string),
                diagnostics: record.synthesis.diagnostics.len(),
            })
            .collect();

        Self {
            checked: records.len(),
            failed: records.iter().filter(|entry| !entry.ok).count(),
            records,
            unreadable: outcome.failures.clone(),
        }
    }
}

impl TableDisplay for CheckReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(&mut table, options, &["Record", "Source", "Status", "Diagnostics"]);
        for entry in &self.records {
            let status = if entry.ok { "ok" } else { "failed" };
            table.add_row(vec![
                Cell::new(&entry.record),
                Cell::new(&entry.source),
                Cell::new(status),
                Cell::new(entry.diagnostics),
            ]);
        }
        for failure in &self.unreadable {
            table.add_row(vec![Cell::new("-"), Cell::new(&failure.source), Cell::new("unreadable"), Cell::new("-")]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "checked={} failed={} unreadable={}",
            self.checked,
            self.failed,
            self.unreadable.len()
        )
    }
}

pub fn handle_check(args: CheckArgs, ctx: &ProjectContext, output: &OutputManager) -> Result<()> {
    let outcome = scan(ctx, &args.scan, output)?;
    let report = CheckReport::new(&outcome);

    if !output.is_machine_readable() {
        report_file_failures(&outcome.failures, output);
        for record in &outcome.records {
            report_diagnostics(record, output);
            if let Err(err) = &record.synthesis.result {
                output.error(&format!("{}: {err}", record.record));
            }
        }
    }
    output.display(&report)?;

    if report.failed > 0 {
        anyhow::bail!("{} of {} record(s) failed synthesis", report.failed, report.checked);
    }
    if !report.unreadable.is_empty() {
        anyhow::bail!("{} file(s) could not be inspected", report.unreadable.len());
    }

    output.success(&format!("All {} record(s) synthesized", report.checked));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScannedRecord;
    use docschema::{DeclaredType, RecordDefinition, SourcePosition, SynthesisOptions, synthesize};

    fn scanned(name: &str, annotation: &str, ty: DeclaredType) -> ScannedRecord {
        let record = RecordDefinition::new(name, SourcePosition::new("src/lib.rs", 1, 1)).with_field(
            "Value",
            ty,
            Some(annotation),
        );
        ScannedRecord {
            record: name.to_string(),
            source: "src/lib.rs".to_string(),
            synthesis: synthesize(&record, &SynthesisOptions::default()),
        }
    }

    #[test]
    fn test_report_counts_failures() {
        let outcome = ScanOutcome {
            records: vec![
                scanned("Good", "value,unique", DeclaredType::string()),
                scanned("Bad", "value,unique", DeclaredType::float()),
                scanned("Noisy", "value,a=b=c", DeclaredType::string()),
            ],
            failures: vec![FileFailure {
                source: "src/broken.rs".to_string(),
                message: "failed to parse".to_string(),
            }],
        };
        let report = CheckReport::new(&outcome);
        assert_eq!(report.checked, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.records[2].diagnostics, 1);
        assert!(report.records[1].error.as_deref().unwrap().contains("unique"));
        assert_eq!(report.to_compact(), "checked=3 failed=1 unreadable=1");
    }

    #[test]
    fn test_check_fails_on_fatal_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/lib.rs"),
            "#[store]\nstruct Counter {\n    #[store(\"-,key\")]\n    id: u64,\n}\n",
        )
        .unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        let output = OutputManager::new(GlobalOptions {
            quiet: true,
            ..Default::default()
        });
        let err = handle_check(CheckArgs { scan: ScanArgs::default() }, &ctx, &output).unwrap_err();
        assert!(err.to_string().contains("1 of 1"));
    }

    #[test]
    fn test_check_fails_on_uninspectable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/broken.rs"), "#[store]\nstruct {").unwrap();
        std::fs::write(dir.path().join("src/user.rs"), "#[store]\nstruct User {\n    name: String,\n}\n").unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        let output = OutputManager::new(GlobalOptions {
            quiet: true,
            ..Default::default()
        });
        let err = handle_check(CheckArgs { scan: ScanArgs::default() }, &ctx, &output).unwrap_err();
        assert!(err.to_string().contains("1 file(s) could not be inspected"));
    }
}
