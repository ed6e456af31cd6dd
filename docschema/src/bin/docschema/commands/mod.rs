pub mod check;
pub mod init;
pub mod inspect;
pub mod snapshot;

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::context::ProjectContext;
use crate::output::OutputManager;
use crate::scanner::{FileFailure, ScanOutcome, ScannedRecord, scan_records};

/// Arguments shared by every command that scans sources
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Directory to scan instead of the configured scan_dirs
    #[arg(long)]
    pub path: Option<PathBuf>,
}

/// Scan the project and report what was found in verbose mode
pub fn scan(ctx: &ProjectContext, args: &ScanArgs, output: &OutputManager) -> Result<ScanOutcome> {
    let dirs = ctx.scan_dirs(args.path.as_deref());
    for dir in &dirs {
        output.verbose(&format!("Scanning {}", dir.display()));
    }

    let outcome = scan_records(&ctx.project_root, &dirs, &ctx.config)?;
    output.verbose(&format!(
        "Found {} record(s), {} file(s) could not be inspected",
        outcome.records.len(),
        outcome.failures.len()
    ));
    Ok(outcome)
}

/// Print files that could not be inspected as errors
pub fn report_file_failures(failures: &[FileFailure], output: &OutputManager) {
    for failure in failures {
        output.error(&format!("{}: {}", failure.source, failure.message));
    }
}

/// Print the diagnostics of one record as warnings
pub fn report_diagnostics(record: &ScannedRecord, output: &OutputManager) {
    for diagnostic in &record.synthesis.diagnostics {
        output.warning(&format!("{}: {diagnostic}", record.record));
    }
}
