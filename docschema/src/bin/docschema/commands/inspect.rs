use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use docschema::{Diagnostic, FieldRecord, SchemaModel};
use serde::Serialize;

use super::{ScanArgs, report_diagnostics, report_file_failures, scan};
use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, add_table_header, create_table};
use crate::scanner::ScannedRecord;
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Inspect Models",
        commands: &[
            "docschema inspect                 # Show the model of every record",
            "docschema inspect User            # Show the model of the User record",
            "docschema inspect --path models   # Scan a different directory",
        ],
    },
    ExampleGroup {
        title: "Scripting",
        commands: &["docschema --output json inspect User | jq '.model.fields'"],
    },
];

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Record to show (optional, shows all if omitted)
    pub record: Option<String>,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// One record as shown by `inspect`
#[derive(Debug, Serialize)]
pub struct RecordReport<'a> {
    pub record: &'a str,
    pub source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a SchemaModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "no_diagnostics")]
    pub diagnostics: &'a [Diagnostic],
}

fn no_diagnostics(diagnostics: &&[Diagnostic]) -> bool {
    diagnostics.is_empty()
}

impl<'a> RecordReport<'a> {
    pub fn new(scanned: &'a ScannedRecord) -> Self {
        let (model, error) = match &scanned.synthesis.result {
            Ok(model) => (Some(model), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            record: &scanned.record,
            source: &scanned.source,
            model,
            error,
            diagnostics: &scanned.synthesis.diagnostics,
        }
    }
}

impl TableDisplay for RecordReport<'_> {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);

        let Some(model) = self.model else {
            table.add_row(vec![Cell::new(self.record), Cell::new(self.error.as_deref().unwrap_or_default())]);
            return table;
        };

        add_table_header(&mut table, options, &["Field", "Storage key", "Type", "Flags", "Indexes"]);
        for field in model.fields() {
            let indexes: Vec<&str> = field.indexes.iter().map(|index| index.name.as_str()).collect();
            table.add_row(vec![
                Cell::new(&field.logical_path),
                Cell::new(&field.storage_key),
                Cell::new(&field.type_name),
                Cell::new(field_flags(field).join(" ")),
                Cell::new(indexes.join(", ")),
            ]);
        }

        table
    }

    fn to_compact(&self) -> String {
        match self.model {
            Some(model) => format!(
                "{} {} fields={} id={} unique={} indexes={} meta={}",
                self.record,
                self.source,
                model.fields().len(),
                model.identifier().map_or("-", |id| id.field_name.as_str()),
                model.unique().entries.len(),
                model.indexes().entries.len(),
                if model.meta_fields().enabled { "on" } else { "off" },
            ),
            None => format!(
                "{} {} error: {}",
                self.record,
                self.source,
                self.error.as_deref().unwrap_or_default()
            ),
        }
    }
}

fn field_flags(field: &FieldRecord) -> Vec<String> {
    let mut flags = Vec::new();
    if field.is_identifier {
        flags.push(format!("{} id", ICONS.key));
    }
    if field.is_unique {
        flags.push("unique".to_string());
    }
    if field.is_sequence {
        flags.push("seq".to_string());
    }
    if !field.optional_ancestors.is_empty() {
        flags.push(format!("optional({})", field.optional_ancestors.join(",")));
    }
    flags
}

pub fn handle_inspect(args: InspectArgs, ctx: &ProjectContext, output: &OutputManager) -> Result<()> {
    let outcome = scan(ctx, &args.scan, output)?;
    report_file_failures(&outcome.failures, output);
    let mut scanned = outcome.records;

    if let Some(name) = &args.record {
        scanned.retain(|record| &record.record == name);
        if scanned.is_empty() {
            anyhow::bail!("Record '{name}' not found");
        }
    }

    if scanned.is_empty() {
        output.info("No records found. Mark structs with #[store] to include them.");
        return Ok(());
    }

    if output.is_machine_readable() {
        let reports: Vec<RecordReport> = scanned.iter().map(RecordReport::new).collect();
        return output.display(&reports);
    }

    for record in &scanned {
        let report = RecordReport::new(record);
        output.heading(&format!("{} ({})", record.record, record.source));
        report_diagnostics(record, output);

        match &record.synthesis.result {
            Ok(model) => {
                show_summary(model, output);
                output.display(&report)?;
            }
            Err(err) => output.error(&err.to_string()),
        }
    }

    Ok(())
}

fn show_summary(model: &SchemaModel, output: &OutputManager) {
    let identifier = model.identifier().map_or_else(
        || "none".to_string(),
        |id| format!("{} ({:?}, accessor {})", id.field_name, id.generation, id.accessor),
    );
    let collection = if model.is_sub_collection() {
        format!("{} (subcollection)", model.collection_name())
    } else {
        model.collection_name().to_string()
    };
    output.key_value("Collection", &collection);
    output.key_value("Identifier", &identifier);
    output.key_value(
        "Meta fields",
        if model.meta_fields().enabled { "enabled" } else { "disabled" },
    );

    let indexes = model.indexes();
    let registry = match (&indexes.registry_name, indexes.enabled) {
        (Some(name), true) => name.clone(),
        _ => "none".to_string(),
    };
    output.key_value("Index registry", &registry);

    for entry in &model.unique().entries {
        output.bullet(&format!("unique {} {} {}", entry.field_path, ICONS.arrow, entry.storage_name));
    }
    for entry in &indexes.entries {
        output.bullet(&format!("index {} {} {}", entry.field_path, ICONS.arrow, entry.storage_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use docschema::{DeclaredType, RecordDefinition, SourcePosition, SynthesisOptions, synthesize};

    fn scanned(record: RecordDefinition) -> ScannedRecord {
        ScannedRecord {
            record: record.name.clone(),
            source: "src/models.rs".to_string(),
            synthesis: synthesize(&record, &SynthesisOptions::default()),
        }
    }

    fn user() -> RecordDefinition {
        RecordDefinition::new("User", SourcePosition::new("src/models.rs", 1, 1))
            .with_field("ID", DeclaredType::string(), Some("-,key=auto"))
            .with_field("Email", DeclaredType::string(), Some("email,unique"))
            .with_field("Tags", DeclaredType::sequence(DeclaredType::string()), Some("tags,index"))
    }

    #[test]
    fn test_compact_summary() {
        let record = scanned(user());
        let report = RecordReport::new(&record);
        assert_eq!(
            report.to_compact(),
            "User src/models.rs fields=3 id=ID unique=1 indexes=1 meta=off"
        );
    }

    #[test]
    fn test_table_lists_every_field() {
        let record = scanned(user());
        let options = GlobalOptions {
            no_color: true,
            ..Default::default()
        };
        let table = RecordReport::new(&record).to_table(&options).to_string();
        assert!(table.contains("Email"));
        assert!(table.contains("unique"));
        assert!(table.contains("seq"));
    }

    #[test]
    fn test_failed_record_reports_error() {
        let broken = RecordDefinition::new("Broken", SourcePosition::new("src/models.rs", 1, 1)).with_field(
            "Count",
            DeclaredType::integer(),
            Some("count,unique"),
        );
        let record = scanned(broken);
        let report = RecordReport::new(&record);
        assert!(report.model.is_none());
        assert!(report.to_compact().contains("error:"));

        let manager = OutputManager::new(GlobalOptions {
            output_format: OutputFormat::Json,
            ..Default::default()
        });
        let json = manager.render(&vec![report]).unwrap().unwrap();
        assert!(json.contains("\"error\""));
        assert!(!json.contains("\"model\""));
    }
}
