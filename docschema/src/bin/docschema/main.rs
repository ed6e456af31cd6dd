mod commands;
mod context;
mod examples;
mod output;
mod scanner;
mod theme;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{Styles, styling::AnsiColor},
    error::ErrorKind,
};

use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use commands::{
    check::{CheckArgs, handle_check},
    init::{InitArgs, handle_init},
    inspect::{InspectArgs, handle_inspect},
    snapshot::{SnapshotArgs, handle_snapshot},
};
use context::ProjectContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("RUST_LOG", "Log filter for internal diagnostics (e.g. docschema=debug)"),
    ("NO_COLOR", "Disable colored output"),
];

#[derive(Parser)]
#[command(name = "docschema")]
#[command(version)]
#[command(
    about = "Document store schema synthesis for annotated Rust records",
    long_about = r#"docschema reads structs marked with #[store] and shows how they map onto a document store:

• Flattened storage keys for nested records
• Identifier, unique and index declarations
• Bookkeeping meta fields (CreatedAt, UpdatedBy, Version, ...)

Commands:
  init      Write a default .docschema/config.toml
  inspect   Show synthesized schema models
  check     Fail when any record cannot be synthesized
  snapshot  Write schema models as JSON files
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Treat every record as having no meta fields
    #[arg(long, global = true)]
    disable_meta_fields: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        let matches = match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => matches,
            Err(err) => exit_with_clap_error(err),
        };
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| exit_with_clap_error(err))
    }
}

fn exit_with_clap_error(err: clap::error::Error) -> ! {
    let to_stdout = matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
    let blank = if to_stdout { print_blank_line_stdout } else { print_blank_line_stderr };

    let _ = blank();
    if let Err(print_err) = err.print()
        && print_err.kind() != io::ErrorKind::BrokenPipe
    {
        eprintln!("Failed to display help: {print_err}");
    }
    let _ = blank();
    std::process::exit(err.exit_code());
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.primary, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.secondary, false, use_color);
            let command_text = stylize(command, theme.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Use 'docschema <command> --help' to view examples for each command.",
        theme.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

/// clap counterpart of the colored theme used for regular output
fn help_styles() -> Styles {
    Styles::styled()
        .usage(AnsiColor::BrightBlue.on_default().bold())
        .header(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().bold())
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docschema in the current project
    Init(InitArgs),

    /// Show synthesized schema models
    Inspect(InspectArgs),

    /// Synthesize every record and fail on fatal schema errors
    Check(CheckArgs),

    /// Write one JSON schema model per record
    Snapshot(SnapshotArgs),
}

fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();

    let _ = print_blank_line_stdout();

    match execute(cli) {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let global_options = GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    let output = OutputManager::new(global_options);

    let mut ctx = ProjectContext::find()?;
    if cli.disable_meta_fields {
        ctx.config.synthesis.disable_meta_fields_detection = true;
    }
    output.verbose(&format!("Project root: {}", ctx.project_root.display()));

    match cli.command {
        Commands::Init(args) => handle_init(args, &ctx, &output)?,
        Commands::Inspect(args) => handle_inspect(args, &ctx, &output)?,
        Commands::Check(args) => handle_check(args, &ctx, &output)?,
        Commands::Snapshot(args) => handle_snapshot(args, &ctx, &output)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docschema", "inspect", "User", "--output", "json", "--disable-meta-fields"])
            .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.disable_meta_fields);
        match cli.command {
            Commands::Inspect(args) => assert_eq!(args.record.as_deref(), Some("User")),
            _ => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_examples_render_without_color() {
        let text = render_examples(commands::snapshot::EXAMPLES, false);
        assert!(text.starts_with("Examples:"));
        assert!(text.contains("docschema snapshot"));
    }
}
