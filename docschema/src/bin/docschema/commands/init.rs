use anyhow::{Context, Result};
use clap::Args;

use crate::context::{DocschemaConfig, ProjectContext};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Project Setup",
    commands: &[
        "docschema init                    # Write .docschema/config.toml with defaults",
        "docschema init --force            # Overwrite an existing configuration",
    ],
}];

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

pub fn handle_init(args: InitArgs, ctx: &ProjectContext, output: &OutputManager) -> Result<()> {
    if ctx.is_initialized() && !args.force {
        output.warning(&format!("{} already exists", ctx.config_path.display()));
        output.info("Use --force to overwrite it.");
        return Ok(());
    }

    std::fs::create_dir_all(&ctx.docschema_dir)
        .with_context(|| format!("Failed to create {}", ctx.docschema_dir.display()))?;

    let content = toml::to_string_pretty(&DocschemaConfig::default()).context("Failed to serialize config")?;
    std::fs::write(&ctx.config_path, content)
        .with_context(|| format!("Failed to write {}", ctx.config_path.display()))?;

    output.success(&format!("Created {}", ctx.config_path.display()));
    output.info("Mark stored structs with #[store] and run 'docschema inspect'.");
    Ok(())
}
