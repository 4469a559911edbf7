//! Command implementations

mod config;
mod delete;
mod list;
mod show;
mod simulate;
mod upload;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::{bail, Result};
use orbitcap_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::PathBuf;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let mut overrides = CliConfigOverrides {
        captures_root: cli.root,
        backend_url: cli.backend,
        ..Default::default()
    };
    if let Commands::Simulate(args) = &cli.command {
        simulate::apply_overrides(args, &mut overrides)?;
    }
    let config = load_config(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::List(args) => list::execute(args, &config, &output).await,
        Commands::Show(args) => show::execute(args, &config, &output).await,
        Commands::Delete(args) => delete::execute(args, &config, &output).await,
        Commands::Upload(args) => upload::execute(args, &config, &output).await,
        Commands::Config => config::execute(&config, &output),
        Commands::Simulate(args) => simulate::execute(args, &config, &output).await,
    }
}

/// Resolve a capture folder name under the captures root
fn capture_dir(config: &LayeredConfig, name: &str) -> Result<PathBuf> {
    let dir = config.captures_root.value.join(name);
    if !dir.is_dir() {
        bail!(
            "Capture folder '{}' not found in {}. Run 'orbitcap list' to see available captures.",
            name,
            config.captures_root.value.display()
        );
    }
    Ok(dir)
}
