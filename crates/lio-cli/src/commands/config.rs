//! `lio config`: write or print the analysis configuration.

use std::path::Path;

use anyhow::{bail, Context, Result};
use lio_algo::AnalysisConfig;
use lio_cli::ConfigCommands;
use tracing::info;

pub fn handle(config: AnalysisConfig, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { path, force } => init(path, *force),
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    AnalysisConfig::default()
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    info!("config written to {}", path.display());
    Ok(())
}
