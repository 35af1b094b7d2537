//! Network description scaffolding

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::network;

/// Write a commented sample network description
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Path of the network file to create
    pub path: PathBuf,

    /// Network name recorded in the file
    #[arg(long, default_value = "sample")]
    pub name: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(self) -> CliResult<()> {
        if self.path.exists() && !self.force {
            return Err(CliError::invalid_args(format!(
                "{} already exists (use --force to overwrite)",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, network::sample(&self.name))?;

        info!("Network description written to {}", self.path.display());
        info!(
            "Run 'synarbor generate --network {} --out synapses.ecl' next",
            self.path.display()
        );
        Ok(())
    }
}
