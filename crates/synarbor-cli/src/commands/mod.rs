//! CLI command implementations for synarbor

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use synarbor_core::OperatingMode;

use crate::config::CliConfig;
use crate::error::CliResult;

pub mod generate;
pub mod init;
pub mod inspect;
pub mod verify;

/// synarbor - reproducible synthesis of sparse synaptic connectivity
#[derive(Parser, Debug)]
#[command(
    name = "synarbor",
    version,
    about = "Reproducible synthesis of sparse synaptic connectivity",
    long_about = "synarbor derives every synapse of a network's arbors on demand from \
                  seeds and connection rules, exports them as ECLREC records, and checks \
                  that generating, regenerating and fetching arbors agree."
)]
pub struct SynarborCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SYNARBOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a sample network description
    #[command(alias = "new")]
    Init(init::InitCommand),

    /// Generate every arbor of a network and export the synapses
    Generate(generate::GenerateCommand),

    /// Summarize or dump an ECLREC record file
    Inspect(inspect::InspectCommand),

    /// Check that Generate, Regenerate and Fetch agree
    Verify(verify::VerifyCommand),
}

/// Operating mode selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// Evaluate the rules
    Generate,
    /// Evaluate against stored skip lists
    Regenerate,
    /// Read stored source indices
    Fetch,
}

impl From<ModeArg> for OperatingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Generate => OperatingMode::Generate,
            ModeArg::Regenerate => OperatingMode::Regenerate,
            ModeArg::Fetch => OperatingMode::Fetch,
        }
    }
}

impl SynarborCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        let config = CliConfig::resolve(self.config.as_deref())?;

        match self.command {
            Commands::Init(cmd) => cmd.execute(),
            Commands::Generate(cmd) => cmd.execute(&config),
            Commands::Inspect(cmd) => cmd.execute(&config),
            Commands::Verify(cmd) => cmd.execute(),
        }
    }
}
