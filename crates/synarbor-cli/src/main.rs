//! # synarbor CLI
//!
//! Generates, inspects and verifies synthesized connectivity for a network
//! described in TOML.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use synarbor_cli::config::CliConfig;
use synarbor_cli::SynarborCli;

fn main() {
    // Parse CLI arguments
    let cli = SynarborCli::parse();

    // Initialize logging with environment variable support
    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        CliConfig::resolve(cli.config.as_deref())
            .ok()
            .and_then(|config| config.log_level)
            .unwrap_or_else(|| "info".to_string())
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute the command
    if let Err(err) = cli.execute() {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }
}
