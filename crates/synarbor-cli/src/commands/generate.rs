//! Whole-network generation and ECLREC export

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, info};

use synarbor_core::{engine, ConnectionType, OperatingMode};
use synarbor_storage::{eclrec, CellId, ConnectionStore, EclRecord};

use super::ModeArg;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::network::NetworkConfig;

/// Generate every arbor of a network and export the synapses
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Network description (.toml)
    #[arg(short, long)]
    pub network: PathBuf,

    /// Output ECLREC file
    #[arg(short, long)]
    pub out: PathBuf,

    /// Replay mode for every connection type (default: each one's configured mode)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Keep only skip lists between the recording and replay passes
    #[arg(long)]
    pub compact: bool,
}

/// Per-connection-type totals
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerateStats {
    /// Synapses written
    pub written: u64,
    /// Synapses dropped for falling below the strength threshold
    pub below_threshold: u64,
    /// Candidates skipped by the topology rules
    pub skipped: u64,
}

impl GenerateCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let network = NetworkConfig::load(&self.network)?;
        let conntypes = network.build()?;
        info!(
            "Network '{}': {} connection types",
            network.network.name,
            conntypes.len()
        );

        let total: u64 = conntypes.iter().map(|ct| ct.cell_count() as u64).sum();
        let progress = if config.preferences.show_progress {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {pos}/{len} arbors")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut records = Vec::new();
        for ct in &conntypes {
            let mode = self.mode.map(OperatingMode::from).unwrap_or(ct.mode());
            progress.set_message(ct.id().to_string());
            let stats = self.generate_conntype(ct, mode, &progress, &mut records)?;
            info!(
                "{} ({:?}): {} synapses, {} below threshold, {} skipped",
                ct.id(),
                mode,
                stats.written,
                stats.below_threshold,
                stats.skipped
            );
        }
        progress.finish_and_clear();

        eclrec::save(&self.out, &records)?;
        info!("Wrote {} records to {}", records.len(), self.out.display());
        Ok(())
    }

    fn generate_conntype(
        &self,
        ct: &ConnectionType,
        mode: OperatingMode,
        progress: &ProgressBar,
        records: &mut Vec<EclRecord>,
    ) -> CliResult<GenerateStats> {
        if self.compact && mode == OperatingMode::Fetch {
            return Err(CliError::invalid_args(format!(
                "{} is fetched, which needs the payload that --compact discards",
                ct.id()
            )));
        }
        let store: Option<ConnectionStore> = match mode {
            OperatingMode::Generate => None,
            _ => Some(engine::generate_store(ct, self.compact)?),
        };
        if let Some(store) = &store {
            let stats = store.stats();
            debug!(
                "{}: recorded store holds {} bytes",
                ct.id(),
                stats.memory_bytes
            );
        }

        let mut stats = GenerateStats::default();
        for cell in 0..ct.cell_count() {
            let run = engine::replay_arbor(ct, cell, mode, store.as_ref())?;
            stats.skipped += run.skipped as u64;
            for synapse in &run.synapses {
                if synapse.below_threshold {
                    stats.below_threshold += 1;
                    continue;
                }
                records.push(EclRecord::new(
                    synapse.lij,
                    CellId::new(cell),
                    synapse.cij.to_s15(),
                    ct.id(),
                ));
                stats.written += 1;
            }
            progress.inc(1);
        }
        Ok(stats)
    }
}
