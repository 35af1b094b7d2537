//! Cross-mode consistency check

use clap::Args;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use synarbor_core::{engine, ArborRun, ConnectionType};
use synarbor_storage::CellId;

use crate::error::{CliError, CliResult};
use crate::network::NetworkConfig;

/// Check that Generate, Regenerate and Fetch agree on every arbor
#[derive(Args, Debug)]
pub struct VerifyCommand {
    /// Network description (.toml)
    #[arg(short, long)]
    pub network: PathBuf,

    /// Check only the first N cells of each connection type
    #[arg(long)]
    pub cells: Option<u32>,
}

/// Outcome of checking one connection type
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerifyStats {
    /// Cells compared
    pub cells: u32,
    /// Cells whose replays disagreed
    pub mismatches: u32,
}

impl VerifyCommand {
    pub fn execute(self) -> CliResult<()> {
        let network = NetworkConfig::load(&self.network)?;
        let conntypes = network.build()?;

        let mut failed = 0u32;
        for ct in &conntypes {
            let stats = verify_conntype(ct, self.cells)?;
            if stats.mismatches > 0 {
                warn!(
                    "{}: {} of {} cells diverged",
                    ct.id(),
                    stats.mismatches,
                    stats.cells
                );
                failed += 1;
            } else {
                info!("{}: {} cells consistent", ct.id(), stats.cells);
            }
        }

        if failed > 0 {
            return Err(CliError::Divergence(format!(
                "{} of {} connection types diverged",
                failed,
                conntypes.len()
            )));
        }
        info!("All {} connection types consistent", conntypes.len());
        Ok(())
    }
}

/// Replay every cell in all three modes and count disagreements
pub fn verify_conntype(ct: &ConnectionType, limit: Option<u32>) -> CliResult<VerifyStats> {
    let full = engine::generate_store(ct, false)?;
    let compacted = engine::generate_store(ct, true)?;
    let cells = limit.map_or(ct.cell_count(), |n| n.min(ct.cell_count()));

    let mut stats = VerifyStats::default();
    for cell in 0..cells {
        let generated = engine::generate_arbor(ct, cell, false)?;
        let id = CellId::new(cell);
        let (Some(stored), Some(skips)) = (full.get(id), compacted.get(id)) else {
            warn!("{}: cell {} missing from the recorded store", ct.id(), cell);
            stats.mismatches += 1;
            stats.cells += 1;
            continue;
        };
        let regenerated = engine::regenerate_arbor(ct, cell, skips)?;
        let fetched = engine::fetch_arbor(ct, cell, stored)?;

        let mut agree = true;
        for (label, other) in [("regenerate", &regenerated), ("fetch", &fetched)] {
            if let Some(reason) = compare(&generated, other) {
                warn!("{} cell {}: {} differs, {}", ct.id(), cell, label, reason);
                agree = false;
            }
        }
        if !agree {
            stats.mismatches += 1;
        }
        stats.cells += 1;
    }
    debug!("{}: compared {} cells", ct.id(), stats.cells);
    Ok(stats)
}

fn compare(expected: &ArborRun, actual: &ArborRun) -> Option<String> {
    if expected.synapses.len() != actual.synapses.len() {
        return Some(format!(
            "{} synapses instead of {}",
            actual.synapses.len(),
            expected.synapses.len()
        ));
    }
    if expected.skipped != actual.skipped {
        return Some(format!(
            "{} skipped instead of {}",
            actual.skipped, expected.skipped
        ));
    }
    expected
        .synapses
        .iter()
        .zip(&actual.synapses)
        .find(|(a, b)| a != b)
        .map(|(a, b)| format!("synapse {} is {:?}, expected {:?}", a.isyn, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{self, NetworkConfig};

    #[test]
    fn test_sample_network_is_consistent() {
        let network = NetworkConfig::parse(&network::sample("verify")).unwrap();
        for ct in network.build().unwrap() {
            let stats = verify_conntype(&ct, Some(6)).unwrap();
            assert_eq!(stats.cells, 6);
            assert_eq!(stats.mismatches, 0);
        }
    }

    #[test]
    fn test_compare_reports_first_difference() {
        let network = NetworkConfig::parse(&network::sample("verify")).unwrap();
        let ct = &network.build().unwrap()[0];
        let run = (0..ct.cell_count())
            .map(|cell| engine::generate_arbor(ct, cell, false).unwrap())
            .find(|run| !run.synapses.is_empty())
            .unwrap();
        assert!(compare(&run, &run).is_none());

        let mut shorter = run.clone();
        shorter.synapses.pop();
        assert!(compare(&run, &shorter).unwrap().contains("synapses instead of"));

        let mut altered = run.clone();
        altered.skipped += 1;
        assert!(compare(&run, &altered).unwrap().contains("skipped"));
    }
}
