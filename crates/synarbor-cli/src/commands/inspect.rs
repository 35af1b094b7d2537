//! ECLREC record file inspection

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::info;

use synarbor_core::Cij;
use synarbor_storage::{eclrec, EclHeader, EclRecord};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Summarize or dump an ECLREC record file
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Record file to inspect
    pub file: PathBuf,

    /// Output format (default from the CLI configuration)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of records to list
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

/// Inspection output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Machine-readable JSON report
    Json,
}

/// Totals for one connection type in a record file
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnTypeSummary {
    /// Connection type number
    pub conntype: u16,
    /// Records of this connection type
    pub records: u64,
    /// Distinct target cells
    pub targets: u64,
    /// Distinct source cells
    pub sources: u64,
    /// Smallest strength
    pub min_strength: f64,
    /// Largest strength
    pub max_strength: f64,
    /// Mean strength
    pub mean_strength: f64,
}

/// Everything `inspect` reports
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    /// File format version
    pub version: u32,
    /// Records in the file
    pub record_count: u64,
    /// CRC32 of the record bytes
    pub checksum: String,
    /// Per-connection-type totals
    pub conntypes: Vec<ConnTypeSummary>,
    /// First records of the file
    pub records: Vec<EclRecord>,
}

impl InspectReport {
    /// Build a report from a header and its records
    pub fn new(header: &EclHeader, records: &[EclRecord], limit: usize) -> Self {
        Self {
            version: header.version,
            record_count: header.record_count,
            checksum: format!("{:08x}", header.data_checksum),
            conntypes: summarize(records),
            records: records.iter().take(limit).copied().collect(),
        }
    }
}

#[derive(Default)]
struct Accumulator {
    records: u64,
    targets: BTreeSet<i32>,
    sources: BTreeSet<i32>,
    min: f64,
    max: f64,
    sum: f64,
}

fn summarize(records: &[EclRecord]) -> Vec<ConnTypeSummary> {
    let mut by_type: BTreeMap<u16, Accumulator> = BTreeMap::new();
    for record in records {
        let strength = Cij::from_s15(record.strength).to_f64();
        let acc = by_type.entry(record.conntype).or_default();
        if acc.records == 0 {
            acc.min = strength;
            acc.max = strength;
        } else {
            acc.min = acc.min.min(strength);
            acc.max = acc.max.max(strength);
        }
        acc.records += 1;
        acc.sum += strength;
        acc.targets.insert(record.target);
        acc.sources.insert(record.source);
    }
    by_type
        .into_iter()
        .map(|(conntype, acc)| ConnTypeSummary {
            conntype,
            records: acc.records,
            targets: acc.targets.len() as u64,
            sources: acc.sources.len() as u64,
            min_strength: acc.min,
            max_strength: acc.max,
            mean_strength: acc.sum / acc.records.max(1) as f64,
        })
        .collect()
}

impl InspectCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let format = match self.format {
            Some(format) => format,
            None => match config.preferences.output_format.as_str() {
                "json" => OutputFormat::Json,
                "text" => OutputFormat::Text,
                other => {
                    return Err(CliError::config(format!("unknown output format '{}'", other)))
                }
            },
        };

        info!("Inspecting {}", self.file.display());
        let data = std::fs::read(&self.file)?;
        let header = EclHeader::parse(&data)?;
        let records = eclrec::decode_records(&data)?;
        let report = InspectReport::new(&header, &records, self.limit);

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_text(&report),
        }
        Ok(())
    }
}

fn print_text(report: &InspectReport) {
    println!("ECLREC v{}", report.version);
    println!("records: {}", report.record_count);
    println!("checksum: {}", report.checksum);
    for ct in &report.conntypes {
        println!(
            "CT{}: {} records, {} targets, {} sources, strength {:.4}..{:.4} (mean {:.4})",
            ct.conntype,
            ct.records,
            ct.targets,
            ct.sources,
            ct.min_strength,
            ct.max_strength,
            ct.mean_strength
        );
    }
    if !report.records.is_empty() {
        println!("{:>10} {:>10} {:>8} {:>5}", "source", "target", "strength", "type");
        for record in &report.records {
            println!(
                "{:>10} {:>10} {:>8} {:>5}",
                record.source, record.target, record.strength, record.conntype
            );
        }
    }
}
