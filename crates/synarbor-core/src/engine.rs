//! Arbor-level drivers
//!
//! Convenience loops over [`GenerationContext`] for whole arbors and whole
//! connection types, plus conversion between stored arbors and persisted
//! ECLREC records.

use std::collections::BTreeMap;

use synarbor_storage::{ArborBuffer, CellId, ConnectionStore, EclRecord, StorageError};

use crate::conntype::{ConnectionType, OperatingMode};
use crate::context::{GenerationContext, ModeSource, Synapse};
use crate::error::{GenError, Result};
use crate::strength::Cij;

/// Everything produced for one arbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArborRun {
    /// Cell that received the arbor
    pub cell: CellId,
    /// Accepted synapses in order
    pub synapses: Vec<Synapse>,
    /// Skipped candidates
    pub skipped: u32,
    /// Recorded buffer, when generating with recording on
    pub buffer: Option<ArborBuffer>,
}

impl ArborRun {
    /// Accepted synapses (`nuk`)
    pub fn nuk(&self) -> u32 {
        self.synapses.len() as u32
    }

    /// Synapses whose strength fell below threshold
    pub fn below_threshold(&self) -> usize {
        self.synapses.iter().filter(|s| s.below_threshold).count()
    }
}

/// Drive a context to the end of its arbor
pub fn run_arbor(conntype: &ConnectionType, cell: u32, source: ModeSource<'_>) -> Result<ArborRun> {
    let mut ctx = GenerationContext::new(conntype, cell, source)?;
    let mut synapses = Vec::with_capacity(conntype.nc() as usize);
    while let Some(synapse) = ctx.next_synapse()? {
        synapses.push(synapse);
    }
    let summary = ctx.finish();
    Ok(ArborRun {
        cell: CellId::new(cell),
        synapses,
        skipped: summary.skipped,
        buffer: summary.buffer,
    })
}

/// Generate one arbor from the rules
pub fn generate_arbor(conntype: &ConnectionType, cell: u32, record: bool) -> Result<ArborRun> {
    run_arbor(conntype, cell, ModeSource::Generate { record })
}

/// Regenerate one arbor from seeds and a stored skip list
pub fn regenerate_arbor(
    conntype: &ConnectionType,
    cell: u32,
    buffer: &ArborBuffer,
) -> Result<ArborRun> {
    run_arbor(conntype, cell, ModeSource::Regenerate(buffer))
}

/// Fetch one arbor from stored source indices
pub fn fetch_arbor(conntype: &ConnectionType, cell: u32, buffer: &ArborBuffer) -> Result<ArborRun> {
    run_arbor(conntype, cell, ModeSource::Fetch(buffer))
}

/// Generate every arbor of a connection type into a store
///
/// With `compact` set, payloads are dropped afterwards and only skip lists
/// remain, which is enough for [`OperatingMode::Regenerate`].
pub fn generate_store(conntype: &ConnectionType, compact: bool) -> Result<ConnectionStore> {
    let mut store = ConnectionStore::new(conntype.id(), conntype.nc());
    for cell in 0..conntype.cell_count() {
        let run = generate_arbor(conntype, cell, true)?;
        if let Some(buffer) = run.buffer {
            store.insert(run.cell, buffer);
        }
    }
    if compact {
        store.compact_all();
    }
    let stats = store.stats();
    log::debug!(
        "{}: {} arbors, {} accepted, {} skipped",
        conntype.id(),
        stats.arbors,
        stats.accepted,
        stats.skipped
    );
    Ok(store)
}

/// Replay one arbor in `mode`, taking stored arbors from `store`
pub fn replay_arbor(
    conntype: &ConnectionType,
    cell: u32,
    mode: OperatingMode,
    store: Option<&ConnectionStore>,
) -> Result<ArborRun> {
    if mode == OperatingMode::Generate {
        return generate_arbor(conntype, cell, false);
    }
    let buffer = store
        .and_then(|s| s.get(CellId::new(cell)))
        .ok_or_else(|| {
            GenError::from(StorageError::invalid_format(format!(
                "{} has no stored arbor for cell {}",
                conntype.id(),
                cell
            )))
        })?;
    match mode {
        OperatingMode::Fetch => fetch_arbor(conntype, cell, buffer),
        _ => regenerate_arbor(conntype, cell, buffer),
    }
}

/// Replay every arbor of a connection type in its configured mode
pub fn run_configured(
    conntype: &ConnectionType,
    store: Option<&ConnectionStore>,
) -> Result<Vec<ArborRun>> {
    (0..conntype.cell_count())
        .map(|cell| replay_arbor(conntype, cell, conntype.mode(), store))
        .collect()
}

/// Flatten a store into persisted records, one per synapse at or above the
/// strength threshold
///
/// Cells without a held payload are rejected; stores kept only for
/// regeneration must be regenerated first.
pub fn export_records(conntype: &ConnectionType, store: &ConnectionStore) -> Result<Vec<EclRecord>> {
    let spec = conntype.strength();
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (cell, buffer) in store.iter() {
        for (isyn, &lij) in buffer.accepted_lij()?.iter().enumerate() {
            let strength = match buffer.strength(isyn as u32) {
                Some(value) => {
                    if spec.classify(Cij::from_s15(value)).below_threshold {
                        dropped += 1;
                        continue;
                    }
                    value
                }
                None => 0,
            };
            records.push(EclRecord::new(lij, cell, strength, conntype.id()));
        }
    }
    if dropped > 0 {
        log::debug!(
            "{}: {} synapses below threshold left out of the export",
            conntype.id(),
            dropped
        );
    }
    Ok(records)
}

/// Rebuild a store from persisted records
///
/// Records of other connection types are ignored. Each arbor's skip list is
/// recovered by generating the cell again and matching its accepted sources
/// against the records, with below-threshold synapses missing from the
/// records put back. Arbors the rules cannot reproduce keep their records
/// as they are, and the candidates missing from them are assumed to trail.
pub fn import_records(conntype: &ConnectionType, records: &[EclRecord]) -> Result<ConnectionStore> {
    let cells = conntype.cell_count();
    let size = conntype.source().size();
    let nc = conntype.nc();
    let mut arbors: BTreeMap<u32, (Vec<u32>, Vec<i16>)> = BTreeMap::new();
    for record in records.iter().filter(|r| r.conntype_id() == conntype.id()) {
        let cell = record.target_cell().raw();
        if record.target < 0 || cell >= cells {
            return Err(StorageError::OutOfBounds {
                index: record.target as usize,
                max: cells as usize,
            }
            .into());
        }
        if record.source < 0 || record.source as u64 >= size {
            return Err(StorageError::OutOfBounds {
                index: record.source as usize,
                max: size as usize,
            }
            .into());
        }
        let entry = arbors.entry(cell).or_default();
        entry.0.push(record.source as u32);
        entry.1.push(record.strength);
    }

    let mut store = ConnectionStore::new(conntype.id(), nc);
    let mut assumed = 0usize;
    for cell in 0..cells {
        let (lij, strengths) = arbors.remove(&cell).unwrap_or_default();
        let buffer = match rebuild_arbor(conntype, cell, &lij, &strengths)? {
            Some(buffer) => buffer,
            None => {
                let skips: Vec<u32> = (lij.len() as u32..nc).collect();
                if !skips.is_empty() {
                    assumed += 1;
                }
                ArborBuffer::from_parts(nc, &lij, &skips, &strengths)?
            }
        };
        store.insert(CellId::new(cell), buffer);
    }
    if assumed > 0 {
        log::warn!(
            "{}: {} of {} imported arbors do not follow the rules; missing candidates assumed to trail",
            conntype.id(),
            assumed,
            cells
        );
    }
    Ok(store)
}

/// Match one cell's records against a fresh generation
///
/// Returns `None` when the records are not the generated arbor minus some of
/// its below-threshold synapses.
fn rebuild_arbor(
    conntype: &ConnectionType,
    cell: u32,
    lij: &[u32],
    strengths: &[i16],
) -> Result<Option<ArborBuffer>> {
    let mut ctx = GenerationContext::new(conntype, cell, ModeSource::Generate { record: true })?;
    let mut payload = Vec::with_capacity(lij.len());
    let mut kept = Vec::with_capacity(lij.len());
    let mut next = 0;
    while let Some(candidate) = ctx.next_lij()? {
        // Stored strengths cannot be regenerated; such arbors match on Lij alone.
        let strength = match ctx.cij() {
            Ok(strength) => Some(strength),
            Err(GenError::MissingStoredStrength { .. }) => None,
            Err(err) => return Err(err),
        };
        let matched = lij
            .get(next)
            .zip(strengths.get(next))
            .filter(|&(&l, &value)| {
                l == candidate.lij
                    && match strength {
                        Some(strength) if !conntype.external_strength() => {
                            value == strength.cij.to_s15()
                        }
                        _ => true,
                    }
            });
        match (matched, strength) {
            (Some((_, &value)), _) => {
                kept.push(value);
                next += 1;
            }
            (None, Some(strength)) if strength.below_threshold => {
                kept.push(strength.cij.to_s15());
            }
            (None, _) => return Ok(None),
        }
        payload.push(candidate.lij);
    }
    if next != lij.len() {
        return Ok(None);
    }
    let Some(recorded) = ctx.finish().buffer else {
        return Ok(None);
    };
    let skips: Vec<u32> = recorded.skips().collect();
    Ok(Some(ArborBuffer::from_parts(
        conntype.nc(),
        &payload,
        &skips,
        &kept,
    )?))
}
