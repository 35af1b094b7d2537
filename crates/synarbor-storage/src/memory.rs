//! In-memory store of arbors for one connection type

use crate::{
    arbor::ArborBuffer,
    ids::{CellId, ConnTypeId},
};
use std::collections::BTreeMap;

/// Summary counters over a [`ConnectionStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of arbors held
    pub arbors: usize,
    /// Accepted synapses over all arbors
    pub accepted: u64,
    /// Skipped candidates over all arbors
    pub skipped: u64,
    /// Arbors whose payload has been discarded
    pub compacted: usize,
    /// Approximate heap footprint in bytes
    pub memory_bytes: usize,
}

/// Arbors of every target cell for one connection type, keyed by cell
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    conntype: ConnTypeId,
    nc: u32,
    arbors: BTreeMap<CellId, ArborBuffer>,
}

impl ConnectionStore {
    /// Create an empty store
    pub fn new(conntype: ConnTypeId, nc: u32) -> Self {
        Self {
            conntype,
            nc,
            arbors: BTreeMap::new(),
        }
    }

    /// Connection type served by this store
    pub fn conntype(&self) -> ConnTypeId {
        self.conntype
    }

    /// Declared synapse count per arbor
    pub fn nc(&self) -> u32 {
        self.nc
    }

    /// Store the arbor of `cell`, returning any previous one
    pub fn insert(&mut self, cell: CellId, arbor: ArborBuffer) -> Option<ArborBuffer> {
        debug_assert_eq!(arbor.nc(), self.nc);
        self.arbors.insert(cell, arbor)
    }

    /// Arbor of `cell`
    pub fn get(&self, cell: CellId) -> Option<&ArborBuffer> {
        self.arbors.get(&cell)
    }

    /// Remove the arbor of `cell`
    pub fn remove(&mut self, cell: CellId) -> Option<ArborBuffer> {
        self.arbors.remove(&cell)
    }

    /// Number of arbors held
    pub fn len(&self) -> usize {
        self.arbors.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.arbors.is_empty()
    }

    /// Arbors in ascending cell order
    pub fn iter(&self) -> impl Iterator<Item = (CellId, &ArborBuffer)> {
        self.arbors.iter().map(|(cell, arbor)| (*cell, arbor))
    }

    /// Discard the payload of every arbor, keeping skip lists
    pub fn compact_all(&mut self) {
        for arbor in self.arbors.values_mut() {
            arbor.compact();
        }
        log::debug!("{}: compacted {} arbors", self.conntype, self.arbors.len());
    }

    /// Summary counters
    pub fn stats(&self) -> StoreStats {
        self.arbors.values().fold(StoreStats::default(), |mut acc, arbor| {
            acc.arbors += 1;
            acc.accepted += arbor.accepted() as u64;
            acc.skipped += arbor.skipped() as u64;
            if !arbor.has_payload() {
                acc.compacted += 1;
            }
            acc.memory_bytes += arbor.memory_bytes();
            acc
        })
    }
}
