//! Error types for connectivity generation
//!
//! Rejected candidates and sub-threshold strengths are ordinary outcomes and
//! never surface here. Everything in [`GenError`] is a model-construction
//! inconsistency: continuing past one would desynchronize the skip-list
//! accounting between operating modes, so callers are expected to stop.

use synarbor_storage::{CellId, ConnTypeId, StorageError};
use thiserror::Error;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenError>;

/// Errors that can occur while generating connectivity
#[derive(Error, Debug)]
pub enum GenError {
    /// Storage layer error
    #[error("Storage error: {source}")]
    Storage {
        #[from]
        /// Source storage error
        source: StorageError,
    },

    /// Connection type parameters are inconsistent
    #[error("Invalid connection type {conntype}: {reason}")]
    InvalidConnType {
        /// Offending connection type
        conntype: ConnTypeId,
        /// What is wrong with it
        reason: String,
    },

    /// A context was queried before producing any synapse
    #[error("{conntype} on {cell}: generation context queried before initialization")]
    Uninitialized {
        /// Offending connection type
        conntype: ConnTypeId,
        /// Target cell
        cell: CellId,
    },

    /// A scan rule ran past its declared region before `nc` synapses
    #[error("{conntype} on {cell}: scan rule ran past its region at candidate {jsyn}")]
    ScanOverrun {
        /// Offending connection type
        conntype: ConnTypeId,
        /// Target cell
        cell: CellId,
        /// Candidate number at which the scan overran
        jsyn: u32,
    },

    /// Regeneration rejected a candidate the stored skip list accepted
    #[error("{conntype} on {cell}: candidate {jsyn} disagrees with the stored skip list")]
    SkipListMismatch {
        /// Offending connection type
        conntype: ConnTypeId,
        /// Target cell
        cell: CellId,
        /// Candidate number that disagreed
        jsyn: u32,
    },

    /// Fetch ran out of stored payload
    #[error("{conntype} on {cell}: no stored source index for candidate {jsyn}")]
    FetchExhausted {
        /// Offending connection type
        conntype: ConnTypeId,
        /// Target cell
        cell: CellId,
        /// Candidate number that had no payload
        jsyn: u32,
    },

    /// A stored-strength method was used with nothing stored
    #[error("{conntype} on {cell}: stored strength requested but none is held")]
    MissingStoredStrength {
        /// Offending connection type
        conntype: ConnTypeId,
        /// Target cell
        cell: CellId,
    },
}

impl GenError {
    /// Create an invalid connection type error
    pub fn invalid_conntype(conntype: ConnTypeId, reason: impl Into<String>) -> Self {
        Self::InvalidConnType {
            conntype,
            reason: reason.into(),
        }
    }

    /// Connection type named by the error, if any
    pub fn conntype(&self) -> Option<ConnTypeId> {
        match self {
            Self::Storage { .. } => None,
            Self::InvalidConnType { conntype, .. }
            | Self::Uninitialized { conntype, .. }
            | Self::ScanOverrun { conntype, .. }
            | Self::SkipListMismatch { conntype, .. }
            | Self::FetchExhausted { conntype, .. }
            | Self::MissingStoredStrength { conntype, .. } => Some(*conntype),
        }
    }
}
