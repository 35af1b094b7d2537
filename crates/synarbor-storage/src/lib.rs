//! Storage layer for deterministic connectivity synthesis
//!
//! This crate holds everything the generator persists or keeps between
//! passes: the packed arbor buffers (accepted source indices plus a reversed
//! skip list sharing the same slots), a per-connection-type store of those
//! buffers, and the big-endian ECLREC synapse record format used for network
//! export and import.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod ids;
pub mod schemas;

// Buffers and formats
pub mod arbor;
pub mod eclrec;
pub mod memory;

// Re-export essential types
pub use arbor::ArborBuffer;
pub use eclrec::{EclHeader, EclRecord};
pub use error::{Result, StorageError};
pub use ids::{CellId, ConnTypeId};
pub use memory::{ConnectionStore, StoreStats};

/// Magic numbers for binary formats
pub mod magic {
    /// Record file magic number: "ECLR"
    pub const ECLR: [u8; 4] = [0x45, 0x43, 0x4C, 0x52];
}
