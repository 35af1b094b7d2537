//! On-demand synthesis of sparse synaptic topology and strength
//!
//! For every (target cell, connection type) pair this crate re-derives,
//! synapse by synapse, the source index (Lij), strength (Cij) and optional
//! delay (Dij) of an arbor without ever holding a dense connectivity matrix.
//! Results are bit-for-bit reproducible whether an arbor is generated fresh,
//! regenerated from its seeds and skip list, or fetched from stored indices.
//!
//! ```no_run
//! use synarbor_core::{
//!     engine, ConnectionType, PrimaryRule, SourceGeometry, TargetGeometry,
//! };
//! use synarbor_storage::ConnTypeId;
//!
//! let conntype = ConnectionType::builder(
//!     ConnTypeId::new(1),
//!     SourceGeometry::new(32, 32, 1),
//!     TargetGeometry::new(16, 16, 4),
//!     24,
//! )
//! .with_primary(PrimaryRule::Uniform { wx: 5, wy: 5, ox: 0, oy: 0 })
//! .build()?;
//!
//! let arbor = engine::generate_arbor(&conntype, 0, false)?;
//! println!("{} synapses", arbor.nuk());
//! # Ok::<(), synarbor_core::GenError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod bits;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod prng;

// Generation
pub mod bounds;
pub mod conntype;
pub mod context;
pub mod delay;
pub mod engine;
pub mod rules;
pub mod strength;
pub mod subarbor;

// Re-export essential types
pub use bounds::{BoundsManager, BoundsState};
pub use conntype::{ConnectionType, ConnectionTypeBuilder, DrawBudget, OperatingMode, Seeds};
pub use context::{ArborSummary, Candidate, GenerationContext, ModeSource, Synapse};
pub use delay::DelayRule;
pub use engine::ArborRun;
pub use error::{GenError, Result};
pub use geometry::{Loc, SourceGeometry, TargetCell, TargetGeometry};
pub use kernel::{Kernel, KernelEntry};
pub use prng::{Prng, Seed};
pub use rules::{PrimaryRule, SecondaryRule, Step};
pub use strength::{round_cij, Cij, Strength, StrengthRule, StrengthSpec};
pub use subarbor::SubarborMode;
