//! Synapse placement rules
//!
//! The primary family places the first synapse of an arbor (or every synapse,
//! when the secondary rule is [`SecondaryRule::Independent`]); the secondary
//! family places later synapses relative to the anchor the primary produced.
//! Every rule returns a [`Step`] and draws only from the [`Prng`] it is
//! handed, never more than its declared per-candidate budget.
//!
//! [`Prng`]: crate::prng::Prng

pub mod primary;
pub mod secondary;

pub use primary::PrimaryRule;
pub use secondary::{annulus_offsets, SecondaryRule};

use crate::geometry::{Loc, SourceGeometry, TargetCell, TargetGeometry};
use crate::kernel::Kernel;

/// Outcome of evaluating one candidate synapse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A candidate location; it still has to pass the bounds and
    /// self-avoidance checks
    Continue(Loc),
    /// Reject this candidate only
    Skip,
    /// Reject this candidate and every remaining one in the current
    /// (sub)arbor
    AbortArbor,
}

/// Read-only inputs shared by all rules for one (cell, connection type)
#[derive(Debug, Clone, Copy)]
pub struct RuleEnv<'a> {
    /// Source array
    pub source: &'a SourceGeometry,
    /// Target layer
    pub target: &'a TargetGeometry,
    /// Cell receiving the arbor
    pub cell: &'a TargetCell,
    /// Target group projected into source coordinates
    pub projected: (i32, i32),
    /// Kernel table for kernel-anchored rules
    pub kernel: Option<&'a Kernel>,
    /// Precomputed annulus offsets
    pub annulus: &'a [(i32, i32)],
}

/// A rectangular block of source positions, all elements included
///
/// Candidates inside the block are numbered element-fastest, then column,
/// then row, matching the source index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    pub x0: i32,
    pub y0: i32,
    pub w: u32,
    pub h: u32,
    pub nel: u32,
}

impl Region {
    pub fn size(&self) -> u64 {
        self.w as u64 * self.h as u64 * self.nel as u64
    }

    pub fn loc(&self, k: u64) -> Loc {
        let nel = self.nel.max(1) as u64;
        let w = self.w.max(1) as u64;
        let e = k % nel;
        let pos = k / nel;
        Loc::new(
            self.x0 + (pos % w) as i32,
            self.y0 + (pos / w) as i32,
            e as i32,
        )
    }
}
