//! Subarbor bookkeeping
//!
//! An arbor of `nc` synapses can be cut into `nc / nsa` subarbors of `nsa`
//! synapses each. The cursor tracks which subarbor the current candidate
//! belongs to and reports when a boundary is crossed so the context can move
//! the anchor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How an arbor is divided into subarbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum SubarborMode {
    /// One arbor, no subdivision
    #[default]
    None,
    /// The first subarbor's pattern is replayed at a grid of anchors
    ///
    /// Anchor `k` sits `(k mod row_width, k / row_width)` positions from the
    /// first anchor, and every subarbor restarts from the seed saved after
    /// the first anchor was placed.
    Clone {
        /// Synapses per subarbor
        nsa: u32,
        /// Anchors per row
        row_width: u32,
    },
    /// Every subarbor is generated like a separate arbor with its own anchor
    Independent {
        /// Synapses per subarbor
        nsa: u32,
    },
    /// One synapse per subarbor, repeated `nsa` times without drawing
    Repeat {
        /// Copies of each synapse
        nsa: u32,
    },
}

impl SubarborMode {
    /// Synapses per subarbor for an arbor of `nc`
    pub fn nsa(&self, nc: u32) -> u32 {
        match *self {
            Self::None => nc,
            Self::Clone { nsa, .. } | Self::Independent { nsa } | Self::Repeat { nsa } => nsa,
        }
    }

    /// Number of subarbors in an arbor of `nc`
    pub fn count(&self, nc: u32) -> u32 {
        match self.nsa(nc) {
            0 => 0,
            nsa => nc / nsa,
        }
    }

    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Clone { .. } => "clone",
            Self::Independent { .. } => "independent",
            Self::Repeat { .. } => "repeat",
        }
    }
}

/// Position offset of clone anchor `k` from the first anchor
pub fn clone_offset(k: u32, row_width: u32) -> (i32, i32) {
    let w = row_width.max(1);
    ((k % w) as i32, (k / w) as i32)
}

/// What entering a candidate means for the subarbor machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubarborState {
    /// Still inside the current subarbor
    WithinSubarbor,
    /// The candidate opens a new subarbor
    AdvanceAnchor,
}

/// Tracks `isas` (subarbor index), `nsas` (candidate number at which the
/// current subarbor ends) and `jsa` (candidate number within it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubarborCursor {
    nsa: u32,
    isas: u32,
    nsas: u32,
    jsa: u32,
}

impl SubarborCursor {
    /// Cursor positioned before the first candidate
    pub fn new(nsa: u32) -> Self {
        let nsa = nsa.max(1);
        Self {
            nsa,
            isas: 0,
            nsas: nsa,
            jsa: 0,
        }
    }

    /// Enter candidate `jsyn`; candidates must be entered in order
    pub fn enter(&mut self, jsyn: u32) -> SubarborState {
        if jsyn >= self.nsas {
            self.isas += 1;
            self.nsas += self.nsa;
            self.jsa = 0;
            SubarborState::AdvanceAnchor
        } else {
            self.jsa = jsyn + self.nsa - self.nsas;
            SubarborState::WithinSubarbor
        }
    }

    /// Current subarbor index
    pub fn isas(&self) -> u32 {
        self.isas
    }

    /// First candidate number past the current subarbor
    pub fn nsas(&self) -> u32 {
        self.nsas
    }

    /// Candidate number within the current subarbor
    pub fn jsa(&self) -> u32 {
        self.jsa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut cursor = SubarborCursor::new(3);
        let states: Vec<(SubarborState, u32, u32)> = (0..7)
            .map(|j| {
                let state = cursor.enter(j);
                (state, cursor.isas(), cursor.jsa())
            })
            .collect();
        use SubarborState::*;
        assert_eq!(
            states,
            vec![
                (WithinSubarbor, 0, 0),
                (WithinSubarbor, 0, 1),
                (WithinSubarbor, 0, 2),
                (AdvanceAnchor, 1, 0),
                (WithinSubarbor, 1, 1),
                (WithinSubarbor, 1, 2),
                (AdvanceAnchor, 2, 0),
            ]
        );
        assert_eq!(cursor.nsas(), 9);
    }

    #[test]
    fn test_mode_sizes() {
        assert_eq!(SubarborMode::None.nsa(12), 12);
        assert_eq!(SubarborMode::None.count(12), 1);
        assert_eq!(SubarborMode::Repeat { nsa: 3 }.count(12), 4);
        assert_eq!(SubarborMode::Clone { nsa: 4, row_width: 2 }.count(12), 3);
    }

    #[test]
    fn test_clone_offsets() {
        assert_eq!(clone_offset(0, 3), (0, 0));
        assert_eq!(clone_offset(2, 3), (2, 0));
        assert_eq!(clone_offset(3, 3), (0, 1));
        assert_eq!(clone_offset(7, 3), (1, 2));
    }
}
