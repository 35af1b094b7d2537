//! Skip-list and bounds state machine
//!
//! ```text
//!   Sampling --reject--> Skipping --accept--> Sampling
//!       |                   |
//!       +------abort--------+--> ArborExhausted --subarbor end--> Sampling
//! ```
//!
//! While exhausted, every candidate up to the end of the current subarbor is
//! force-skipped without being evaluated.

/// Bounds manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsState {
    /// Normal per-candidate evaluation
    Sampling,
    /// The last candidate was rejected and another is being tried
    Skipping,
    /// The rest of the current (sub)arbor is being force-skipped
    ArborExhausted,
}

/// Tracks rejection state and counts
#[derive(Debug, Clone)]
pub struct BoundsManager {
    state: BoundsState,
    exhausted_until: u32,
    skipped: u32,
    accepted: u32,
}

impl Default for BoundsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundsManager {
    /// Fresh manager in `Sampling`
    pub fn new() -> Self {
        Self {
            state: BoundsState::Sampling,
            exhausted_until: 0,
            skipped: 0,
            accepted: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> BoundsState {
        self.state
    }

    /// Whether candidate `jsyn` is force-skipped; leaves `ArborExhausted`
    /// once `jsyn` reaches the end of the exhausted range
    pub fn is_exhausted(&mut self, jsyn: u32) -> bool {
        if self.state != BoundsState::ArborExhausted {
            return false;
        }
        if jsyn < self.exhausted_until {
            return true;
        }
        self.state = BoundsState::Sampling;
        false
    }

    /// Record an accepted candidate
    pub fn accept(&mut self) {
        self.accepted += 1;
        self.state = BoundsState::Sampling;
    }

    /// Record a rejected candidate
    pub fn reject(&mut self) {
        self.skipped += 1;
        if self.state != BoundsState::ArborExhausted {
            self.state = BoundsState::Skipping;
        }
    }

    /// Force-skip every candidate before `until`
    pub fn exhaust(&mut self, until: u32) {
        self.state = BoundsState::ArborExhausted;
        self.exhausted_until = until;
    }

    /// Candidates accepted so far
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Candidates skipped so far
    pub fn skipped(&self) -> u32 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut bounds = BoundsManager::new();
        assert_eq!(bounds.state(), BoundsState::Sampling);
        bounds.reject();
        assert_eq!(bounds.state(), BoundsState::Skipping);
        bounds.accept();
        assert_eq!(bounds.state(), BoundsState::Sampling);

        bounds.exhaust(5);
        bounds.reject();
        assert_eq!(bounds.state(), BoundsState::ArborExhausted);
        assert!(bounds.is_exhausted(3));
        assert!(bounds.is_exhausted(4));
        assert!(!bounds.is_exhausted(5));
        assert_eq!(bounds.state(), BoundsState::Sampling);
        assert_eq!((bounds.accepted(), bounds.skipped()), (1, 2));
    }
}
