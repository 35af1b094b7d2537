//! Transmission delays (Dij)

use crate::geometry::Loc;
use crate::prng::Seed;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How delays are assigned, in simulation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum DelayRule {
    /// Same delay everywhere
    Constant {
        /// Delay
        value: u16,
    },
    /// Uniform in `min..=max`, one delay-generator draw per synapse
    Uniform {
        /// Shortest delay
        min: u16,
        /// Longest delay
        max: u16,
    },
    /// `base + per_position · d` where `d` is the Chebyshev distance between
    /// the source position and the projected target
    Distance {
        /// Delay at distance zero
        base: u16,
        /// Added per position of distance
        per_position: u16,
    },
}

impl DelayRule {
    /// Delay of a synapse from `source` onto a cell projected at `projected`
    ///
    /// `seed` is the delay generator positioned for this candidate.
    pub fn delay(&self, source: Loc, projected: (i32, i32), seed: Seed) -> u16 {
        match *self {
            Self::Constant { value } => value,
            Self::Uniform { min, max } => {
                let span = max.saturating_sub(min) as u64 + 1;
                let (draw, _) = seed.draw();
                min + ((draw as u64 * span) >> 31) as u16
            }
            Self::Distance { base, per_position } => {
                let dx = (source.x - projected.0).unsigned_abs();
                let dy = (source.y - projected.1).unsigned_abs();
                let d = dx.max(dy);
                (base as u32 + per_position as u32 * d).min(u16::MAX as u32) as u16
            }
        }
    }

    /// Whether the rule's parameters are consistent
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Uniform { min, max } => min <= max,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_range() {
        let rule = DelayRule::Uniform { min: 2, max: 5 };
        let mut seen = [false; 4];
        let mut seed = Seed::new(1234);
        for _ in 0..200 {
            let d = rule.delay(Loc::default(), (0, 0), seed);
            assert!((2..=5).contains(&d));
            seen[(d - 2) as usize] = true;
            seed = seed.draw().1;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_distance() {
        let rule = DelayRule::Distance {
            base: 1,
            per_position: 3,
        };
        assert_eq!(rule.delay(Loc::new(5, 2, 0), (2, 3), Seed::DEFAULT), 10);
        assert_eq!(rule.delay(Loc::new(2, 3, 1), (2, 3), Seed::DEFAULT), 1);
    }

    #[test]
    fn test_validity() {
        assert!(DelayRule::Constant { value: 3 }.is_valid());
        assert!(!DelayRule::Uniform { min: 4, max: 3 }.is_valid());
    }
}
