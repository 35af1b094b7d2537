//! Synaptic strength (Cij) generation
//!
//! Strengths are S31 fixed point: an `i32` whose value is `raw / 2^31`.
//! Every method produces an unrounded value at 64-bit precision which is then
//! rounded to the connection type's `nbc` significant bits by
//! [`round_cij`]. Rounding saturates instead of overflowing and a value that
//! rounds to zero from below keeps its sign as [`Cij::NEG_ZERO`].

use crate::bits::BitReader;
use crate::geometry::{Loc, SourceGeometry, TargetCell, TargetGeometry};
use crate::prng::Seed;
use core::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const S31_ONE: f64 = 2_147_483_648.0;
const S16_ONE: f64 = 65_536.0;

/// A signed S31 strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cij(pub i32);

impl Cij {
    /// Reserved code for a negative value that rounded to zero
    pub const NEG_ZERO: Self = Self(i32::MIN);

    /// Raw S31 value
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether this is the negative-zero code
    pub const fn is_negative_zero(self) -> bool {
        self.0 == i32::MIN
    }

    /// Whether the value is negative, negative zero included
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value in S31 units
    pub fn magnitude(self) -> u32 {
        if self.is_negative_zero() {
            0
        } else {
            self.0.unsigned_abs()
        }
    }

    /// Narrow to S15; negative zero maps to `i16::MIN`
    pub const fn to_s15(self) -> i16 {
        (self.0 >> 16) as i16
    }

    /// Widen from S15
    pub const fn from_s15(value: i16) -> Self {
        Self((value as i32) << 16)
    }

    /// Value as a float in `(-1, 1)`; negative zero yields `-0.0`
    pub fn to_f64(self) -> f64 {
        if self.is_negative_zero() {
            -0.0
        } else {
            self.0 as f64 / S31_ONE
        }
    }
}

/// Round an S31 value held in 64 bits to `nbc` significant bits
///
/// The magnitude is rounded half up and masked. Results at or above `2^31`
/// saturate to the largest representable magnitude `2^31 − 2^(32−nbc)`; the
/// sign is reapplied without branching. A negative input that rounds to
/// zero yields [`Cij::NEG_ZERO`].
pub fn round_cij(value: i64, nbc: u8) -> Cij {
    const LIMIT: i64 = 1 << 62;
    let value = value.clamp(-LIMIT, LIMIT);
    let shift = 32 - nbc.clamp(2, 16) as u32;
    let rnd = 1i64 << (shift - 1);
    let mask = (1i64 << shift) - 1;
    let max = (1i64 << 31) - (1i64 << shift);

    let sign = value >> 63;
    let magnitude = (value ^ sign) - sign;
    let rounded = ((magnitude + rnd) & !mask).min(max);
    if rounded == 0 && sign != 0 {
        return Cij::NEG_ZERO;
    }
    Cij(((rounded ^ sign) - sign) as i32)
}

/// A rounded strength and its threshold verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength {
    /// Rounded value
    pub cij: Cij,
    /// Whether the magnitude fell below the connection type's threshold
    pub below_threshold: bool,
}

/// How strengths are produced for a connection type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum StrengthRule {
    /// Kernel weight of the placing entry, or an external value already held
    Resident,
    /// S15 values kept alongside a stored arbor
    Stored,
    /// Signed fixed-width fields unpacked from shared coefficient words
    Matrix {
        /// Field width in bits
        bits: u8,
        /// Packed words
        words: Vec<u32>,
        /// One field per subarbor instead of one per candidate
        #[cfg_attr(feature = "serde", serde(default))]
        per_subarbor: bool,
    },
    /// Bilinear interpolation over four corner values keyed by the
    /// normalized source-minus-target displacement
    Geometric {
        /// Corner values `[(-,-), (+,-), (-,+), (+,+)]`
        corners: [f64; 4],
        /// Interpolate along the diagonals instead of the axes
        #[cfg_attr(feature = "serde", serde(default))]
        rotated: bool,
        /// Column radius that maps to a corner
        rx: u32,
        /// Row radius that maps to a corner
        ry: u32,
    },
    /// Cosine of the orientation difference between source and target
    Tuning,
    /// Uniform magnitude from the strength generator
    Random {
        /// Take the sign from the low bit of the draw
        #[cfg_attr(feature = "serde", serde(default))]
        mixed_sign: bool,
    },
    /// The same value for every synapse
    Constant {
        /// Value before scaling
        value: f64,
    },
}

/// Everything a strength method may look at for one synapse
#[derive(Debug, Clone, Copy)]
pub struct StrengthInput<'a> {
    /// Candidate number
    pub jsyn: u32,
    /// Subarbor index
    pub subarbor: u32,
    /// Source location of the synapse
    pub source: Loc,
    /// Source array
    pub source_geometry: &'a SourceGeometry,
    /// Target layer
    pub target_geometry: &'a TargetGeometry,
    /// Receiving cell
    pub cell: &'a TargetCell,
    /// Target group projected into source coordinates
    pub projected: (i32, i32),
    /// Weight of the kernel entry that placed the synapse, S16
    pub kernel_weight: Option<i32>,
    /// Value held in a stored arbor, S15
    pub stored: Option<i16>,
    /// Strength generator positioned for this candidate
    pub seed: Seed,
}

impl StrengthRule {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Stored => "stored",
            Self::Matrix { .. } => "matrix",
            Self::Geometric { .. } => "geometric",
            Self::Tuning => "tuning",
            Self::Random { .. } => "random",
            Self::Constant { .. } => "constant",
        }
    }

    /// Whether the method reads a stored arbor
    pub fn needs_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }

    /// Unrounded S31 value, or `None` when the method's input is not held
    pub fn unrounded(&self, input: &StrengthInput<'_>, scale_s16: i32) -> Option<i64> {
        let scaled = |s31: i64| -> i64 { (s31 * scale_s16 as i64) >> 16 };
        let scale = scale_s16 as f64 / S16_ONE;
        let from_f64 = |v: f64| -> i64 { (v * scale * S31_ONE) as i64 };

        match self {
            Self::Resident => match (input.stored, input.kernel_weight) {
                (Some(stored), _) => Some(stored_s31(stored)),
                (None, Some(weight)) => Some(scaled((weight as i64) << 15)),
                (None, None) => None,
            },
            Self::Stored => input.stored.map(stored_s31),
            Self::Matrix {
                bits,
                words,
                per_subarbor,
            } => {
                let bits = (*bits).clamp(1, 32) as u32;
                let index = if *per_subarbor {
                    input.subarbor
                } else {
                    input.jsyn
                };
                let mut reader = BitReader::new(words);
                reader.seek_field(bits, index as u64);
                let field = reader.take_signed(bits)? as i64;
                Some(scaled(field << (32 - bits)))
            }
            Self::Geometric {
                corners,
                rotated,
                rx,
                ry,
            } => {
                let nx = (input.source.x - input.projected.0) as f64 / (*rx).max(1) as f64;
                let ny = (input.source.y - input.projected.1) as f64 / (*ry).max(1) as f64;
                let (a, b) = if *rotated {
                    ((nx + ny) / 2.0, (ny - nx) / 2.0)
                } else {
                    (nx, ny)
                };
                let u = ((a + 1.0) / 2.0).clamp(0.0, 1.0);
                let v = ((b + 1.0) / 2.0).clamp(0.0, 1.0);
                let value = corners[0] * (1.0 - u) * (1.0 - v)
                    + corners[1] * u * (1.0 - v)
                    + corners[2] * (1.0 - u) * v
                    + corners[3] * u * v;
                Some(from_f64(value))
            }
            Self::Tuning => {
                let nel = input.source_geometry.nel.max(1) as f64;
                let cpg = input.target_geometry.cpg.max(1) as f64;
                let source = PI * input.source.e as f64 / nel;
                let target = PI * input.cell.element as f64 / cpg;
                Some(from_f64(libm::cos(orientation_delta(source, target))))
            }
            Self::Random { mixed_sign } => {
                let (draw, _) = input.seed.draw();
                let magnitude = scaled(draw as i64);
                if *mixed_sign && draw & 1 == 1 {
                    Some(-magnitude)
                } else {
                    Some(magnitude)
                }
            }
            Self::Constant { value } => Some(from_f64(*value)),
        }
    }
}

/// Widen a stored S15 value so that rounding it again is the identity;
/// negative zero becomes the smallest negative value, which rounds back to it
fn stored_s31(value: i16) -> i64 {
    let cij = Cij::from_s15(value);
    if cij.is_negative_zero() {
        -1
    } else {
        cij.raw() as i64
    }
}

/// Doubled orientation difference wrapped into `[-π, π]`
///
/// Orientations repeat every π, so the difference is doubled before the
/// cosine is taken. The clamp absorbs round-off at the ends of the range.
fn orientation_delta(source: f64, target: f64) -> f64 {
    let delta = 2.0 * (source - target);
    let wrapped = delta - 2.0 * PI * libm::round(delta / (2.0 * PI));
    wrapped.clamp(-PI, PI)
}

/// Strength method plus the scaling and rounding applied to its output
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthSpec {
    /// Method
    pub rule: StrengthRule,
    /// Scale factor, S16
    pub scale_s16: i32,
    /// Significant bits kept by rounding (2..=16)
    pub nbc: u8,
    /// Minimum magnitude, S31
    pub threshold: u32,
}

impl StrengthSpec {
    /// Build from floating-point scale and threshold
    pub fn new(rule: StrengthRule, scale: f64, nbc: u8, min_threshold: f64) -> Self {
        let scale_s16 = libm::round(scale * S16_ONE).clamp(i32::MIN as f64, i32::MAX as f64) as i32;
        let threshold = libm::round(min_threshold.abs() * S31_ONE).min(u32::MAX as f64) as u32;
        Self {
            rule,
            scale_s16,
            nbc,
            threshold,
        }
    }

    /// Round and threshold an unrounded value
    pub fn finish(&self, unrounded: i64) -> Strength {
        self.classify(round_cij(unrounded, self.nbc))
    }

    /// Threshold an already rounded value
    pub fn classify(&self, cij: Cij) -> Strength {
        Strength {
            cij,
            below_threshold: cij.magnitude() < self.threshold,
        }
    }
}

impl Default for StrengthSpec {
    fn default() -> Self {
        Self::new(StrengthRule::Constant { value: 0.5 }, 1.0, 16, 0.0)
    }
}
