//! Secondary rules: synapses after the first
//!
//! Walk rules (adjacent, box, kernel) step deterministically away from the
//! anchor and place step 0 on the anchor itself. Cluster rules (random box,
//! crow's foot, annulus) draw every step, the first included, around it.

use super::{RuleEnv, Step};
use crate::geometry::Loc;
use crate::prng::Prng;
use crate::rules::PrimaryRule;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule placing synapses relative to the arbor anchor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum SecondaryRule {
    /// No anchor: every candidate re-invokes the primary rule
    #[default]
    Independent,
    /// Consecutive source indices from the anchor, wrapping row to row
    Adjacent,
    /// Raster scan of a `bx × by` block whose top-left is the anchor
    Box {
        /// Block width in positions
        bx: u32,
        /// Block height in positions
        by: u32,
    },
    /// Uniform in a `bx × by` block centred on the anchor
    RandomBox {
        /// Block width in positions
        bx: u32,
        /// Block height in positions
        by: u32,
    },
    /// Independent triangular jitter on each axis around the anchor
    CrowsFoot {
        /// Column radius
        rx: u32,
        /// Row radius
        ry: u32,
    },
    /// Uniform over an elliptical ring of offsets around the anchor
    Annulus {
        /// Outer column radius
        outer_x: u32,
        /// Outer row radius
        outer_y: u32,
        /// Inner column radius; zero for a filled ellipse
        #[cfg_attr(feature = "serde", serde(default))]
        inner_x: u32,
        /// Inner row radius; zero for a filled ellipse
        #[cfg_attr(feature = "serde", serde(default))]
        inner_y: u32,
    },
    /// Later entries of the kernel table used by the primary rule
    KernelContinuation,
}

impl SecondaryRule {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::Adjacent => "adjacent",
            Self::Box { .. } => "box",
            Self::RandomBox { .. } => "random-box",
            Self::CrowsFoot { .. } => "crows-foot",
            Self::Annulus { .. } => "annulus",
            Self::KernelContinuation => "kernel",
        }
    }

    /// Generator draws consumed per candidate
    pub fn draws(&self, primary: &PrimaryRule) -> u64 {
        match self {
            Self::Independent => primary.draws(),
            Self::Adjacent | Self::Box { .. } | Self::KernelContinuation => 0,
            Self::RandomBox { .. } | Self::Annulus { .. } => 1,
            Self::CrowsFoot { .. } => 5,
        }
    }

    /// Whether the rule works from an anchor placed by the primary rule
    pub fn is_anchored(&self) -> bool {
        !matches!(self, Self::Independent)
    }

    /// Whether step 0 lands on the anchor
    pub fn is_walk(&self) -> bool {
        matches!(self, Self::Adjacent | Self::Box { .. } | Self::KernelContinuation)
    }

    /// Number of steps a scan rule can take before leaving its region
    pub fn scan_limit(&self, nel: u32) -> Option<u64> {
        match *self {
            Self::Box { bx, by } => Some(bx as u64 * by as u64 * nel as u64),
            _ => None,
        }
    }

    /// Candidate number `step` around `anchor`
    ///
    /// `validate_first` is false when the primary rule guarantees an
    /// in-bounds anchor, in which case a walk's step 0 is taken as is.
    pub fn next(
        &self,
        env: &RuleEnv<'_>,
        prng: &mut Prng,
        anchor: Loc,
        step: u32,
        validate_first: bool,
    ) -> Step {
        let src = env.source;
        let nel = src.nel.max(1);
        match *self {
            // Placed by the primary rule.
            Self::Independent => Step::Skip,
            Self::Adjacent => {
                let offset = anchor.e as i64 + step as i64;
                let x = anchor.x as i64 + offset.div_euclid(nel as i64);
                let e = offset.rem_euclid(nel as i64);
                let nx = src.nx.max(1) as i64;
                let y = anchor.y as i64 + x.div_euclid(nx);
                Step::Continue(Loc::new(x.rem_euclid(nx) as i32, y as i32, e as i32))
            }
            Self::Box { bx, .. } => {
                let s = step as u64;
                let nel = nel as u64;
                let e = (anchor.e as u64 + s % nel) % nel;
                let col = (s / nel) % bx.max(1) as u64;
                let row = s / (nel * bx.max(1) as u64);
                let loc = Loc::new(anchor.x + col as i32, anchor.y + row as i32, e as i32);
                if step == 0 && !validate_first {
                    return Step::Continue(loc);
                }
                if (loc.y as u32) >= src.ny {
                    Step::AbortArbor
                } else if (loc.x as u32) >= src.nx {
                    Step::Skip
                } else {
                    Step::Continue(loc)
                }
            }
            Self::RandomBox { bx, by } => {
                let k = prng.below(bx * by * nel);
                let e = k % nel;
                let col = (k / nel) % bx.max(1);
                let row = k / (nel * bx.max(1));
                Step::Continue(Loc::new(
                    anchor.x + col as i32 - (bx / 2) as i32,
                    anchor.y + row as i32 - (by / 2) as i32,
                    e as i32,
                ))
            }
            Self::CrowsFoot { rx, ry } => {
                let x = anchor.x + prng.jitter(rx);
                if (x as u32) >= src.nx {
                    return Step::Skip;
                }
                let y = anchor.y + prng.jitter(ry);
                if (y as u32) >= src.ny {
                    return Step::Skip;
                }
                let e = prng.below(nel);
                Step::Continue(Loc::new(x, y, e as i32))
            }
            Self::Annulus { .. } => {
                let table = env.annulus;
                if table.is_empty() {
                    return Step::AbortArbor;
                }
                let k = prng.below(table.len() as u32 * nel);
                let (dx, dy) = table[(k / nel) as usize];
                Step::Continue(anchor.offset(dx, dy).with_element((k % nel) as i32))
            }
            Self::KernelContinuation => {
                let Some(kernel) = env.kernel else {
                    return Step::AbortArbor;
                };
                let entry = kernel.entry(step);
                if entry.is_sentinel() {
                    return Step::AbortArbor;
                }
                Step::Continue(
                    anchor
                        .offset(entry.dx, entry.dy)
                        .with_element(entry.orientation as i32),
                )
            }
        }
    }
}

/// Offsets inside an ellipse of radii `(outer_x, outer_y)` and outside the
/// ellipse of radii `(inner_x, inner_y)`, row by row
///
/// An inner radius of zero leaves the centre filled.
pub fn annulus_offsets(outer_x: u32, outer_y: u32, inner_x: u32, inner_y: u32) -> Vec<(i32, i32)> {
    let inside = |dx: i64, dy: i64, rx: i64, ry: i64| -> bool {
        dx * dx * ry * ry + dy * dy * rx * rx <= rx * rx * ry * ry
    };
    let (ox, oy) = (outer_x as i64, outer_y as i64);
    let (ix, iy) = (inner_x as i64, inner_y as i64);
    let hole = ix > 0 && iy > 0;

    let mut offsets = Vec::new();
    for dy in -oy..=oy {
        for dx in -ox..=ox {
            if !inside(dx, dy, ox.max(1), oy.max(1)) {
                continue;
            }
            if hole && dx * dx * iy * iy + dy * dy * ix * ix < ix * ix * iy * iy {
                continue;
            }
            offsets.push((dx as i32, dy as i32));
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{project, SourceGeometry, TargetGeometry};
    use crate::kernel::{Kernel, KernelEntry};
    use crate::prng::Seed;

    fn env_for<'a>(
        source: &'a SourceGeometry,
        target: &'a TargetGeometry,
        cell: &'a crate::geometry::TargetCell,
        kernel: Option<&'a Kernel>,
        annulus: &'a [(i32, i32)],
    ) -> RuleEnv<'a> {
        RuleEnv {
            source,
            target,
            cell,
            projected: project(target, cell, source),
            kernel,
            annulus,
        }
    }

    #[test]
    fn test_adjacent_wraps_helically() {
        let source = SourceGeometry::new(3, 2, 2);
        let target = TargetGeometry::new(3, 2, 2);
        let cell = target.cell(0);
        let env = env_for(&source, &target, &cell, None, &[]);
        let mut prng = Prng::new(Seed::new(1));
        let anchor = Loc::new(2, 0, 1);
        let locs: Vec<Loc> = (0..4)
            .map(|s| match SecondaryRule::Adjacent.next(&env, &mut prng, anchor, s, true) {
                Step::Continue(loc) => loc,
                other => panic!("{:?}", other),
            })
            .collect();
        assert_eq!(
            locs,
            vec![
                Loc::new(2, 0, 1),
                Loc::new(0, 1, 0),
                Loc::new(0, 1, 1),
                Loc::new(1, 1, 0)
            ]
        );
        assert_eq!(prng.drawn(), 0);
    }

    #[test]
    fn test_box_row_overrun_aborts() {
        let source = SourceGeometry::new(4, 2, 1);
        let target = TargetGeometry::new(4, 2, 1);
        let cell = target.cell(0);
        let env = env_for(&source, &target, &cell, None, &[]);
        let mut prng = Prng::new(Seed::new(1));
        let rule = SecondaryRule::Box { bx: 2, by: 3 };

        assert_eq!(
            rule.next(&env, &mut prng, Loc::new(0, -1, 0), 0, true),
            Step::AbortArbor
        );
        assert_eq!(
            rule.next(&env, &mut prng, Loc::new(3, 0, 0), 1, true),
            Step::Skip
        );
        assert_eq!(
            rule.next(&env, &mut prng, Loc::new(1, 0, 0), 3, true),
            Step::Continue(Loc::new(2, 1, 0))
        );
        assert_eq!(
            rule.next(&env, &mut prng, Loc::new(1, 0, 0), 4, true),
            Step::AbortArbor
        );
        assert_eq!(rule.scan_limit(1), Some(6));
    }

    #[test]
    fn test_crows_foot_always_consumes_within_budget() {
        let source = SourceGeometry::new(5, 5, 3);
        let target = TargetGeometry::new(5, 5, 1);
        let cell = target.cell(0);
        let env = env_for(&source, &target, &cell, None, &[]);
        let rule = SecondaryRule::CrowsFoot { rx: 2, ry: 2 };
        let budget = rule.draws(&PrimaryRule::Diffuse);
        let mut prng = Prng::new(Seed::new(77));
        for _ in 0..200 {
            let before = prng.drawn();
            if let Step::Continue(loc) = rule.next(&env, &mut prng, Loc::new(0, 0, 0), 0, true) {
                assert!(source.contains(loc));
            }
            assert!(prng.drawn() - before <= budget);
            prng.pad_to(before + budget);
        }
    }

    #[test]
    fn test_annulus_has_hole() {
        let ring = annulus_offsets(2, 2, 1, 1);
        assert!(!ring.contains(&(0, 0)));
        assert!(ring.contains(&(2, 0)));
        assert!(ring.contains(&(1, 1)));
        assert!(!ring.contains(&(2, 2)));

        let disc = annulus_offsets(1, 1, 0, 0);
        assert_eq!(disc.len(), 5);
        assert!(disc.contains(&(0, 0)));
    }

    #[test]
    fn test_kernel_continuation_ends_at_sentinel() {
        let source = SourceGeometry::new(4, 4, 2);
        let target = TargetGeometry::new(4, 4, 1);
        let cell = target.cell(0);
        let kernel = Kernel::new(vec![
            KernelEntry::new(0, 0, 1, 100),
            KernelEntry::new(1, 0, 0, 200),
        ]);
        let env = env_for(&source, &target, &cell, Some(&kernel), &[]);
        let mut prng = Prng::new(Seed::new(1));
        let rule = SecondaryRule::KernelContinuation;
        let anchor = Loc::new(1, 1, 0);
        assert_eq!(
            rule.next(&env, &mut prng, anchor, 0, true),
            Step::Continue(Loc::new(1, 1, 1))
        );
        assert_eq!(
            rule.next(&env, &mut prng, anchor, 1, true),
            Step::Continue(Loc::new(2, 1, 0))
        );
        assert_eq!(rule.next(&env, &mut prng, anchor, 2, true), Step::AbortArbor);
    }
}
