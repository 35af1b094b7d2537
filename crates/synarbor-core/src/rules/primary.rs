//! Primary rules: where an arbor starts

use super::{Region, RuleEnv, Step};
use crate::geometry::Loc;
use crate::prng::Prng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule placing the first synapse (anchor) of an arbor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum PrimaryRule {
    /// Uniform over a `wx × wy` window centred on the projected target
    /// shifted by `(ox, oy)`; the window may hang off the array
    Uniform {
        /// Window width in positions
        wx: u32,
        /// Window height in positions
        wy: u32,
        /// Column offset of the window centre
        #[cfg_attr(feature = "serde", serde(default))]
        ox: i32,
        /// Row offset of the window centre
        #[cfg_attr(feature = "serde", serde(default))]
        oy: i32,
    },
    /// Uniform inside the source block that maps onto the target's group
    Topographic,
    /// Uniform over the whole source array
    Diffuse,
    /// Uniform over the cells of the target's own group
    Group,
    /// Uniform over the aligned `hx × hy` block of groups holding the target,
    /// clipped to the array
    Hypergroup {
        /// Block width in groups
        hx: u32,
        /// Block height in groups
        hy: u32,
    },
    /// Deterministic stepping: `(cell · stride + step) mod size`
    Systematic {
        /// Source index distance between neighbouring cells
        stride: u32,
    },
    /// The projected target position shifted by `(ox, oy)`
    Aligned {
        /// Column offset
        #[cfg_attr(feature = "serde", serde(default))]
        ox: i32,
        /// Row offset
        #[cfg_attr(feature = "serde", serde(default))]
        oy: i32,
    },
    /// Kernel table walked from the projected target position
    Kernel,
}

impl PrimaryRule {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uniform { .. } => "uniform",
            Self::Topographic => "topographic",
            Self::Diffuse => "diffuse",
            Self::Group => "group",
            Self::Hypergroup { .. } => "hypergroup",
            Self::Systematic { .. } => "systematic",
            Self::Aligned { .. } => "aligned",
            Self::Kernel => "kernel",
        }
    }

    /// Generator draws consumed per invocation
    pub fn draws(&self) -> u64 {
        match self {
            Self::Uniform { .. }
            | Self::Topographic
            | Self::Diffuse
            | Self::Group
            | Self::Hypergroup { .. } => 1,
            Self::Systematic { .. } | Self::Aligned { .. } | Self::Kernel => 0,
        }
    }

    /// Whether the rule can return a location outside the source array
    pub fn may_be_out_of_bounds(&self) -> bool {
        matches!(self, Self::Uniform { .. } | Self::Aligned { .. } | Self::Kernel)
    }

    /// Whether the rule samples a region and so can be partitioned
    pub fn supports_partition(&self) -> bool {
        self.draws() == 1
    }

    pub(crate) fn region(&self, env: &RuleEnv<'_>) -> Option<Region> {
        let src = env.source;
        let (px, py) = env.projected;
        let nel = src.nel;
        match *self {
            Self::Uniform { wx, wy, ox, oy } => Some(Region {
                x0: px + ox - (wx / 2) as i32,
                y0: py + oy - (wy / 2) as i32,
                w: wx,
                h: wy,
                nel,
            }),
            Self::Topographic => {
                let span = |t: u32, tn: u32, sn: u32| -> (i32, u32) {
                    let tn = tn.max(1) as u64;
                    let lo = (t as u64 * sn as u64 / tn) as u32;
                    let hi = ((t as u64 + 1) * sn as u64 / tn) as u32;
                    (lo as i32, hi.saturating_sub(lo).max(1))
                };
                let (x0, w) = span(env.cell.x, env.target.nx, src.nx);
                let (y0, h) = span(env.cell.y, env.target.ny, src.ny);
                Some(Region { x0, y0, w, h, nel })
            }
            Self::Diffuse => Some(Region {
                x0: 0,
                y0: 0,
                w: src.nx,
                h: src.ny,
                nel,
            }),
            Self::Group => Some(Region {
                x0: px,
                y0: py,
                w: 1,
                h: 1,
                nel,
            }),
            Self::Hypergroup { hx, hy } => {
                let block = |p: i32, n: u32, size: u32| -> (i32, u32) {
                    let size = size.max(1);
                    let start = (p.max(0) as u32 / size) * size;
                    (start as i32, size.min(n.saturating_sub(start)))
                };
                let (x0, w) = block(px, src.nx, hx);
                let (y0, h) = block(py, src.ny, hy);
                Some(Region { x0, y0, w, h, nel })
            }
            Self::Systematic { .. } | Self::Aligned { .. } | Self::Kernel => None,
        }
    }

    /// The anchor a secondary rule works from
    pub fn anchor(&self, env: &RuleEnv<'_>, prng: &mut Prng, step: u32) -> Loc {
        let (px, py) = env.projected;
        match *self {
            Self::Systematic { stride } => systematic(env, stride, step),
            Self::Aligned { ox, oy } => Loc::new(
                px + ox,
                py + oy,
                (env.cell.element % env.source.nel.max(1)) as i32,
            ),
            Self::Kernel => Loc::new(px, py, 0),
            _ => match self.region(env) {
                Some(region) => region.loc(prng.below(region.size() as u32) as u64),
                None => Loc::new(px, py, 0),
            },
        }
    }

    /// A candidate drawn afresh, for arbors without a secondary rule
    ///
    /// With `partition = Some(span)` the region is cut into `span` bins and
    /// only bin `step` is sampled; an empty bin still consumes its draw.
    pub fn pick(
        &self,
        env: &RuleEnv<'_>,
        prng: &mut Prng,
        step: u32,
        partition: Option<u32>,
    ) -> Step {
        match *self {
            Self::Kernel => {
                let Some(kernel) = env.kernel else {
                    return Step::AbortArbor;
                };
                let entry = kernel.entry(step);
                if entry.is_sentinel() {
                    return Step::AbortArbor;
                }
                let (px, py) = env.projected;
                Step::Continue(Loc::new(
                    px + entry.dx,
                    py + entry.dy,
                    entry.orientation as i32,
                ))
            }
            Self::Systematic { .. } | Self::Aligned { .. } => {
                Step::Continue(self.anchor(env, prng, step))
            }
            _ => {
                let Some(region) = self.region(env) else {
                    return Step::Skip;
                };
                let size = region.size();
                // Window sizes are capped at build time.
                debug_assert!(size <= u32::MAX as u64);
                match partition {
                    Some(span) => {
                        let span = span.max(1) as u64;
                        let lo = step as u64 * size / span;
                        let hi = (step as u64 + 1) * size / span;
                        let k = prng.below((hi - lo) as u32) as u64;
                        if hi == lo {
                            Step::Skip
                        } else {
                            Step::Continue(region.loc(lo + k))
                        }
                    }
                    None => Step::Continue(region.loc(prng.below(size as u32) as u64)),
                }
            }
        }
    }
}

fn systematic(env: &RuleEnv<'_>, stride: u32, step: u32) -> Loc {
    let size = env.source.size().max(1);
    let lij = (env.cell.id.raw() as u64 * stride as u64 + step as u64) % size;
    env.source.locate(lij as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{project, SourceGeometry, TargetGeometry};
    use crate::prng::Seed;

    fn with_env<R>(
        source: SourceGeometry,
        target: TargetGeometry,
        cell: u32,
        f: impl FnOnce(&RuleEnv<'_>) -> R,
    ) -> R {
        let cell = target.cell(cell);
        let env = RuleEnv {
            source: &source,
            target: &target,
            cell: &cell,
            projected: project(&target, &cell, &source),
            kernel: None,
            annulus: &[],
        };
        f(&env)
    }

    #[test]
    fn test_draw_counts() {
        let mut prng = Prng::new(Seed::new(3));
        let rule = PrimaryRule::Diffuse;
        with_env(
            SourceGeometry::new(4, 4, 2),
            TargetGeometry::new(4, 4, 1),
            5,
            |env| {
                rule.pick(env, &mut prng, 0, None);
                rule.anchor(env, &mut prng, 0);
            },
        );
        assert_eq!(prng.drawn(), 2);

        let mut prng = Prng::new(Seed::new(3));
        with_env(
            SourceGeometry::new(4, 4, 2),
            TargetGeometry::new(4, 4, 1),
            5,
            |env| {
                PrimaryRule::Systematic { stride: 3 }.pick(env, &mut prng, 2, None);
                PrimaryRule::Aligned { ox: 0, oy: 0 }.anchor(env, &mut prng, 0);
            },
        );
        assert_eq!(prng.drawn(), 0);
    }

    #[test]
    fn test_in_bounds_rules_stay_in_bounds() {
        let source = SourceGeometry::new(7, 5, 3);
        let target = TargetGeometry::new(4, 3, 2);
        let rules = [
            PrimaryRule::Topographic,
            PrimaryRule::Diffuse,
            PrimaryRule::Hypergroup { hx: 3, hy: 2 },
            PrimaryRule::Systematic { stride: 11 },
        ];
        let mut prng = Prng::new(Seed::new(17));
        for cell in 0..target.size() as u32 {
            with_env(source, target, cell, |env| {
                for rule in &rules {
                    for step in 0..20 {
                        match rule.pick(env, &mut prng, step, None) {
                            Step::Continue(loc) => assert!(source.contains(loc), "{:?}", rule),
                            other => panic!("{:?} returned {:?}", rule, other),
                        }
                    }
                }
            });
        }
    }

    #[test]
    fn test_group_stays_in_own_group() {
        let geometry = TargetGeometry::new(3, 3, 4);
        let source = SourceGeometry::new(3, 3, 4);
        let mut prng = Prng::new(Seed::new(8));
        with_env(source, geometry, 22, |env| {
            for _ in 0..50 {
                let Step::Continue(loc) = PrimaryRule::Group.pick(env, &mut prng, 0, None) else {
                    panic!("group rule rejected");
                };
                assert_eq!((loc.x, loc.y), (2, 1));
            }
        });
    }

    #[test]
    fn test_uniform_window_may_leave_array() {
        let source = SourceGeometry::new(3, 3, 1);
        let target = TargetGeometry::new(3, 3, 1);
        let rule = PrimaryRule::Uniform {
            wx: 3,
            wy: 3,
            ox: 0,
            oy: 0,
        };
        let mut prng = Prng::new(Seed::new(21));
        let mut outside = 0;
        with_env(source, target, 0, |env| {
            for _ in 0..200 {
                if let Step::Continue(loc) = rule.pick(env, &mut prng, 0, None) {
                    assert!((-1..=1).contains(&loc.x) && (-1..=1).contains(&loc.y));
                    if !source.contains(loc) {
                        outside += 1;
                    }
                }
            }
        });
        assert!(outside > 0);
    }

    #[test]
    fn test_partition_bins() {
        let source = SourceGeometry::new(6, 1, 1);
        let target = TargetGeometry::new(6, 1, 1);
        let mut prng = Prng::new(Seed::new(5));
        let mut accepted = Vec::new();
        with_env(source, target, 0, |env| {
            for step in 0..10 {
                if let Step::Continue(loc) = PrimaryRule::Diffuse.pick(env, &mut prng, step, Some(10)) {
                    accepted.push((step, loc.x));
                }
            }
        });
        assert_eq!(prng.drawn(), 10);
        let steps: Vec<u32> = accepted.iter().map(|(s, _)| *s).collect();
        assert_eq!(steps, vec![1, 3, 4, 6, 8, 9]);
        let xs: Vec<i32> = accepted.iter().map(|(_, x)| *x).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_hypergroup_clipped() {
        let source = SourceGeometry::new(5, 5, 1);
        let target = TargetGeometry::new(5, 5, 1);
        let rule = PrimaryRule::Hypergroup { hx: 2, hy: 2 };
        with_env(source, target, 24, |env| {
            assert_eq!(
                rule.region(env),
                Some(Region {
                    x0: 4,
                    y0: 4,
                    w: 1,
                    h: 1,
                    nel: 1
                })
            );
        });
    }
}
