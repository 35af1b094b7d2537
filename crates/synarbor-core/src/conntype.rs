//! Connection type descriptors
//!
//! A [`ConnectionType`] is built once, validated, and then shared read-only
//! by every generation context that uses it. Validation rejects parameter
//! combinations that would otherwise surface mid-generation as scan
//! overruns or undefined rule pairings.

use std::sync::Arc;

use synarbor_storage::ConnTypeId;

use crate::delay::DelayRule;
use crate::error::{GenError, Result};
use crate::geometry::{SourceGeometry, TargetGeometry};
use crate::kernel::Kernel;
use crate::prng::Seed;
use crate::rules::{annulus_offsets, PrimaryRule, SecondaryRule};
use crate::strength::{StrengthRule, StrengthSpec};
use crate::subarbor::SubarborMode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a connection type's arbors are produced at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum OperatingMode {
    /// Evaluate the rules directly
    #[default]
    Generate,
    /// Re-evaluate from seeds and a stored skip list
    Regenerate,
    /// Read stored source indices
    Fetch,
}

/// The three independent generator seeds of a connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seeds {
    /// Topology (Lij) seed
    pub topology: Seed,
    /// Strength (Cij) seed
    pub strength: Seed,
    /// Delay (Dij) seed
    pub delay: Seed,
}

impl Seeds {
    /// Reduce three raw seeds
    pub fn new(topology: i64, strength: i64, delay: i64) -> Self {
        Self {
            topology: Seed::new(topology),
            strength: Seed::new(strength),
            delay: Seed::new(delay),
        }
    }
}

impl Default for Seeds {
    fn default() -> Self {
        Self::new(1009, 1009, 1009)
    }
}

/// Fixed draw counts that make every candidate's seed a closed-form
/// function of its index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBudget {
    /// Draws spent placing an anchor
    pub anchor: u64,
    /// Draws spent per candidate
    pub per_candidate: u64,
    /// Draws spent per arbor; cell `c` starts `c · per_arbor` draws in
    pub per_arbor: u64,
}

/// A validated connection type
#[derive(Debug, Clone)]
pub struct ConnectionType {
    id: ConnTypeId,
    source: SourceGeometry,
    target: TargetGeometry,
    same_layer: bool,
    nc: u32,
    primary: PrimaryRule,
    secondary: SecondaryRule,
    partitioned: bool,
    self_avoid: bool,
    subarbor: SubarborMode,
    seeds: Seeds,
    strength: StrengthSpec,
    delay: Option<DelayRule>,
    kernel: Option<Arc<Kernel>>,
    external_strength: bool,
    mode: OperatingMode,
    annulus: Vec<(i32, i32)>,
    budget: DrawBudget,
}

impl ConnectionType {
    /// Start building a connection type
    pub fn builder(
        id: ConnTypeId,
        source: SourceGeometry,
        target: TargetGeometry,
        nc: u32,
    ) -> ConnectionTypeBuilder {
        ConnectionTypeBuilder::new(id, source, target, nc)
    }

    /// Identifier
    pub fn id(&self) -> ConnTypeId {
        self.id
    }

    /// Source array
    pub fn source(&self) -> &SourceGeometry {
        &self.source
    }

    /// Target layer
    pub fn target(&self) -> &TargetGeometry {
        &self.target
    }

    /// Whether source and target are the same layer
    pub fn same_layer(&self) -> bool {
        self.same_layer
    }

    /// Declared synapses per arbor
    pub fn nc(&self) -> u32 {
        self.nc
    }

    /// Primary rule
    pub fn primary(&self) -> &PrimaryRule {
        &self.primary
    }

    /// Secondary rule
    pub fn secondary(&self) -> &SecondaryRule {
        &self.secondary
    }

    /// Whether the primary rule samples one bin per candidate
    pub fn partitioned(&self) -> bool {
        self.partitioned
    }

    /// Whether a cell may not connect to itself
    pub fn self_avoid(&self) -> bool {
        self.self_avoid
    }

    /// Subarbor layout
    pub fn subarbor(&self) -> &SubarborMode {
        &self.subarbor
    }

    /// Generator seeds
    pub fn seeds(&self) -> &Seeds {
        &self.seeds
    }

    /// Strength method and rounding
    pub fn strength(&self) -> &StrengthSpec {
        &self.strength
    }

    /// Delay method, if delays are generated
    pub fn delay(&self) -> Option<&DelayRule> {
        self.delay.as_ref()
    }

    /// Kernel table, for kernel rules
    pub fn kernel(&self) -> Option<&Kernel> {
        self.kernel.as_deref()
    }

    /// Whether stored strengths override the strength method
    pub fn external_strength(&self) -> bool {
        self.external_strength
    }

    /// Configured operating mode
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Precomputed annulus offsets (empty unless the secondary is an annulus)
    pub fn annulus(&self) -> &[(i32, i32)] {
        &self.annulus
    }

    /// Draw accounting
    pub fn budget(&self) -> &DrawBudget {
        &self.budget
    }

    /// Synapses per subarbor
    pub fn nsa(&self) -> u32 {
        self.subarbor.nsa(self.nc)
    }

    /// Number of subarbors per arbor
    pub fn subarbor_count(&self) -> u32 {
        self.subarbor.count(self.nc)
    }

    /// Number of target cells
    pub fn cell_count(&self) -> u32 {
        self.target.size() as u32
    }

    /// Per-cell topology, strength and delay seeds
    pub fn cell_seeds(&self, cell: u32) -> Seeds {
        let cell = cell as u64;
        Seeds {
            topology: self.seeds.topology.skip(cell * self.budget.per_arbor),
            strength: self.seeds.strength.skip(cell * self.nc as u64),
            delay: self.seeds.delay.skip(cell * self.nc as u64),
        }
    }

    /// Steps a walk or bin partition spans before it restarts
    pub fn walk_length(&self) -> u32 {
        match self.subarbor {
            SubarborMode::None => self.nc,
            SubarborMode::Clone { nsa, .. } | SubarborMode::Independent { nsa } => nsa,
            SubarborMode::Repeat { .. } => self.subarbor_count(),
        }
    }
}

/// Fluent builder for [`ConnectionType`]
#[derive(Debug, Clone)]
pub struct ConnectionTypeBuilder {
    id: ConnTypeId,
    source: SourceGeometry,
    target: TargetGeometry,
    same_layer: bool,
    nc: u32,
    primary: PrimaryRule,
    secondary: SecondaryRule,
    partitioned: bool,
    self_avoid: bool,
    subarbor: SubarborMode,
    seeds: Seeds,
    strength: StrengthSpec,
    delay: Option<DelayRule>,
    kernel: Option<Arc<Kernel>>,
    external_strength: bool,
    mode: OperatingMode,
}

impl ConnectionTypeBuilder {
    /// Builder with a diffuse primary rule and constant strength
    pub fn new(id: ConnTypeId, source: SourceGeometry, target: TargetGeometry, nc: u32) -> Self {
        Self {
            id,
            source,
            target,
            same_layer: false,
            nc,
            primary: PrimaryRule::Diffuse,
            secondary: SecondaryRule::Independent,
            partitioned: false,
            self_avoid: false,
            subarbor: SubarborMode::None,
            seeds: Seeds::default(),
            strength: StrengthSpec::default(),
            delay: None,
            kernel: None,
            external_strength: false,
            mode: OperatingMode::Generate,
        }
    }

    /// Mark source and target as the same layer
    pub fn with_same_layer(mut self, same_layer: bool) -> Self {
        self.same_layer = same_layer;
        self
    }

    /// Set the primary rule
    pub fn with_primary(mut self, primary: PrimaryRule) -> Self {
        self.primary = primary;
        self
    }

    /// Set the secondary rule
    pub fn with_secondary(mut self, secondary: SecondaryRule) -> Self {
        self.secondary = secondary;
        self
    }

    /// Sample one bin of the primary region per candidate
    pub fn with_partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    /// Forbid connections from a cell to itself
    pub fn with_self_avoidance(mut self, self_avoid: bool) -> Self {
        self.self_avoid = self_avoid;
        self
    }

    /// Set the subarbor layout
    pub fn with_subarbor(mut self, subarbor: SubarborMode) -> Self {
        self.subarbor = subarbor;
        self
    }

    /// Set the generator seeds
    pub fn with_seeds(mut self, seeds: Seeds) -> Self {
        self.seeds = seeds;
        self
    }

    /// Set the strength method
    pub fn with_strength(mut self, strength: StrengthSpec) -> Self {
        self.strength = strength;
        self
    }

    /// Generate delays with `delay`
    pub fn with_delay(mut self, delay: DelayRule) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Attach a kernel table
    pub fn with_kernel(mut self, kernel: Arc<Kernel>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Treat stored strengths as authoritative
    pub fn with_external_strength(mut self, external: bool) -> Self {
        self.external_strength = external;
        self
    }

    /// Set the operating mode
    pub fn with_mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate and prepare the connection type
    pub fn build(self) -> Result<ConnectionType> {
        self.validate()?;

        let annulus = match self.secondary {
            SecondaryRule::Annulus {
                outer_x,
                outer_y,
                inner_x,
                inner_y,
            } => {
                let table = annulus_offsets(outer_x, outer_y, inner_x, inner_y);
                if table.is_empty() {
                    return Err(self.invalid("annulus contains no offsets"));
                }
                if table.len() as u64 * self.source.nel as u64 > u32::MAX as u64 {
                    return Err(self.invalid("annulus too large"));
                }
                table
            }
            _ => Vec::new(),
        };

        let budget = self.budget();
        log::debug!(
            "{}: {} + {}, subarbor {}, {} draws per arbor",
            self.id,
            self.primary.name(),
            self.secondary.name(),
            self.subarbor.name(),
            budget.per_arbor
        );

        Ok(ConnectionType {
            id: self.id,
            source: self.source,
            target: self.target,
            same_layer: self.same_layer,
            nc: self.nc,
            primary: self.primary,
            secondary: self.secondary,
            partitioned: self.partitioned,
            self_avoid: self.self_avoid,
            subarbor: self.subarbor,
            seeds: self.seeds,
            strength: self.strength,
            delay: self.delay,
            kernel: self.kernel,
            external_strength: self.external_strength,
            mode: self.mode,
            annulus,
            budget,
        })
    }

    fn invalid(&self, reason: impl Into<String>) -> GenError {
        GenError::invalid_conntype(self.id, reason)
    }

    fn budget(&self) -> DrawBudget {
        let primary = self.primary.draws();
        let per_candidate = self.secondary.draws(&self.primary);
        let anchor = if self.secondary.is_anchored() { primary } else { 0 };
        let nc = self.nc as u64;
        let nsa = self.subarbor.nsa(self.nc) as u64;
        let count = self.subarbor.count(self.nc) as u64;
        let per_arbor = match self.subarbor {
            SubarborMode::None => anchor + nc * per_candidate,
            SubarborMode::Clone { .. } => anchor + nsa * per_candidate,
            SubarborMode::Independent { .. } => count * (anchor + nsa * per_candidate),
            SubarborMode::Repeat { .. } => anchor + count * per_candidate,
        };
        DrawBudget {
            anchor,
            per_candidate,
            per_arbor,
        }
    }

    fn validate(&self) -> Result<()> {
        let src = &self.source;
        let tgt = &self.target;

        if self.nc == 0 {
            return Err(self.invalid("nc must be positive"));
        }
        if src.nx == 0 || src.ny == 0 || src.nel == 0 {
            return Err(self.invalid("source geometry has a zero extent"));
        }
        if tgt.nx == 0 || tgt.ny == 0 || tgt.cpg == 0 {
            return Err(self.invalid("target geometry has a zero extent"));
        }
        if src.size() > i32::MAX as u64 || tgt.size() > i32::MAX as u64 {
            return Err(self.invalid("layer too large for 32-bit source indices"));
        }
        if self.same_layer && !tgt.matches(src) {
            return Err(self.invalid("same-layer source and target differ in shape"));
        }
        if self.self_avoid && !self.same_layer {
            return Err(self.invalid("self-avoidance needs source and target to be one layer"));
        }

        self.validate_subarbor()?;
        self.validate_rules()?;
        self.validate_strength()?;

        if let Some(delay) = &self.delay {
            if !delay.is_valid() {
                return Err(self.invalid("delay minimum exceeds maximum"));
            }
        }
        Ok(())
    }

    fn validate_subarbor(&self) -> Result<()> {
        match self.subarbor {
            SubarborMode::None => Ok(()),
            SubarborMode::Clone { nsa, row_width } => {
                self.check_nsa(nsa)?;
                if row_width == 0 {
                    return Err(self.invalid("clone row width must be positive"));
                }
                if !self.secondary.is_anchored() {
                    return Err(self.invalid("clone subarbors need an anchored secondary rule"));
                }
                Ok(())
            }
            SubarborMode::Independent { nsa } | SubarborMode::Repeat { nsa } => self.check_nsa(nsa),
        }
    }

    fn check_nsa(&self, nsa: u32) -> Result<()> {
        if nsa == 0 || self.nc % nsa != 0 {
            return Err(self.invalid(format!("nc {} is not a multiple of nsa {}", self.nc, nsa)));
        }
        Ok(())
    }

    fn walk_length(&self) -> u32 {
        match self.subarbor {
            SubarborMode::None => self.nc,
            SubarborMode::Clone { nsa, .. } | SubarborMode::Independent { nsa } => nsa,
            SubarborMode::Repeat { nsa } => self.nc / nsa.max(1),
        }
    }

    fn validate_rules(&self) -> Result<()> {
        let nel = self.source.nel;

        match self.primary {
            PrimaryRule::Uniform { wx, wy, .. } => {
                if wx == 0 || wy == 0 {
                    return Err(self.invalid("uniform window has a zero extent"));
                }
                if wx as u64 * wy as u64 * nel as u64 > u32::MAX as u64 {
                    return Err(self.invalid("uniform window too large"));
                }
            }
            PrimaryRule::Hypergroup { hx, hy } => {
                if hx == 0 || hy == 0 {
                    return Err(self.invalid("hypergroup block has a zero extent"));
                }
            }
            PrimaryRule::Group => {
                if !self.target.matches(&self.source) {
                    return Err(self.invalid("group rule needs matching source and target layers"));
                }
            }
            PrimaryRule::Kernel => {
                let Some(kernel) = &self.kernel else {
                    return Err(self.invalid("kernel rule without a kernel table"));
                };
                if kernel.is_empty() {
                    return Err(self.invalid("kernel table is empty"));
                }
                if kernel.max_orientation().is_some_and(|o| o as u32 >= nel) {
                    return Err(self.invalid("kernel orientation exceeds source elements"));
                }
            }
            _ => {}
        }

        if self.partitioned {
            if !self.primary.supports_partition() {
                return Err(self.invalid(format!(
                    "{} rule cannot be partitioned",
                    self.primary.name()
                )));
            }
            if self.secondary.is_anchored() {
                return Err(self.invalid("partitioned rules place every synapse themselves"));
            }
        }

        match self.secondary {
            SecondaryRule::Box { bx, by } => {
                if bx == 0 || by == 0 {
                    return Err(self.invalid("box has a zero extent"));
                }
                let limit = self.secondary.scan_limit(nel).unwrap_or(0);
                if limit < self.walk_length() as u64 {
                    return Err(self.invalid(format!(
                        "box scan covers {} candidates but {} are needed",
                        limit,
                        self.walk_length()
                    )));
                }
            }
            SecondaryRule::RandomBox { bx, by } => {
                if bx == 0 || by == 0 {
                    return Err(self.invalid("random box has a zero extent"));
                }
                if bx as u64 * by as u64 * nel as u64 > u32::MAX as u64 {
                    return Err(self.invalid("random box too large"));
                }
            }
            SecondaryRule::Annulus {
                outer_x,
                outer_y,
                inner_x,
                inner_y,
            } => {
                if outer_x == 0 && outer_y == 0 {
                    return Err(self.invalid("annulus has a zero outer radius"));
                }
                if inner_x > outer_x || inner_y > outer_y {
                    return Err(self.invalid("annulus inner radius exceeds outer radius"));
                }
            }
            SecondaryRule::KernelContinuation => {
                if self.primary != PrimaryRule::Kernel {
                    return Err(self.invalid("kernel continuation needs a kernel primary rule"));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn validate_strength(&self) -> Result<()> {
        let spec = &self.strength;
        if !(2..=16).contains(&spec.nbc) {
            return Err(self.invalid(format!("nbc {} outside 2..=16", spec.nbc)));
        }
        match &spec.rule {
            StrengthRule::Resident => {
                if self.primary != PrimaryRule::Kernel && !self.external_strength {
                    return Err(self.invalid(
                        "resident strength needs a kernel rule or external strengths",
                    ));
                }
            }
            StrengthRule::Matrix {
                bits,
                words,
                per_subarbor,
            } => {
                if !(1..=32).contains(bits) {
                    return Err(self.invalid(format!("matrix field width {} outside 1..=32", bits)));
                }
                let needed = if *per_subarbor {
                    self.subarbor.count(self.nc)
                } else {
                    self.nc
                } as u64;
                let held = words.len() as u64 * (32 / *bits as u64);
                if held < needed {
                    return Err(self.invalid(format!(
                        "matrix holds {} fields but {} are needed",
                        held, needed
                    )));
                }
            }
            StrengthRule::Geometric { rx, ry, .. } => {
                if *rx == 0 || *ry == 0 {
                    return Err(self.invalid("geometric strength radius must be positive"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}
