//! TOML network descriptions
//!
//! A network is a list of named layers and a list of connection types
//! between them:
//!
//! ```toml
//! [network]
//! name = "v1"
//!
//! [[layer]]
//! name = "retina"
//! nx = 16
//! ny = 16
//! cpg = 1
//!
//! [[conntype]]
//! id = 1
//! source = "retina"
//! target = "retina"
//! nc = 12
//! primary = { kind = "uniform", wx = 5, wy = 5 }
//! strength = { rule = { kind = "random", mixed_sign = true }, scale = 0.5, nbc = 12 }
//! ```

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use synarbor_core::{
    ConnectionType, DelayRule, Kernel, KernelEntry, OperatingMode, PrimaryRule, SecondaryRule,
    Seeds, SourceGeometry, StrengthRule, StrengthSpec, SubarborMode, TargetGeometry,
};
use synarbor_storage::ConnTypeId;

use crate::error::{CliError, CliResult};

/// Whole network description
#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    /// Descriptive header
    #[serde(default)]
    pub network: NetworkInfo,
    /// Cell layers
    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerConfig>,
    /// Connection types
    #[serde(default, rename = "conntype")]
    pub conntypes: Vec<ConnTypeConfig>,
}

/// Network header
#[derive(Debug, Default, Deserialize)]
pub struct NetworkInfo {
    /// Network name
    #[serde(default)]
    pub name: String,
}

/// A layer of `nx × ny` groups of `cpg` cells
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Layer name referenced by connection types
    pub name: String,
    /// Groups per row
    pub nx: u32,
    /// Group rows
    pub ny: u32,
    /// Cells per group
    #[serde(default = "one")]
    pub cpg: u32,
}

/// One connection type
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnTypeConfig {
    /// Connection type id (non-zero)
    pub id: u16,
    /// Source layer name
    pub source: String,
    /// Target layer name
    pub target: String,
    /// Synapses per arbor
    pub nc: u32,
    /// Primary rule
    #[serde(default = "diffuse")]
    pub primary: PrimaryRule,
    /// Secondary rule
    #[serde(default)]
    pub secondary: SecondaryRule,
    /// Sample one bin of the primary region per candidate
    #[serde(default)]
    pub partitioned: bool,
    /// Forbid self-connections (source and target must be one layer)
    #[serde(default)]
    pub self_avoid: bool,
    /// Subarbor layout
    #[serde(default)]
    pub subarbor: SubarborMode,
    /// Generator seeds
    #[serde(default)]
    pub seeds: SeedConfig,
    /// Strength method
    #[serde(default)]
    pub strength: StrengthConfig,
    /// Delay method
    #[serde(default)]
    pub delay: Option<DelayRule>,
    /// Kernel entries for kernel rules
    #[serde(default)]
    pub kernel: Vec<KernelEntry>,
    /// Stored strengths override the strength method
    #[serde(default)]
    pub external_strength: bool,
    /// Operating mode used when replaying
    #[serde(default)]
    pub mode: OperatingMode,
}

/// Raw generator seeds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SeedConfig {
    /// Topology seed
    #[serde(default = "default_seed")]
    pub topology: i64,
    /// Strength seed
    #[serde(default = "default_seed")]
    pub strength: i64,
    /// Delay seed
    #[serde(default = "default_seed")]
    pub delay: i64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            topology: default_seed(),
            strength: default_seed(),
            delay: default_seed(),
        }
    }
}

/// Strength method with its scaling and rounding
#[derive(Debug, Clone, Deserialize)]
pub struct StrengthConfig {
    /// Method
    pub rule: StrengthRule,
    /// Scale factor
    #[serde(default = "unit_scale")]
    pub scale: f64,
    /// Significant bits kept by rounding
    #[serde(default = "default_nbc")]
    pub nbc: u8,
    /// Strengths below this magnitude are dropped
    #[serde(default)]
    pub min_threshold: f64,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            rule: StrengthRule::Constant { value: 0.5 },
            scale: unit_scale(),
            nbc: default_nbc(),
            min_threshold: 0.0,
        }
    }
}

fn one() -> u32 {
    1
}

fn diffuse() -> PrimaryRule {
    PrimaryRule::Diffuse
}

fn default_seed() -> i64 {
    1009
}

fn unit_scale() -> f64 {
    1.0
}

fn default_nbc() -> u8 {
    16
}

impl NetworkConfig {
    /// Load a network description
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a network description
    pub fn parse(text: &str) -> CliResult<Self> {
        toml::from_str(text).map_err(|e| CliError::config(format!("Invalid network: {}", e)))
    }

    /// Build and validate every connection type
    pub fn build(&self) -> CliResult<Vec<ConnectionType>> {
        let mut layers: HashMap<&str, &LayerConfig> = HashMap::new();
        for layer in &self.layers {
            if layers.insert(layer.name.as_str(), layer).is_some() {
                return Err(CliError::config(format!("layer '{}' defined twice", layer.name)));
            }
        }

        let mut seen = HashSet::new();
        let mut built = Vec::with_capacity(self.conntypes.len());
        for ct in &self.conntypes {
            if ct.id == 0 {
                return Err(CliError::config("connection type id 0 is reserved"));
            }
            if !seen.insert(ct.id) {
                return Err(CliError::config(format!("connection type {} defined twice", ct.id)));
            }
            let source = lookup(&layers, &ct.source)?;
            let target = lookup(&layers, &ct.target)?;
            built.push(ct.build(source, target)?);
        }
        Ok(built)
    }
}

fn lookup<'a>(layers: &HashMap<&str, &'a LayerConfig>, name: &str) -> CliResult<&'a LayerConfig> {
    layers
        .get(name)
        .copied()
        .ok_or_else(|| CliError::config(format!("unknown layer '{}'", name)))
}

impl ConnTypeConfig {
    fn build(&self, source: &LayerConfig, target: &LayerConfig) -> CliResult<ConnectionType> {
        let strength = StrengthSpec::new(
            self.strength.rule.clone(),
            self.strength.scale,
            self.strength.nbc,
            self.strength.min_threshold,
        );
        let mut builder = ConnectionType::builder(
            ConnTypeId::new(self.id),
            SourceGeometry::new(source.nx, source.ny, source.cpg),
            TargetGeometry::new(target.nx, target.ny, target.cpg),
            self.nc,
        )
        .with_same_layer(source.name == target.name)
        .with_primary(self.primary.clone())
        .with_secondary(self.secondary.clone())
        .with_partitioned(self.partitioned)
        .with_self_avoidance(self.self_avoid)
        .with_subarbor(self.subarbor)
        .with_seeds(Seeds::new(
            self.seeds.topology,
            self.seeds.strength,
            self.seeds.delay,
        ))
        .with_strength(strength)
        .with_external_strength(self.external_strength)
        .with_mode(self.mode);
        if let Some(delay) = self.delay {
            builder = builder.with_delay(delay);
        }
        if !self.kernel.is_empty() {
            builder = builder.with_kernel(Arc::new(Kernel::new(self.kernel.iter().copied())));
        }
        Ok(builder.build()?)
    }
}

/// Commented sample written by `synarbor init`
pub const SAMPLE_NETWORK: &str = r#"# synarbor network description
[network]
name = "{name}"

# Layers are nx × ny groups of cpg cells. As a source, cpg is the number of
# elements per position.
[[layer]]
name = "input"
nx = 16
ny = 16
cpg = 2

[[layer]]
name = "cortex"
nx = 8
ny = 8
cpg = 4

# Feed-forward: each cortex cell samples a 5 × 5 window of the input around
# its projected position.
[[conntype]]
id = 1
source = "input"
target = "cortex"
nc = 16
primary = { kind = "uniform", wx = 5, wy = 5 }
seeds = { topology = 4242, strength = 77, delay = 31337 }
strength = { rule = { kind = "random", mixed_sign = true }, scale = 0.5, nbc = 12, min_threshold = 0.01 }
delay = { kind = "distance", base = 1, per_position = 1 }

# Lateral: clusters of four around a random anchor, cloned over a 2 × 2 grid.
[[conntype]]
id = 2
source = "cortex"
target = "cortex"
nc = 16
self_avoid = true
primary = { kind = "diffuse" }
secondary = { kind = "random-box", bx = 3, by = 3 }
subarbor = { kind = "clone", nsa = 4, row_width = 2 }
strength = { rule = { kind = "tuning" }, scale = 0.25, nbc = 8 }
mode = "regenerate"
"#;

/// Sample network with its name filled in
pub fn sample(name: &str) -> String {
    SAMPLE_NETWORK.replace("{name}", name)
}
