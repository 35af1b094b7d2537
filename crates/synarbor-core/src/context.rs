//! Per-(cell, connection type) generation cursor
//!
//! A [`GenerationContext`] produces the synapses of one arbor on demand. It
//! owns every piece of mutable state involved (working seed, anchor,
//! subarbor cursor, bounds state, skip-list position), so abandoning it at
//! any point leaves nothing to clean up and cannot disturb another cell.
//!
//! Candidate `jsyn` always starts from a closed-form seed position (see
//! [`DrawBudget`]), which is what lets the three operating modes visit the
//! same candidates in the same order:
//!
//! - **Generate** evaluates every candidate and can record accepted source
//!   indices, skips and strengths into an [`ArborBuffer`].
//! - **Regenerate** replays a stored skip list: listed candidates are
//!   fast-forwarded, every other candidate is evaluated and must be accepted.
//! - **Fetch** reads stored source indices in place of evaluation while
//!   keeping the same skip and subarbor accounting.
//!
//! [`DrawBudget`]: crate::conntype::DrawBudget

use synarbor_storage::{ArborBuffer, StorageError};

use crate::bounds::{BoundsManager, BoundsState};
use crate::conntype::{ConnectionType, OperatingMode, Seeds};
use crate::error::{GenError, Result};
use crate::geometry::{project, Loc, TargetCell};
use crate::prng::{Prng, Seed};
use crate::rules::{RuleEnv, Step};
use crate::strength::{Cij, Strength, StrengthInput};
use crate::subarbor::{clone_offset, SubarborCursor, SubarborMode, SubarborState};

/// Where a context gets its synapses from
#[derive(Debug, Clone, Copy)]
pub enum ModeSource<'a> {
    /// Evaluate the rules, optionally recording into a fresh buffer
    Generate {
        /// Record accepted indices, skips and strengths
        record: bool,
    },
    /// Evaluate the rules against a stored skip list
    Regenerate(&'a ArborBuffer),
    /// Read stored source indices
    Fetch(&'a ArborBuffer),
}

impl ModeSource<'_> {
    /// Operating mode this source corresponds to
    pub fn mode(&self) -> OperatingMode {
        match self {
            Self::Generate { .. } => OperatingMode::Generate,
            Self::Regenerate(_) => OperatingMode::Regenerate,
            Self::Fetch(_) => OperatingMode::Fetch,
        }
    }

    fn buffer(&self) -> Option<&ArborBuffer> {
        match self {
            Self::Generate { .. } => None,
            Self::Regenerate(buffer) | Self::Fetch(buffer) => Some(buffer),
        }
    }
}

/// An accepted candidate's topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Accepted-synapse number
    pub isyn: u32,
    /// Candidate number, skips included
    pub jsyn: u32,
    /// Source index
    pub lij: u32,
    /// Source coordinates
    pub loc: Loc,
}

/// One complete synapse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synapse {
    /// Accepted-synapse number
    pub isyn: u32,
    /// Candidate number, skips included
    pub jsyn: u32,
    /// Source index
    pub lij: u32,
    /// Strength
    pub cij: Cij,
    /// Delay, when the connection type generates delays
    pub dij: Option<u16>,
    /// Whether the strength fell below the connection type's threshold
    pub below_threshold: bool,
}

/// Final accounting of a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArborSummary {
    /// Accepted synapses (`nuk`)
    pub accepted: u32,
    /// Skipped candidates
    pub skipped: u32,
    /// Recorded buffer, when generating with recording on
    pub buffer: Option<ArborBuffer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Accept {
        lij: u32,
        loc: Loc,
        kernel_weight: Option<i32>,
    },
    Skip,
    Abort,
}

#[derive(Debug, Clone, Copy)]
struct Accepted {
    candidate: Candidate,
    subarbor: u32,
    kernel_weight: Option<i32>,
}

/// Mutable cursor over one (cell, connection type) arbor
#[derive(Debug)]
pub struct GenerationContext<'a> {
    conntype: &'a ConnectionType,
    source: ModeSource<'a>,
    cell: TargetCell,
    projected: (i32, i32),
    seeds: Seeds,
    prng: Prng,
    saved_seed: Seed,
    first_anchor: Option<Loc>,
    anchor: Option<(u32, Option<Loc>)>,
    repeat_base: Option<(u32, Outcome)>,
    cursor: SubarborCursor,
    bounds: BoundsManager,
    isyn: i64,
    jsyn: i64,
    first_call: bool,
    skip_cursor: u32,
    record: Option<ArborBuffer>,
    last: Option<Accepted>,
}

impl<'a> GenerationContext<'a> {
    /// Context for cell `cell` of `conntype`'s target layer
    pub fn new(conntype: &'a ConnectionType, cell: u32, source: ModeSource<'a>) -> Result<Self> {
        let cells = conntype.cell_count();
        if cell >= cells {
            return Err(StorageError::OutOfBounds {
                index: cell as usize,
                max: cells as usize,
            }
            .into());
        }
        if let Some(buffer) = source.buffer() {
            if buffer.nc() != conntype.nc() {
                return Err(StorageError::invalid_format(format!(
                    "stored arbor holds {} candidates, {} expects {}",
                    buffer.nc(),
                    conntype.id(),
                    conntype.nc()
                ))
                .into());
            }
        }
        if let ModeSource::Fetch(buffer) = source {
            if !buffer.has_payload() {
                return Err(StorageError::PayloadDiscarded.into());
            }
        }

        let target = conntype.target().cell(cell);
        let projected = project(conntype.target(), &target, conntype.source());
        let seeds = conntype.cell_seeds(cell);
        let record = match source {
            ModeSource::Generate { record: true } => Some(ArborBuffer::new(conntype.nc())),
            _ => None,
        };

        Ok(Self {
            conntype,
            source,
            cell: target,
            projected,
            seeds,
            prng: Prng::new(seeds.topology),
            saved_seed: seeds.topology.skip(conntype.budget().anchor),
            first_anchor: None,
            anchor: None,
            repeat_base: None,
            cursor: SubarborCursor::new(conntype.nsa()),
            bounds: BoundsManager::new(),
            isyn: -1,
            jsyn: -1,
            first_call: true,
            skip_cursor: 0,
            record,
            last: None,
        })
    }

    /// Connection type being generated
    pub fn conntype(&self) -> &ConnectionType {
        self.conntype
    }

    /// Cell receiving the arbor
    pub fn cell(&self) -> &TargetCell {
        &self.cell
    }

    /// Operating mode
    pub fn mode(&self) -> OperatingMode {
        self.source.mode()
    }

    /// Number of the last accepted synapse, `-1` before the first
    pub fn isyn(&self) -> i64 {
        self.isyn
    }

    /// Number of the last candidate considered, `-1` before the first
    pub fn jsyn(&self) -> i64 {
        self.jsyn
    }

    /// Synapses accepted so far
    pub fn nuk(&self) -> u32 {
        (self.isyn + 1) as u32
    }

    /// Candidates skipped so far
    pub fn skipped(&self) -> u32 {
        self.bounds.skipped()
    }

    /// Whether no synapse has been produced yet
    pub fn is_first_call(&self) -> bool {
        self.first_call
    }

    /// Whether every candidate has been considered
    pub fn is_complete(&self) -> bool {
        self.jsyn + 1 >= self.conntype.nc() as i64
    }

    /// Bounds manager state
    pub fn bounds_state(&self) -> BoundsState {
        self.bounds.state()
    }

    /// Current subarbor index
    pub fn isas(&self) -> u32 {
        self.cursor.isas()
    }

    /// Candidate number at which the current subarbor ends
    pub fn nsas(&self) -> u32 {
        self.cursor.nsas()
    }

    /// Candidate number within the current subarbor
    pub fn jsa(&self) -> u32 {
        self.cursor.jsa()
    }

    /// Working topology seed
    pub fn working_seed(&self) -> Seed {
        self.prng.seed()
    }

    /// Seed saved after the first anchor was placed
    pub fn saved_seed(&self) -> Seed {
        self.saved_seed
    }

    /// Advance to the next accepted candidate
    ///
    /// Rejected candidates are recorded as skips on the way. Returns `None`
    /// once all `nc` candidates have been considered.
    pub fn next_lij(&mut self) -> Result<Option<Candidate>> {
        let nc = self.conntype.nc();
        loop {
            if self.is_complete() {
                return Ok(None);
            }
            self.jsyn += 1;
            let jsyn = self.jsyn as u32;
            if self.cursor.enter(jsyn) == SubarborState::AdvanceAnchor {
                self.advance_anchor();
            }

            let listed = self.listed_skip() == Some(jsyn);
            let exhausted = !listed && self.bounds.is_exhausted(jsyn);
            let outcome = if listed {
                self.skip_cursor += 1;
                Outcome::Skip
            } else if exhausted {
                Outcome::Skip
            } else if let ModeSource::Fetch(buffer) = self.source {
                self.fetch(buffer, jsyn)?
            } else {
                self.evaluate(jsyn)?
            };

            match outcome {
                Outcome::Accept {
                    lij,
                    loc,
                    kernel_weight,
                } => {
                    self.isyn += 1;
                    self.bounds.accept();
                    self.first_call = false;
                    if let Some(record) = self.record.as_mut() {
                        record.push_accepted(lij)?;
                    }
                    let candidate = Candidate {
                        isyn: self.isyn as u32,
                        jsyn,
                        lij,
                        loc,
                    };
                    self.last = Some(Accepted {
                        candidate,
                        subarbor: self.cursor.isas(),
                        kernel_weight,
                    });
                    return Ok(Some(candidate));
                }
                Outcome::Skip | Outcome::Abort => {
                    if matches!(self.source, ModeSource::Regenerate(_)) && !listed && !exhausted {
                        return Err(GenError::SkipListMismatch {
                            conntype: self.conntype.id(),
                            cell: self.cell.id,
                            jsyn,
                        });
                    }
                    if outcome == Outcome::Abort {
                        let until = self.cursor.nsas().min(nc);
                        log::trace!(
                            "{} {}: arbor exhausted at candidate {}, skipping to {}",
                            self.conntype.id(),
                            self.cell.id,
                            jsyn,
                            until
                        );
                        self.bounds.exhaust(until);
                    }
                    self.bounds.reject();
                    if let Some(record) = self.record.as_mut() {
                        record.push_skip(jsyn)?;
                    }
                }
            }
        }
    }

    /// Strength of the most recently accepted synapse
    pub fn cij(&self) -> Result<Strength> {
        let last = self.last_accepted()?;
        let spec = self.conntype.strength();
        let stored = self
            .source
            .buffer()
            .and_then(|buffer| buffer.strength(last.candidate.isyn));

        if self.conntype.external_strength() {
            if let Some(value) = stored {
                return Ok(spec.classify(Cij::from_s15(value)));
            }
        }

        let input = StrengthInput {
            jsyn: last.candidate.jsyn,
            subarbor: last.subarbor,
            source: last.candidate.loc,
            source_geometry: self.conntype.source(),
            target_geometry: self.conntype.target(),
            cell: &self.cell,
            projected: self.projected,
            kernel_weight: last.kernel_weight,
            stored,
            seed: self.seeds.strength.skip(last.candidate.jsyn as u64),
        };
        let unrounded =
            spec.rule
                .unrounded(&input, spec.scale_s16)
                .ok_or(GenError::MissingStoredStrength {
                    conntype: self.conntype.id(),
                    cell: self.cell.id,
                })?;
        Ok(spec.finish(unrounded))
    }

    /// Delay of the most recently accepted synapse
    pub fn dij(&self) -> Result<Option<u16>> {
        let last = self.last_accepted()?;
        Ok(self.conntype.delay().map(|rule| {
            rule.delay(
                last.candidate.loc,
                self.projected,
                self.seeds.delay.skip(last.candidate.jsyn as u64),
            )
        }))
    }

    /// Advance to the next accepted candidate and compute its strength and
    /// delay
    pub fn next_synapse(&mut self) -> Result<Option<Synapse>> {
        let Some(candidate) = self.next_lij()? else {
            return Ok(None);
        };
        let strength = self.cij()?;
        let dij = self.dij()?;
        if let Some(record) = self.record.as_mut() {
            record.push_strength(strength.cij.to_s15())?;
        }
        Ok(Some(Synapse {
            isyn: candidate.isyn,
            jsyn: candidate.jsyn,
            lij: candidate.lij,
            cij: strength.cij,
            dij,
            below_threshold: strength.below_threshold,
        }))
    }

    /// Final counts and the recorded buffer
    pub fn finish(self) -> ArborSummary {
        log::debug!(
            "{} {} ({:?}): {} accepted, {} skipped of {}",
            self.conntype.id(),
            self.cell.id,
            self.source.mode(),
            self.nuk(),
            self.skipped(),
            self.conntype.nc()
        );
        ArborSummary {
            accepted: self.nuk(),
            skipped: self.skipped(),
            buffer: self.record,
        }
    }

    fn last_accepted(&self) -> Result<&Accepted> {
        self.last.as_ref().ok_or(GenError::Uninitialized {
            conntype: self.conntype.id(),
            cell: self.cell.id,
        })
    }

    fn listed_skip(&self) -> Option<u32> {
        self.source.buffer()?.skip_at(self.skip_cursor)
    }

    fn advance_anchor(&mut self) {
        if let SubarborMode::Clone { .. } = self.conntype.subarbor() {
            self.prng.reset(self.saved_seed);
        }
        log::trace!(
            "{} {}: subarbor {} begins at candidate {}",
            self.conntype.id(),
            self.cell.id,
            self.cursor.isas(),
            self.jsyn
        );
    }

    /// Step index handed to the rules for the current candidate
    fn current_step(&self) -> u32 {
        match self.conntype.subarbor() {
            SubarborMode::Repeat { .. } => self.cursor.isas(),
            _ => self.cursor.jsa(),
        }
    }

    fn kernel_weight(&self, step: u32) -> Option<i32> {
        self.conntype.kernel().map(|kernel| kernel.entry(step).weight)
    }

    fn fetch(&self, buffer: &ArborBuffer, jsyn: u32) -> Result<Outcome> {
        let isyn = (self.isyn + 1) as u32;
        let lij = match buffer.lij(isyn) {
            Ok(lij) => lij,
            Err(StorageError::OutOfBounds { .. }) => {
                return Err(GenError::FetchExhausted {
                    conntype: self.conntype.id(),
                    cell: self.cell.id,
                    jsyn,
                })
            }
            Err(err) => return Err(err.into()),
        };
        let size = self.conntype.source().size();
        if lij as u64 >= size {
            return Err(StorageError::OutOfBounds {
                index: lij as usize,
                max: size as usize,
            }
            .into());
        }
        Ok(Outcome::Accept {
            lij,
            loc: self.conntype.source().locate(lij),
            kernel_weight: self.kernel_weight(self.current_step()),
        })
    }

    fn evaluate(&mut self, jsyn: u32) -> Result<Outcome> {
        if let SubarborMode::Repeat { .. } = self.conntype.subarbor() {
            let k = self.cursor.isas();
            if let Some((base, outcome)) = self.repeat_base {
                if base == k {
                    return Ok(outcome);
                }
            }
            let outcome = self.evaluate_step(jsyn, k, k)?;
            self.repeat_base = Some((k, outcome));
            return Ok(outcome);
        }
        let (k, step) = (self.cursor.isas(), self.cursor.jsa());
        self.evaluate_step(jsyn, k, step)
    }

    fn evaluate_step(&mut self, jsyn: u32, k: u32, step: u32) -> Result<Outcome> {
        let ct = self.conntype;
        let src = ct.source();
        if let Some(limit) = ct.secondary().scan_limit(src.nel) {
            if step as u64 >= limit {
                return Err(GenError::ScanOverrun {
                    conntype: ct.id(),
                    cell: self.cell.id,
                    jsyn,
                });
            }
        }

        let anchor = if ct.secondary().is_anchored() {
            match self.anchor_for(k) {
                Some(loc) => Some(loc),
                None => return Ok(Outcome::Abort),
            }
        } else {
            None
        };

        self.prng.reset(self.candidate_seed(k, step));
        let cell = self.cell;
        let env = RuleEnv {
            source: src,
            target: ct.target(),
            cell: &cell,
            projected: self.projected,
            kernel: ct.kernel(),
            annulus: ct.annulus(),
        };
        let result = match anchor {
            Some(anchor) => ct.secondary().next(
                &env,
                &mut self.prng,
                anchor,
                step,
                ct.primary().may_be_out_of_bounds(),
            ),
            None => {
                let partition = ct.partitioned().then(|| ct.walk_length());
                ct.primary().pick(&env, &mut self.prng, step, partition)
            }
        };
        self.prng.pad_to(ct.budget().per_candidate);

        let outcome = match result {
            Step::Continue(loc) => match src.index(loc) {
                None => Outcome::Skip,
                Some(lij) if ct.self_avoid() && lij == cell.id.raw() => Outcome::Skip,
                Some(lij) => Outcome::Accept {
                    lij,
                    loc,
                    kernel_weight: self.kernel_weight(step),
                },
            },
            Step::Skip => Outcome::Skip,
            Step::AbortArbor => Outcome::Abort,
        };
        log::trace!(
            "{} {}: candidate {} (step {}) -> {:?}",
            ct.id(),
            cell.id,
            jsyn,
            step,
            outcome
        );
        Ok(outcome)
    }

    /// Seed position of candidate `step` of subarbor `k`
    fn candidate_seed(&self, k: u32, step: u32) -> Seed {
        let budget = self.conntype.budget();
        let per = budget.per_candidate;
        match self.conntype.subarbor() {
            SubarborMode::Independent { nsa } => {
                let stride = budget.anchor + *nsa as u64 * per;
                self.seeds
                    .topology
                    .skip(k as u64 * stride + budget.anchor + step as u64 * per)
            }
            _ => self.saved_seed.skip(step as u64 * per),
        }
    }

    /// Anchor of subarbor `k`, or `None` when a cloned anchor falls outside
    /// the source array
    fn anchor_for(&mut self, k: u32) -> Option<Loc> {
        if let Some((cached, loc)) = self.anchor {
            if cached == k {
                return loc;
            }
        }
        let loc = match *self.conntype.subarbor() {
            SubarborMode::Independent { nsa } => {
                let budget = self.conntype.budget();
                let stride = budget.anchor + nsa as u64 * budget.per_candidate;
                Some(self.place_anchor(self.seeds.topology.skip(k as u64 * stride), k))
            }
            SubarborMode::Clone { row_width, .. } => {
                let first = self.first_anchor();
                if k == 0 {
                    Some(first)
                } else {
                    let (dx, dy) = clone_offset(k, row_width);
                    let moved = first.offset(dx, dy);
                    self.conntype
                        .source()
                        .contains_position(moved)
                        .then_some(moved)
                }
            }
            SubarborMode::None | SubarborMode::Repeat { .. } => Some(self.first_anchor()),
        };
        self.anchor = Some((k, loc));
        loc
    }

    fn first_anchor(&mut self) -> Loc {
        if let Some(loc) = self.first_anchor {
            return loc;
        }
        let loc = self.place_anchor(self.seeds.topology, 0);
        debug_assert_eq!(self.prng.seed(), self.saved_seed);
        self.first_anchor = Some(loc);
        loc
    }

    fn place_anchor(&mut self, seed: Seed, k: u32) -> Loc {
        let ct = self.conntype;
        self.prng.reset(seed);
        let cell = self.cell;
        let env = RuleEnv {
            source: ct.source(),
            target: ct.target(),
            cell: &cell,
            projected: self.projected,
            kernel: ct.kernel(),
            annulus: ct.annulus(),
        };
        let loc = ct.primary().anchor(&env, &mut self.prng, k);
        self.prng.pad_to(ct.budget().anchor);
        loc
    }
}
