//! Clock Domain.
//!
//! A `Clock` is a periodic timing domain with a LOW/HIGH state, an edge
//! counter, a compensated time accumulator and the table of registers that
//! modules want committed on each of its edges. Derivation links between
//! clocks are managed by [`super::ClockTree`]; a clock only records the
//! handles of its master and of the clocks derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::edge::{ClockState, ClockType, EdgeType};
use crate::common::constants::DEGREES_PER_PERIOD;
use crate::common::{ClockId, ModuleId, Result, SimError, Summation, TimeAccumulator};

/// Registers, grouped by owning module, committed on one edge of a clock.
pub type EdgeRegistrations = BTreeMap<ModuleId, Vec<usize>>;

/// User-supplied clock parameters.
///
/// For a derived clock only `phase_deg` and the division factor matter;
/// its frequency is taken from its master.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockSpec {
    /// Input frequency in hertz.
    pub frequency_hz: f64,
    /// Phase offset of the first edge, in degrees of the full period.
    pub phase_deg: f64,
    /// Division factor numerator.
    pub division_num: u64,
    /// Division factor denominator.
    pub division_den: u64,
}

impl Default for ClockSpec {
    fn default() -> Self {
        Self {
            frequency_hz: 1.0,
            phase_deg: 0.0,
            division_num: 1,
            division_den: 1,
        }
    }
}

/// A periodic or derived timing domain.
#[derive(Debug)]
pub struct Clock {
    path: String,
    owner: Option<ModuleId>,

    pub(crate) state: ClockState,
    pub(crate) next_edge_type: EdgeType,
    pub(crate) clock_type: ClockType,

    pub(crate) time: TimeAccumulator,
    pub(crate) spec: ClockSpec,
    pub(crate) frequency: f64,
    pub(crate) full_period: f64,
    pub(crate) half_period: f64,
    pub(crate) last_edge_time: f64,
    pub(crate) next_edge_time: f64,

    pub(crate) n_ticks: u64,
    pub(crate) n_edges: u64,
    pub(crate) n_resyncs: u64,

    pub(crate) master: Option<ClockId>,
    pub(crate) derived: Vec<ClockId>,

    posedge: EdgeRegistrations,
    negedge: EdgeRegistrations,
}

impl Clock {
    pub(crate) fn new(path: String, owner: Option<ModuleId>, summation: Summation) -> Self {
        let spec = ClockSpec::default();
        Self {
            path,
            owner,
            state: ClockState::Low,
            next_edge_type: EdgeType::Positive,
            clock_type: ClockType::Independent,
            time: TimeAccumulator::new(summation),
            frequency: spec.frequency_hz,
            full_period: 1.0 / spec.frequency_hz,
            half_period: 0.5 / spec.frequency_hz,
            spec,
            last_edge_time: 0.0,
            next_edge_time: 0.0,
            n_ticks: 0,
            n_edges: 0,
            n_resyncs: 0,
            master: None,
            derived: Vec::new(),
            posedge: EdgeRegistrations::new(),
            negedge: EdgeRegistrations::new(),
        }
    }

    /// Returns the fully qualified name of the clock.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the module that declared the clock, if any.
    pub fn owner(&self) -> Option<ModuleId> {
        self.owner
    }

    /// Returns the current logic level.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Returns the direction of the edge this clock fires next.
    pub fn next_edge_type(&self) -> EdgeType {
        self.next_edge_type
    }

    /// Returns how the clock obtains its timing.
    pub fn clock_type(&self) -> ClockType {
        self.clock_type
    }

    /// Returns the configured parameters.
    pub fn spec(&self) -> &ClockSpec {
        &self.spec
    }

    /// Returns the division factor as `(numerator, denominator)`.
    pub fn division_factor(&self) -> (u64, u64) {
        (self.spec.division_num, self.spec.division_den)
    }

    /// Returns the effective frequency in hertz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Returns the effective full period.
    pub fn full_period(&self) -> f64 {
        self.full_period
    }

    /// Returns the effective half period.
    pub fn half_period(&self) -> f64 {
        self.half_period
    }

    /// Returns the time of the next edge.
    pub fn next_edge_time(&self) -> f64 {
        self.next_edge_time
    }

    /// Returns the time of the most recent edge.
    pub fn last_edge_time(&self) -> f64 {
        self.last_edge_time
    }

    /// Returns the number of positive edges fired so far.
    pub fn tick_count(&self) -> u64 {
        self.n_ticks
    }

    /// Returns the number of edges fired so far.
    pub fn edge_count(&self) -> u64 {
        self.n_edges
    }

    /// Returns how many times the clock was resynchronized to its master.
    pub fn resync_count(&self) -> u64 {
        self.n_resyncs
    }

    /// Returns the master clock, if this clock is derived.
    pub fn master(&self) -> Option<ClockId> {
        self.master
    }

    /// Returns the clocks derived from this one, in link order.
    pub fn derived(&self) -> &[ClockId] {
        &self.derived
    }

    /// Returns the time accumulator backing this clock.
    pub fn time(&self) -> &TimeAccumulator {
        &self.time
    }

    /// Returns the registers committed on the given edge, grouped by module.
    pub fn registrations(&self, edge: EdgeType) -> &EdgeRegistrations {
        match edge {
            EdgeType::Positive => &self.posedge,
            EdgeType::Negative => &self.negedge,
        }
    }

    /// Validates and stores user parameters.
    pub(crate) fn configure(&mut self, spec: ClockSpec) -> Result<()> {
        if spec.division_num == 0 || spec.division_den == 0 {
            return Err(SimError::InvalidDivisionFactor {
                path: self.path.clone(),
                num: spec.division_num,
                den: spec.division_den,
            });
        }
        if !spec.frequency_hz.is_finite() || spec.frequency_hz <= 0.0 {
            return Err(SimError::InvalidFrequency {
                path: self.path.clone(),
                frequency_hz: spec.frequency_hz,
            });
        }
        if !spec.phase_deg.is_finite() {
            return Err(SimError::InvalidPhase {
                path: self.path.clone(),
                phase_deg: spec.phase_deg,
            });
        }
        self.spec = spec;
        Ok(())
    }

    /// Associates a module's register with one edge of this clock.
    pub(crate) fn register_on_edge(&mut self, module: ModuleId, register: usize, edge: EdgeType) {
        let map = match edge {
            EdgeType::Positive => &mut self.posedge,
            EdgeType::Negative => &mut self.negedge,
        };
        let registers = map.entry(module).or_default();
        if !registers.contains(&register) {
            registers.push(register);
        }
    }

    /// Division factor as a floating-point ratio.
    pub(crate) fn ratio(&self) -> f64 {
        self.spec.division_num as f64 / self.spec.division_den as f64
    }

    /// Sets the effective periods from a full period.
    pub(crate) fn set_full_period(&mut self, full_period: f64) {
        self.full_period = full_period;
        self.half_period = full_period / 2.0;
        self.frequency = 1.0 / full_period;
    }

    /// Computes the periods of an independent clock from its own frequency.
    pub(crate) fn derive_own_period(&mut self) {
        let frequency = self.spec.frequency_hz / self.ratio();
        self.set_full_period(1.0 / frequency);
    }

    /// Time offset of the first edge after a (re)synchronization.
    pub(crate) fn phase_offset(&self) -> f64 {
        self.spec.phase_deg / DEGREES_PER_PERIOD * self.full_period
    }

    /// Fires the pending edge: counts it, flips the level and schedules the next one.
    ///
    /// With negative-edge support disabled the clock never leaves LOW and
    /// steps a full period per edge, so every edge is a positive edge.
    pub(crate) fn fire(&mut self, negedge_enabled: bool) {
        self.n_edges += 1;
        if self.state == ClockState::Low {
            self.n_ticks += 1;
        }
        self.last_edge_time = self.next_edge_time;

        if negedge_enabled {
            self.state = self.state.toggled();
            self.next_edge_time = self.time.advance(self.half_period);
            self.next_edge_type = self.state.leaving_edge();
        } else {
            self.next_edge_time = self.time.advance(self.full_period);
        }
    }
}
