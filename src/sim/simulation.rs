//! Simulation Root.
//!
//! The `Simulation` owns the clock tree, the netlist and the scheduler, and
//! is the only way to advance time. A macro-step can be taken in one call
//! with [`Simulation::step`], or split into [`Simulation::next_edge_set`]
//! and [`Simulation::run_edge_set`] so external code can inspect the clocks
//! about to fire before they do.

use tracing::debug;

use super::netlist::{Entity, HierarchyEntry, Netlist};
use crate::clock::{Clock, ClockTree};
use crate::common::{ClockId, ModuleId, Port, Reg, Result, SimError, Signal, Wire};
use crate::config::SimulationConfig;
use crate::module::LogicType;
use crate::sched::{EdgeSet, Scheduler};
use crate::stats::SimStats;

/// A fully built, runnable simulation.
pub struct Simulation {
    netlist: Netlist,
    clocks: ClockTree,
    scheduler: Scheduler,
    settings: SimulationConfig,
    stats: SimStats,
}

impl Simulation {
    pub(crate) fn new(
        netlist: Netlist,
        clocks: ClockTree,
        scheduler: Scheduler,
        settings: SimulationConfig,
    ) -> Self {
        Self {
            netlist,
            clocks,
            scheduler,
            settings,
            stats: SimStats::default(),
        }
    }

    /// Returns the clocks that fire in the next macro-step, in execution order.
    pub fn next_edge_set(&self) -> Result<EdgeSet> {
        self.scheduler.select_next_edge_set(&self.clocks)
    }

    /// Executes one macro-step for an edge set obtained from [`next_edge_set`](Self::next_edge_set).
    pub fn run_edge_set(&mut self, edge_set: &EdgeSet) -> Result<()> {
        self.scheduler.run(
            edge_set,
            &mut self.clocks,
            &mut self.netlist,
            &mut self.stats,
        )
    }

    /// Selects and executes the next macro-step.
    ///
    /// # Returns
    ///
    /// The edge set that was executed.
    pub fn step(&mut self) -> Result<EdgeSet> {
        let edge_set = self.next_edge_set()?;
        self.run_edge_set(&edge_set)?;
        Ok(edge_set)
    }

    /// Executes `steps` macro-steps.
    pub fn run_for(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Executes macro-steps until `keep_going` returns false.
    ///
    /// The predicate is checked after each step, so at least one step runs.
    ///
    /// # Returns
    ///
    /// The number of macro-steps executed.
    pub fn run_while(&mut self, mut keep_going: impl FnMut(&Simulation) -> bool) -> Result<u64> {
        let mut steps = 0;
        loop {
            self.step()?;
            steps += 1;
            if !keep_going(self) {
                break;
            }
        }
        Ok(steps)
    }

    /// Executes the configured maximum number of macro-steps.
    pub fn run(&mut self) -> Result<u64> {
        let steps = self.settings.max_macro_steps;
        debug!(steps, "running");
        self.run_for(steps)?;
        Ok(steps)
    }

    /// Time of the most recent macro-step, zero before the first.
    pub fn time(&self) -> f64 {
        self.stats.sim_time
    }

    /// Returns the kernel settings.
    pub fn settings(&self) -> &SimulationConfig {
        &self.settings
    }

    /// Returns the run statistics.
    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Returns the clock tree.
    pub fn clocks(&self) -> &ClockTree {
        &self.clocks
    }

    /// Returns the netlist.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Clocks in ascending next-edge-time order.
    pub fn clock_order(&self) -> &[ClockId] {
        self.scheduler.order()
    }

    /// Looks up a clock.
    pub fn clock(&self, id: ClockId) -> Result<&Clock> {
        self.clocks.get(id)
    }

    /// Finds a clock by full path.
    pub fn clock_id(&self, path: &str) -> Result<ClockId> {
        match self.netlist.entity(path) {
            Some(Entity::Clock(id)) => Ok(id),
            _ => Err(SimError::UnknownPath {
                path: path.to_string(),
                kind: "clock",
            }),
        }
    }

    /// Finds a module by full path.
    pub fn module_id(&self, path: &str) -> Result<ModuleId> {
        match self.netlist.entity(path) {
            Some(Entity::Module(id)) => Ok(id),
            _ => Err(SimError::UnknownPath {
                path: path.to_string(),
                kind: "module",
            }),
        }
    }

    /// Returns whether a module has registers on clock edges.
    pub fn logic_type(&self, id: ModuleId) -> Result<LogicType> {
        self.netlist.logic_type(id)
    }

    /// Resolves a port between macro-steps.
    ///
    /// Combinational producers are settled as needed; their `done` flags are
    /// cleared again afterwards so the next macro-step evaluates them afresh.
    pub fn peek<T: Signal>(&mut self, port: Port<T>) -> Result<T> {
        let value = self.netlist.get(port, &self.clocks);
        self.netlist.end_macro_step();
        value
    }

    /// Overwrites a wire between macro-steps.
    pub fn poke<T: Signal>(&mut self, wire: Wire<T>, value: T) -> Result<()> {
        self.netlist.write_wire(wire, value)
    }

    /// Committed output of a register.
    pub fn register<T: Signal>(&self, reg: Reg<T>) -> Result<T> {
        self.netlist.register_output(reg)
    }

    /// Lists every declared module, clock, port, register and wire by path.
    pub fn hierarchy(&self) -> Vec<HierarchyEntry> {
        self.netlist.hierarchy()
    }
}
