//! Simulation Builder.
//!
//! This module defines the `SimulationBuilder`, which collects every module,
//! port, register, wire and clock of a simulation during setup and turns
//! them into a runnable [`Simulation`]. Setup runs in a fixed order:
//! 1. **Declare:** Modules, ports, registers, wires and clocks get paths.
//! 2. **Connect:** Each module's `connect()` hook binds ports and edges.
//! 3. **Configure:** Queued clock parameters are applied by path.
//! 4. **Optimize:** Forwarding chains collapse; unbound ports are fatal.
//! 5. **Init:** Each module's `init()` hook presets state.
//! 6. **Clocks:** Periods are computed and derived clocks synchronized.
//!
//! Every error surfaces from [`SimulationBuilder::build`], before the first
//! macro-step.

use tracing::{debug, info, warn};

use super::netlist::{Entity, Netlist};
use super::simulation::Simulation;
use crate::clock::{ClockSpec, ClockTree, EdgeType};
use crate::common::{ClockId, ModuleId, Port, Reg, Result, SimError, Signal, Source, Wire};
use crate::config::{ClockConfig, Config, SimulationConfig};
use crate::module::{ConnectContext, InitContext, Module};
use crate::sched::Scheduler;

/// Collector for everything a simulation is made of.
pub struct SimulationBuilder {
    netlist: Netlist,
    clocks: ClockTree,
    settings: SimulationConfig,
    clock_configs: Vec<ClockConfig>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::with_settings(SimulationConfig::default())
    }

    /// Creates a builder with the given kernel settings.
    pub fn with_settings(settings: SimulationConfig) -> Self {
        Self {
            netlist: Netlist::new(settings.max_combinational_depth),
            clocks: ClockTree::new(settings.negedge_enabled, settings.summation),
            settings,
            clock_configs: Vec::new(),
        }
    }

    /// Returns the kernel settings.
    pub fn settings(&self) -> &SimulationConfig {
        &self.settings
    }

    /// Adopts the settings of `config` and queues its clock entries.
    ///
    /// Clock entries are resolved by path during [`build`](Self::build),
    /// so they may name clocks declared after this call.
    pub fn apply_config(&mut self, config: &Config) -> Result<()> {
        config.validate()?;
        self.settings = config.simulation.clone();
        self.clock_configs.extend(config.clocks.iter().cloned());
        Ok(())
    }

    /// Declares a module slot.
    pub fn module(&mut self, parent: Option<ModuleId>, name: &str) -> Result<ModuleId> {
        self.netlist.add_module(parent, name)
    }

    /// Installs the unit that runs in a declared module slot.
    pub fn install(&mut self, id: ModuleId, unit: impl Module + 'static) -> Result<()> {
        self.netlist.install(id, Box::new(unit))
    }

    /// Declares a module, lets `make` declare its ports and state, then installs it.
    ///
    /// # Arguments
    ///
    /// * `parent` - Enclosing module, or `None` for a top-level module.
    /// * `name` - Local name of the module.
    /// * `make` - Builds the unit from the new module's handle.
    pub fn add<M, F>(&mut self, parent: Option<ModuleId>, name: &str, make: F) -> Result<ModuleId>
    where
        M: Module + 'static,
        F: FnOnce(&mut Self, ModuleId) -> Result<M>,
    {
        let id = self.module(parent, name)?;
        let unit = make(self, id)?;
        self.install(id, unit)?;
        Ok(id)
    }

    /// Declares an unbound port on `owner`.
    pub fn port<T: Signal>(&mut self, owner: ModuleId, name: &str) -> Result<Port<T>> {
        self.netlist.add_port(owner, name)
    }

    /// Declares a wire on `owner`.
    pub fn wire<T: Signal>(&mut self, owner: ModuleId, name: &str, init: T) -> Result<Wire<T>> {
        self.netlist.add_wire(owner, name, init)
    }

    /// Declares a register on `owner`.
    pub fn register<T: Signal>(&mut self, owner: ModuleId, name: &str, init: T) -> Result<Reg<T>> {
        self.netlist.add_register(owner, name, init)
    }

    /// Declares an Independent clock at 1 Hz.
    pub fn clock(&mut self, owner: Option<ModuleId>, name: &str) -> Result<ClockId> {
        let id = ClockId(self.clocks.len());
        let path = self.netlist.claim_clock(owner, name, id)?;
        Ok(self.clocks.add(path, owner))
    }

    /// Sets a clock's frequency, phase and division factor.
    pub fn configure_clock(&mut self, id: ClockId, spec: ClockSpec) -> Result<()> {
        self.clocks.configure(id, spec)
    }

    /// Derives `derived` from `master`.
    pub fn derive_clock(&mut self, master: ClockId, derived: ClockId) -> Result<()> {
        self.clocks.link(master, derived)
    }

    /// Commits `reg`, owned by `module`, on the given edge of `clock`.
    pub fn register_on_edge<T: Signal>(
        &mut self,
        module: ModuleId,
        clock: ClockId,
        reg: Reg<T>,
        edge: EdgeType,
    ) -> Result<()> {
        self.netlist
            .register_on_edge(&mut self.clocks, module, clock, reg.index, edge)
    }

    /// Binds `port` directly to a wire or register output.
    pub fn bind_data<T: Signal>(&mut self, port: Port<T>, source: impl Into<Source<T>>) -> Result<()> {
        self.netlist.bind_data(port, source.into())
    }

    /// Makes `port` forward to `target`.
    pub fn bind_port<T: Signal>(&mut self, port: Port<T>, target: Port<T>) -> Result<()> {
        self.netlist.bind_port(port, target)
    }

    /// Binds `port` to an output `module` computes on demand.
    pub fn bind_module<T: Signal>(
        &mut self,
        port: Port<T>,
        module: ModuleId,
        output: impl Into<Source<T>>,
    ) -> Result<()> {
        self.netlist.bind_module(port, module, output.into())
    }

    /// Binds `port` to a constant.
    pub fn bind_constant<T: Signal>(&mut self, port: Port<T>, value: T) -> Result<()> {
        self.netlist.bind_constant(port, value)
    }

    /// Finds a declared clock by full path.
    pub fn clock_by_path(&self, path: &str) -> Result<ClockId> {
        match self.netlist.entity(path) {
            Some(Entity::Clock(id)) => Ok(id),
            _ => Err(SimError::UnknownPath {
                path: path.to_string(),
                kind: "clock",
            }),
        }
    }

    /// Finds a declared module by full path.
    pub fn module_by_path(&self, path: &str) -> Result<ModuleId> {
        match self.netlist.entity(path) {
            Some(Entity::Module(id)) => Ok(id),
            _ => Err(SimError::UnknownPath {
                path: path.to_string(),
                kind: "module",
            }),
        }
    }

    fn apply_clock_configs(&mut self) -> Result<()> {
        for entry in std::mem::take(&mut self.clock_configs) {
            let id = self.clock_by_path(&entry.path)?;
            self.clocks.configure(id, entry.spec())?;
            if let Some(master) = &entry.master {
                let master = self.clock_by_path(master)?;
                self.clocks.link(master, id)?;
            }
        }
        Ok(())
    }

    /// Runs the setup sequence and returns a simulation ready to step.
    pub fn build(mut self) -> Result<Simulation> {
        self.settings.validate()?;
        self.netlist
            .set_max_depth(self.settings.max_combinational_depth);
        self.clocks.set_negedge_enabled(self.settings.negedge_enabled);
        self.clocks.set_summation(self.settings.summation);

        let modules: Vec<ModuleId> = self.netlist.module_ids().collect();
        for &id in &modules {
            let mut unit = self.netlist.take_unit(id)?;
            let result = unit.connect(&mut ConnectContext::new(
                &mut self.netlist,
                &mut self.clocks,
                id,
            ));
            self.netlist.restore_unit(id, unit)?;
            result?;
        }
        debug!(modules = modules.len(), "connected modules");

        self.apply_clock_configs()?;
        debug!(clocks = self.clocks.len(), "configured clocks");

        let unbound = self.netlist.optimize()?;
        if !unbound.is_empty() {
            return Err(SimError::UnconnectedPorts { paths: unbound });
        }
        debug!(ports = self.netlist.port_count(), "optimized ports");

        for &id in &modules {
            let mut unit = self.netlist.take_unit(id)?;
            let result = unit.init(&mut InitContext::new(&mut self.netlist, &self.clocks, id));
            self.netlist.restore_unit(id, unit)?;
            result?;
        }
        self.netlist.end_macro_step();

        self.clocks.init()?;
        for (_, clock) in self.clocks.iter() {
            let idle = clock.registrations(EdgeType::Positive).is_empty()
                && clock.registrations(EdgeType::Negative).is_empty()
                && clock.derived().is_empty();
            if idle {
                warn!(clock = clock.path(), "clock drives no registers and no derived clocks");
            }
        }

        let scheduler = Scheduler::new(&self.clocks, self.settings.coincidence_tolerance)?;
        info!(
            modules = modules.len(),
            ports = self.netlist.port_count(),
            clocks = self.clocks.len(),
            negedge = self.settings.negedge_enabled,
            "simulation built"
        );
        Ok(Simulation::new(
            self.netlist,
            self.clocks,
            scheduler,
            self.settings,
        ))
    }
}
