//! Hook Contexts.
//!
//! Each lifecycle hook receives a context bound to the module being called.
//! The context is the only path from a unit to the rest of the graph:
//!
//! * [`ConnectContext`] binds ports and registers registers on clock edges.
//! * [`InitContext`] presets registers and wires once the graph is valid.
//! * [`SettleContext`] reads inputs, stages registers and drives outputs.
//!
//! Registers and wires may only be written by the module that owns them;
//! any other write is reported as [`SimError::ForeignHandle`].
//!
//! [`SimError::ForeignHandle`]: crate::common::SimError::ForeignHandle

use crate::clock::{Clock, ClockTree, EdgeType};
use crate::common::{ClockId, ModuleId, Port, Reg, Result, Signal, Source, Wire};
use crate::sim::netlist::Netlist;

/// Context for [`Module::connect`](super::Module::connect).
pub struct ConnectContext<'a> {
    netlist: &'a mut Netlist,
    clocks: &'a mut ClockTree,
    module: ModuleId,
}

impl<'a> ConnectContext<'a> {
    pub(crate) fn new(netlist: &'a mut Netlist, clocks: &'a mut ClockTree, module: ModuleId) -> Self {
        Self {
            netlist,
            clocks,
            module,
        }
    }

    /// Returns the handle of the module being connected.
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// Returns the full path of the module being connected.
    pub fn path(&self) -> Result<&str> {
        self.netlist.module_path(self.module)
    }

    /// Commits `reg` on the given edge of `clock`.
    ///
    /// Marks the module as sequential. The register must belong to the
    /// module being connected.
    pub fn register_on_edge<T: Signal>(
        &mut self,
        clock: ClockId,
        reg: Reg<T>,
        edge: EdgeType,
    ) -> Result<()> {
        self.netlist
            .register_on_edge(self.clocks, self.module, clock, reg.index, edge)
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

    /// Derives `derived` from `master`.
    pub fn derive_clock(&mut self, master: ClockId, derived: ClockId) -> Result<()> {
        self.clocks.link(master, derived)
    }
}

/// Context for [`Module::init`](super::Module::init).
pub struct InitContext<'a> {
    netlist: &'a mut Netlist,
    clocks: &'a ClockTree,
    module: ModuleId,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(netlist: &'a mut Netlist, clocks: &'a ClockTree, module: ModuleId) -> Self {
        Self {
            netlist,
            clocks,
            module,
        }
    }

    /// Returns the handle of the module being initialized.
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// Reads a port.
    pub fn read<T: Signal>(&mut self, port: Port<T>) -> Result<T> {
        self.netlist.get(port, self.clocks)
    }

    /// Sets both sides of an owned register.
    pub fn preset<T: Signal>(&mut self, reg: Reg<T>, value: T) -> Result<()> {
        self.netlist.preset(self.module, reg, value)
    }

    /// Resets both sides of an owned register to the type default.
    pub fn reset<T: Signal>(&mut self, reg: Reg<T>) -> Result<()> {
        self.netlist.preset(self.module, reg, T::default())
    }

    /// Committed output of an owned register.
    pub fn output<T: Signal>(&self, reg: Reg<T>) -> Result<T> {
        self.netlist.output(self.module, reg)
    }

    /// Writes an owned wire.
    pub fn drive<T: Signal>(&mut self, wire: Wire<T>, value: T) -> Result<()> {
        self.netlist.drive(self.module, wire, value)
    }
}

/// Context for [`Module::run_clock_master`](super::Module::run_clock_master).
pub struct SettleContext<'a> {
    netlist: &'a mut Netlist,
    clocks: &'a ClockTree,
    module: ModuleId,
}

impl<'a> SettleContext<'a> {
    pub(crate) fn new(netlist: &'a mut Netlist, clocks: &'a ClockTree, module: ModuleId) -> Self {
        Self {
            netlist,
            clocks,
            module,
        }
    }

    /// Returns the handle of the settling module.
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// Returns the full path of the settling module.
    pub fn path(&self) -> Result<&str> {
        self.netlist.module_path(self.module)
    }

    /// Reads a port.
    ///
    /// A port bound to a combinational output settles the producing module
    /// first, unless it already settled in this macro-step.
    pub fn read<T: Signal>(&mut self, port: Port<T>) -> Result<T> {
        self.netlist.get(port, self.clocks)
    }

    /// Committed output of an owned register.
    pub fn output<T: Signal>(&self, reg: Reg<T>) -> Result<T> {
        self.netlist.output(self.module, reg)
    }

    /// Staged input of an owned register.
    pub fn staged<T: Signal>(&self, reg: Reg<T>) -> Result<T> {
        self.netlist.staged(self.module, reg)
    }

    /// Stages a new input for an owned register.
    pub fn stage<T: Signal>(&mut self, reg: Reg<T>, value: T) -> Result<()> {
        self.netlist.stage(self.module, reg, value)
    }

    /// Modifies the staged input of an owned register in place.
    pub fn stage_with<T: Signal>(&mut self, reg: Reg<T>, f: impl FnOnce(&mut T)) -> Result<()> {
        self.netlist.stage_with(self.module, reg, f)
    }

    /// Writes an owned wire.
    pub fn drive<T: Signal>(&mut self, wire: Wire<T>, value: T) -> Result<()> {
        self.netlist.drive(self.module, wire, value)
    }

    /// Current value of an owned wire.
    pub fn wire<T: Signal>(&self, wire: Wire<T>) -> Result<T> {
        self.netlist.wire_value(self.module, wire)
    }

    /// Looks up a clock.
    pub fn clock(&self, id: ClockId) -> Result<&Clock> {
        self.clocks.get(id)
    }
}
