//! Netlist Arenas.
//!
//! The netlist owns every module slot, port, wire and register of a
//! simulation and resolves port reads. Ports hold a [`Binding`] to one of
//! three sources:
//!
//! * **Direct:** a wire or the committed output of a register.
//! * **Forward:** another port, followed until a terminal binding is found.
//! * **Combinational:** an output driven by a module, which is settled on
//!   demand before the output is read.
//!
//! Settling is memoized per module through its `done` flag, so a producer
//! with many consumers runs at most once per macro-step. A module whose
//! settle phase is re-entered before it returns is part of a combinational
//! cycle, which is reported instead of recursing forever.

use std::any::{type_name, Any};
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{trace, warn};

use crate::clock::{ClockTree, EdgeType};
use crate::common::constants::PATH_SEPARATOR;
use crate::common::handle::Slot;
use crate::common::{ClockId, ModuleId, Port, Reg, Result, SimError, Signal, Source, Wire};
use crate::module::register::{ErasedRegister, Register};
use crate::module::{LogicType, Module, SettleContext};

/// Active binding of a port. Exactly one variant holds at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Binding {
    Unbound,
    Direct(Slot),
    Forward(usize),
    Combinational { module: ModuleId, slot: Slot },
}

/// Terminal binding reached by following forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    Unbound,
    Direct(Slot),
    Combinational { module: ModuleId, slot: Slot },
}

impl From<Target> for Binding {
    fn from(target: Target) -> Self {
        match target {
            Target::Unbound => Binding::Unbound,
            Target::Direct(slot) => Binding::Direct(slot),
            Target::Combinational { module, slot } => Binding::Combinational { module, slot },
        }
    }
}

/// What a full path names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Entity {
    Module(ModuleId),
    Clock(ClockId),
    Port(usize),
    Register(usize),
    Wire(usize),
}

/// Kind column of the hierarchy export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A module slot.
    Module,
    /// A clock.
    Clock,
    /// A port.
    Port,
    /// A register.
    Register,
    /// A wire.
    Wire,
}

/// One declared entity in the hierarchy export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HierarchyEntry {
    /// Full path.
    pub path: String,
    /// What the path names.
    pub kind: EntityKind,
    /// Value type for ports, registers and wires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<&'static str>,
}

struct ModuleSlot {
    path: String,
    parent: Option<ModuleId>,
    children: Vec<ModuleId>,
    unit: Option<Box<dyn Module>>,
    logic_type: LogicType,
    running: bool,
    done: bool,
}

struct PortSlot {
    path: String,
    owner: ModuleId,
    binding: Binding,
    value_type: &'static str,
}

struct WireSlot {
    path: String,
    owner: ModuleId,
    cell: Box<dyn Any>,
    value_type: &'static str,
}

struct RegisterSlot {
    path: String,
    owner: ModuleId,
    cell: Box<dyn ErasedRegister>,
    value_type: &'static str,
}

/// Arena of modules, ports, wires and registers.
pub struct Netlist {
    modules: Vec<ModuleSlot>,
    ports: Vec<PortSlot>,
    wires: Vec<WireSlot>,
    registers: Vec<RegisterSlot>,
    paths: BTreeMap<String, Entity>,
    max_depth: usize,
    depth: usize,
    settles: u64,
}

impl Netlist {
    /// Creates an empty netlist.
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Limit on nested on-demand settles before a cycle is assumed.
    pub fn new(max_depth: usize) -> Self {
        Self {
            modules: Vec::new(),
            ports: Vec::new(),
            wires: Vec::new(),
            registers: Vec::new(),
            paths: BTreeMap::new(),
            max_depth,
            depth: 0,
            settles: 0,
        }
    }

    pub(crate) fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Total number of settle phases executed.
    pub fn settle_count(&self) -> u64 {
        self.settles
    }

    /// Number of declared modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of declared ports.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub(crate) fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        (0..self.modules.len()).map(ModuleId)
    }

    pub(crate) fn entity(&self, path: &str) -> Option<Entity> {
        self.paths.get(path).copied()
    }

    // ---- declaration ----

    fn qualify(&self, parent: Option<ModuleId>, name: &str) -> Result<String> {
        if name.is_empty() || name.contains(PATH_SEPARATOR) {
            return Err(SimError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(match parent {
            Some(p) => format!("{}{}{}", self.module(p)?.path, PATH_SEPARATOR, name),
            None => name.to_string(),
        })
    }

    fn claim(&mut self, path: &str, entity: Entity) -> Result<()> {
        if self.paths.contains_key(path) {
            return Err(SimError::DuplicateName {
                path: path.to_string(),
            });
        }
        self.paths.insert(path.to_string(), entity);
        Ok(())
    }

    /// Declares a module slot under `parent`.
    pub fn add_module(&mut self, parent: Option<ModuleId>, name: &str) -> Result<ModuleId> {
        let path = self.qualify(parent, name)?;
        let id = ModuleId(self.modules.len());
        self.claim(&path, Entity::Module(id))?;
        if let Some(p) = parent {
            self.module_mut(p)?.children.push(id);
        }
        trace!(module = %path, "declared module");
        self.modules.push(ModuleSlot {
            path,
            parent,
            children: Vec::new(),
            unit: None,
            logic_type: LogicType::Combinational,
            running: false,
            done: false,
        });
        Ok(id)
    }

    /// Places the processing unit into a declared module slot.
    pub fn install(&mut self, id: ModuleId, unit: Box<dyn Module>) -> Result<()> {
        self.module_mut(id)?.unit = Some(unit);
        Ok(())
    }

    /// Reserves the path of a clock declared under `owner`.
    pub(crate) fn claim_clock(
        &mut self,
        owner: Option<ModuleId>,
        name: &str,
        id: ClockId,
    ) -> Result<String> {
        let path = self.qualify(owner, name)?;
        self.claim(&path, Entity::Clock(id))?;
        Ok(path)
    }

    /// Declares an unbound port owned by `owner`.
    pub fn add_port<T: Signal>(&mut self, owner: ModuleId, name: &str) -> Result<Port<T>> {
        let path = self.qualify(Some(owner), name)?;
        let index = self.ports.len();
        self.claim(&path, Entity::Port(index))?;
        self.ports.push(PortSlot {
            path,
            owner,
            binding: Binding::Unbound,
            value_type: type_name::<T>(),
        });
        Ok(Port::new(index))
    }

    /// Declares a wire owned by `owner`, holding `init`.
    pub fn add_wire<T: Signal>(&mut self, owner: ModuleId, name: &str, init: T) -> Result<Wire<T>> {
        let path = self.qualify(Some(owner), name)?;
        let index = self.wires.len();
        self.claim(&path, Entity::Wire(index))?;
        self.wires.push(WireSlot {
            path,
            owner,
            cell: Box::new(init),
            value_type: type_name::<T>(),
        });
        Ok(Wire::new(index))
    }

    /// Declares a register owned by `owner`, with both sides holding `init`.
    pub fn add_register<T: Signal>(
        &mut self,
        owner: ModuleId,
        name: &str,
        init: T,
    ) -> Result<Reg<T>> {
        let path = self.qualify(Some(owner), name)?;
        let index = self.registers.len();
        self.claim(&path, Entity::Register(index))?;
        self.registers.push(RegisterSlot {
            path,
            owner,
            cell: Box::new(Register::new(init)),
            value_type: type_name::<T>(),
        });
        Ok(Reg::new(index))
    }

    // ---- slot lookup ----

    fn module(&self, id: ModuleId) -> Result<&ModuleSlot> {
        self.modules.get(id.0).ok_or(SimError::InvalidHandle {
            kind: "module",
            index: id.0,
        })
    }

    fn module_mut(&mut self, id: ModuleId) -> Result<&mut ModuleSlot> {
        self.modules.get_mut(id.0).ok_or(SimError::InvalidHandle {
            kind: "module",
            index: id.0,
        })
    }

    fn port(&self, index: usize) -> Result<&PortSlot> {
        self.ports
            .get(index)
            .ok_or(SimError::InvalidHandle { kind: "port", index })
    }

    fn port_mut(&mut self, index: usize) -> Result<&mut PortSlot> {
        self.ports
            .get_mut(index)
            .ok_or(SimError::InvalidHandle { kind: "port", index })
    }

    fn check_slot(&self, slot: Slot) -> Result<()> {
        match slot {
            Slot::Wire(index) if index >= self.wires.len() => {
                Err(SimError::InvalidHandle { kind: "wire", index })
            }
            Slot::Register(index) if index >= self.registers.len() => {
                Err(SimError::InvalidHandle {
                    kind: "register",
                    index,
                })
            }
            _ => Ok(()),
        }
    }

    /// Returns the full path of a module.
    pub fn module_path(&self, id: ModuleId) -> Result<&str> {
        Ok(&self.module(id)?.path)
    }

    /// Returns the parent of a module.
    pub fn parent(&self, id: ModuleId) -> Result<Option<ModuleId>> {
        Ok(self.module(id)?.parent)
    }

    /// Returns the sub-modules of a module, in declaration order.
    pub fn children(&self, id: ModuleId) -> Result<&[ModuleId]> {
        Ok(&self.module(id)?.children)
    }

    /// Returns whether a module has any register on a clock edge.
    pub fn logic_type(&self, id: ModuleId) -> Result<LogicType> {
        Ok(self.module(id)?.logic_type)
    }

    /// Returns the full path of a port.
    pub fn port_path(&self, index: usize) -> Result<&str> {
        Ok(&self.port(index)?.path)
    }

    pub(crate) fn take_unit(&mut self, id: ModuleId) -> Result<Box<dyn Module>> {
        let slot = self.module_mut(id)?;
        slot.unit.take().ok_or_else(|| SimError::ModuleNotInstalled {
            path: slot.path.clone(),
        })
    }

    pub(crate) fn restore_unit(&mut self, id: ModuleId, unit: Box<dyn Module>) -> Result<()> {
        self.module_mut(id)?.unit = Some(unit);
        Ok(())
    }

    // ---- binding ----

    fn bind(&mut self, port: usize, binding: Binding) -> Result<()> {
        let slot = self.port_mut(port)?;
        if slot.binding != Binding::Unbound && slot.binding != binding {
            warn!(port = %slot.path, "port rebound, previous binding discarded");
        }
        slot.binding = binding;
        Ok(())
    }

    /// Binds a port directly to a wire or register output.
    pub fn bind_data<T: Signal>(&mut self, port: Port<T>, source: Source<T>) -> Result<()> {
        self.check_slot(source.slot)?;
        self.bind(port.index, Binding::Direct(source.slot))
    }

    /// Makes `port` forward to `target`.
    pub fn bind_port<T: Signal>(&mut self, port: Port<T>, target: Port<T>) -> Result<()> {
        let target_path = self.port(target.index)?.path.clone();
        if port.index == target.index {
            return Err(SimError::ForwardingLoop { path: target_path });
        }
        self.bind(port.index, Binding::Forward(target.index))
    }

    /// Binds a port to an output that `module` computes on demand.
    pub fn bind_module<T: Signal>(
        &mut self,
        port: Port<T>,
        module: ModuleId,
        output: Source<T>,
    ) -> Result<()> {
        self.module(module)?;
        self.check_slot(output.slot)?;
        self.bind(
            port.index,
            Binding::Combinational {
                module,
                slot: output.slot,
            },
        )
    }

    /// Binds a port to a freshly owned constant cell.
    pub fn bind_constant<T: Signal>(&mut self, port: Port<T>, value: T) -> Result<()> {
        let (owner, path) = {
            let slot = self.port(port.index)?;
            (slot.owner, format!("{}#const", slot.path))
        };
        let index = self.wires.len();
        self.wires.push(WireSlot {
            path,
            owner,
            cell: Box::new(value),
            value_type: type_name::<T>(),
        });
        self.bind(port.index, Binding::Direct(Slot::Wire(index)))
    }

    /// Returns true if the port has no binding at all.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.port(index)?.binding == Binding::Unbound)
    }

    /// Follows forwards from a port to its terminal binding.
    pub(crate) fn resolve(&self, index: usize) -> Result<Target> {
        let mut current = index;
        for _ in 0..=self.ports.len() {
            match self.port(current)?.binding {
                Binding::Unbound => return Ok(Target::Unbound),
                Binding::Direct(slot) => return Ok(Target::Direct(slot)),
                Binding::Combinational { module, slot } => {
                    return Ok(Target::Combinational { module, slot })
                }
                Binding::Forward(next) => current = next,
            }
        }
        Err(SimError::ForwardingLoop {
            path: self.port(index)?.path.clone(),
        })
    }

    /// Rewrites a port to point straight at its terminal binding.
    ///
    /// # Returns
    ///
    /// `true` if the port ended up unbound.
    pub fn optimize_port(&mut self, index: usize) -> Result<bool> {
        let binding = Binding::from(self.resolve(index)?);
        self.port_mut(index)?.binding = binding;
        Ok(binding == Binding::Unbound)
    }

    /// Optimizes every port.
    ///
    /// # Returns
    ///
    /// The full paths of the ports that are still unbound.
    pub fn optimize(&mut self) -> Result<Vec<String>> {
        let mut unbound = Vec::new();
        for index in 0..self.ports.len() {
            if self.optimize_port(index)? {
                unbound.push(self.port(index)?.path.clone());
            }
        }
        Ok(unbound)
    }

    // ---- typed cell access ----

    fn wire_ref<T: Signal>(&self, index: usize) -> Result<&T> {
        let slot = self
            .wires
            .get(index)
            .ok_or(SimError::InvalidHandle { kind: "wire", index })?;
        slot.cell
            .downcast_ref::<T>()
            .ok_or_else(|| SimError::TypeMismatch {
                path: slot.path.clone(),
                expected: type_name::<T>(),
            })
    }

    fn wire_mut<T: Signal>(&mut self, index: usize) -> Result<&mut T> {
        let slot = self
            .wires
            .get_mut(index)
            .ok_or(SimError::InvalidHandle { kind: "wire", index })?;
        if !slot.cell.is::<T>() {
            return Err(SimError::TypeMismatch {
                path: slot.path.clone(),
                expected: type_name::<T>(),
            });
        }
        slot.cell
            .downcast_mut::<T>()
            .ok_or(SimError::InvalidHandle { kind: "wire", index })
    }

    fn register_ref<T: Signal>(&self, index: usize) -> Result<&Register<T>> {
        let slot = self.registers.get(index).ok_or(SimError::InvalidHandle {
            kind: "register",
            index,
        })?;
        slot.cell
            .as_any()
            .downcast_ref::<Register<T>>()
            .ok_or_else(|| SimError::TypeMismatch {
                path: slot.path.clone(),
                expected: type_name::<T>(),
            })
    }

    fn register_mut<T: Signal>(&mut self, index: usize) -> Result<&mut Register<T>> {
        let slot = self.registers.get_mut(index).ok_or(SimError::InvalidHandle {
            kind: "register",
            index,
        })?;
        if !slot.cell.as_any().is::<Register<T>>() {
            return Err(SimError::TypeMismatch {
                path: slot.path.clone(),
                expected: type_name::<T>(),
            });
        }
        slot.cell
            .as_any_mut()
            .downcast_mut::<Register<T>>()
            .ok_or(SimError::InvalidHandle {
                kind: "register",
                index,
            })
    }

    fn check_owner(&self, module: ModuleId, owner: ModuleId, path: &str) -> Result<()> {
        if module == owner {
            return Ok(());
        }
        Err(SimError::ForeignHandle {
            module: self.module(module)?.path.clone(),
            path: path.to_string(),
        })
    }

    fn check_register_owner(&self, module: ModuleId, index: usize) -> Result<()> {
        let slot = self.registers.get(index).ok_or(SimError::InvalidHandle {
            kind: "register",
            index,
        })?;
        self.check_owner(module, slot.owner, &slot.path)
    }

    fn check_wire_owner(&self, module: ModuleId, index: usize) -> Result<()> {
        let slot = self
            .wires
            .get(index)
            .ok_or(SimError::InvalidHandle { kind: "wire", index })?;
        self.check_owner(module, slot.owner, &slot.path)
    }

    fn slot_value<T: Signal>(&self, slot: Slot) -> Result<T> {
        match slot {
            Slot::Wire(index) => self.wire_ref::<T>(index).cloned(),
            Slot::Register(index) => Ok(self.register_ref::<T>(index)?.o.clone()),
        }
    }

    /// Staged input of a register owned by `module`.
    pub(crate) fn staged<T: Signal>(&self, module: ModuleId, reg: Reg<T>) -> Result<T> {
        self.check_register_owner(module, reg.index)?;
        Ok(self.register_ref::<T>(reg.index)?.i.clone())
    }

    /// Committed output of a register owned by `module`.
    pub(crate) fn output<T: Signal>(&self, module: ModuleId, reg: Reg<T>) -> Result<T> {
        self.check_register_owner(module, reg.index)?;
        self.register_output(reg)
    }

    /// Committed output of any register.
    pub fn register_output<T: Signal>(&self, reg: Reg<T>) -> Result<T> {
        Ok(self.register_ref::<T>(reg.index)?.o.clone())
    }

    pub(crate) fn stage<T: Signal>(&mut self, module: ModuleId, reg: Reg<T>, value: T) -> Result<()> {
        self.check_register_owner(module, reg.index)?;
        self.register_mut::<T>(reg.index)?.i = value;
        Ok(())
    }

    pub(crate) fn stage_with<T: Signal>(
        &mut self,
        module: ModuleId,
        reg: Reg<T>,
        f: impl FnOnce(&mut T),
    ) -> Result<()> {
        self.check_register_owner(module, reg.index)?;
        f(&mut self.register_mut::<T>(reg.index)?.i);
        Ok(())
    }

    pub(crate) fn preset<T: Signal>(&mut self, module: ModuleId, reg: Reg<T>, value: T) -> Result<()> {
        self.check_register_owner(module, reg.index)?;
        self.register_mut::<T>(reg.index)?.set(value);
        Ok(())
    }

    pub(crate) fn drive<T: Signal>(&mut self, module: ModuleId, wire: Wire<T>, value: T) -> Result<()> {
        self.check_wire_owner(module, wire.index)?;
        self.write_wire(wire, value)
    }

    pub(crate) fn wire_value<T: Signal>(&self, module: ModuleId, wire: Wire<T>) -> Result<T> {
        self.check_wire_owner(module, wire.index)?;
        self.wire_ref::<T>(wire.index).cloned()
    }

    /// Overwrites a wire from outside any module.
    pub fn write_wire<T: Signal>(&mut self, wire: Wire<T>, value: T) -> Result<()> {
        *self.wire_mut::<T>(wire.index)? = value;
        Ok(())
    }

    // ---- execution ----

    /// Reads a port, settling its combinational producer first if needed.
    pub fn get<T: Signal>(&mut self, port: Port<T>, clocks: &ClockTree) -> Result<T> {
        match self.resolve(port.index)? {
            Target::Unbound => Ok(T::default()),
            Target::Direct(slot) => self.slot_value(slot),
            Target::Combinational { module, slot } => {
                self.settle(module, clocks)?;
                self.slot_value(slot)
            }
        }
    }

    /// Runs a module's settle phase unless it already ran this macro-step.
    pub(crate) fn settle(&mut self, id: ModuleId, clocks: &ClockTree) -> Result<()> {
        let (depth, limit) = (self.depth, self.max_depth);
        let slot = self.module_mut(id)?;
        if slot.done {
            return Ok(());
        }
        if slot.running {
            return Err(SimError::CombinationalCycle {
                path: slot.path.clone(),
            });
        }
        if depth >= limit {
            return Err(SimError::EvaluationDepthExceeded {
                path: slot.path.clone(),
                limit,
            });
        }
        let mut unit = slot.unit.take().ok_or_else(|| SimError::ModuleNotInstalled {
            path: slot.path.clone(),
        })?;
        slot.running = true;
        trace!(module = %slot.path, depth, "settle");

        self.depth += 1;
        let result = unit.run_clock_master(&mut SettleContext::new(self, clocks, id));
        self.depth -= 1;

        let slot = self.module_mut(id)?;
        slot.unit = Some(unit);
        slot.running = false;
        result?;
        slot.done = true;
        self.settles += 1;
        Ok(())
    }

    pub(crate) fn register_on_edge(
        &mut self,
        clocks: &mut ClockTree,
        module: ModuleId,
        clock: ClockId,
        register: usize,
        edge: EdgeType,
    ) -> Result<()> {
        self.check_register_owner(module, register)?;
        clocks.register_on_edge(clock, module, register, edge)?;
        self.module_mut(module)?.logic_type = LogicType::Sequential;
        Ok(())
    }

    pub(crate) fn commit_register(&mut self, index: usize) -> Result<()> {
        self.registers
            .get_mut(index)
            .ok_or(SimError::InvalidHandle {
                kind: "register",
                index,
            })?
            .cell
            .commit();
        Ok(())
    }

    pub(crate) fn clear_done(&mut self, id: ModuleId) -> Result<()> {
        self.module_mut(id)?.done = false;
        Ok(())
    }

    /// Clears every `done` flag so the next macro-step starts fresh.
    pub(crate) fn end_macro_step(&mut self) {
        for slot in &mut self.modules {
            slot.done = false;
        }
    }

    // ---- export ----

    /// Lists every named entity in path order.
    pub fn hierarchy(&self) -> Vec<HierarchyEntry> {
        self.paths
            .iter()
            .map(|(path, entity)| {
                let (kind, value_type) = match *entity {
                    Entity::Module(_) => (EntityKind::Module, None),
                    Entity::Clock(_) => (EntityKind::Clock, None),
                    Entity::Port(i) => (EntityKind::Port, self.ports.get(i).map(|p| p.value_type)),
                    Entity::Register(i) => (
                        EntityKind::Register,
                        self.registers.get(i).map(|r| r.value_type),
                    ),
                    Entity::Wire(i) => (EntityKind::Wire, self.wires.get(i).map(|w| w.value_type)),
                };
                HierarchyEntry {
                    path: path.clone(),
                    kind,
                    value_type,
                }
            })
            .collect()
    }
}
