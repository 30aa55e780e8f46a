//! Simulation Harness.
//!
//! This module contains the simulation root and the machinery around it:
//! 1. **Netlist:** Arenas of modules, ports, wires and registers.
//! 2. **Builder:** Setup sequence from declarations to a runnable simulation.
//! 3. **Simulation:** The run loop and inspection surface.
//! 4. **Probe:** An edge-counting module used by the runner.

/// Setup sequence and declaration surface.
pub mod builder;

/// Module, port, wire and register arenas.
pub mod netlist;

/// Edge-counting probe module.
pub mod probe;

/// Simulation root and run loop.
pub mod simulation;

pub use builder::SimulationBuilder;
pub use netlist::{EntityKind, HierarchyEntry, Netlist};
pub use probe::EdgeCounter;
pub use simulation::Simulation;
