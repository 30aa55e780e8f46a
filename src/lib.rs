//! Multi-Rate Discrete-Event Simulation Kernel.
//!
//! This crate advances a network of periodic and derived clock domains and,
//! for every set of simultaneous clock edges, evaluates a graph of stateful
//! and stateless processing units in dependency order.
//!
//! # Architecture
//!
//! * **Clocks**: Independent clocks time themselves; derived clocks run at a
//!   rational multiple of a master and are resynchronized on exact integer
//!   edge-count alignment.
//! * **Scheduler**: Picks the clocks sharing the earliest edge time and runs
//!   one macro-step over them.
//! * **Modules**: Two-phase execution. The settle phase stages register
//!   inputs and pulls combinational outputs on demand; the commit phase makes
//!   staged values visible.
//!
//! # Modules
//!
//! * `common`: Handles, errors, the time accumulator and constants.
//! * `clock`: Clock domains and the derivation linker.
//! * `config`: Configuration loading and parsing.
//! * `module`: The unit trait, registers and hook contexts.
//! * `sched`: Edge-set selection and macro-step execution.
//! * `sim`: Netlist arenas, builder, simulation root and probes.
//! * `stats`: Run statistics collection.

/// Handles, errors, compensated time and kernel-wide constants.
///
/// Provides the arena handles through which every other layer refers to
/// clocks, modules, ports, registers and wires.
pub mod common;

/// Clock domains, edge classification and the derivation linker.
///
/// Implements per-clock edge state and the rational-ratio resynchronization
/// of derived clocks.
pub mod clock;

/// Configuration system for kernel settings and clock parameters.
///
/// Loads and parses TOML configuration files.
pub mod config;

/// Processing unit trait, clocked registers and hook contexts.
pub mod module;

/// Edge-set selection and macro-step execution.
pub mod sched;

/// Netlist arenas, setup builder, simulation root and probe modules.
///
/// Handles the one-time setup sequence and the run loop.
pub mod sim;

/// Run statistics collection and reporting.
pub mod stats;
