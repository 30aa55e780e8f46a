//! Processing Units.
//!
//! This module contains the unit-facing side of the kernel:
//! 1. **Traits:** The lifecycle hooks a unit implements.
//! 2. **Registers:** Two-phase clocked state cells.
//! 3. **Contexts:** The views through which hooks read and write the graph.

use serde::Serialize;

/// Hook contexts handed to units.
pub mod context;

/// Two-phase clocked registers.
pub mod register;

/// Unit lifecycle trait.
pub mod traits;

pub use context::{ConnectContext, InitContext, SettleContext};
pub use register::Register;
pub use traits::Module;

/// Classification of a unit, derived from its edge registrations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum LogicType {
    /// No register on any clock edge; evaluated only on demand.
    #[default]
    Combinational,
    /// At least one register committed on a clock edge.
    Sequential,
}
