//! Clock Domains.
//!
//! This module contains the timing side of the kernel:
//! 1. **Edges:** Clock levels, edge directions and clock type classification.
//! 2. **Clocks:** A single timing domain with its counters and edge registrations.
//! 3. **Tree:** The clock arena, derivation links and resynchronization.

/// Clock levels, edge directions and clock types.
pub mod edge;

/// Single clock domain.
#[allow(clippy::module_inception)]
pub mod clock;

/// Clock arena and derivation linker.
pub mod tree;

pub use clock::{Clock, ClockSpec, EdgeRegistrations};
pub use edge::{ClockState, ClockType, EdgeType};
pub use tree::ClockTree;
