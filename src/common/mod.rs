//! Common types shared by every layer of the kernel.
//!
//! This module provides the arena handles, the error type, the compensated
//! time accumulator and kernel-wide constants.

/// Kernel-wide constants and defaults.
pub mod constants;

/// Error type and result alias.
pub mod error;

/// Arena handles and the `Signal` value bound.
pub mod handle;

/// Compensated simulated-time accumulation.
pub mod time;

pub use error::{Result, SimError};
pub use handle::{ClockId, ModuleId, Port, Reg, Signal, Source, Wire};
pub use time::{Summation, TimeAccumulator};
