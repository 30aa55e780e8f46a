//! Kernel-wide constants and defaults.

/// Separator between the segments of a hierarchical path.
pub const PATH_SEPARATOR: char = '.';

/// Degrees in a full clock period, used to turn a phase into a time offset.
pub const DEGREES_PER_PERIOD: f64 = 360.0;

/// Default limit on nested on-demand (combinational) evaluations.
pub const DEFAULT_MAX_COMBINATIONAL_DEPTH: usize = 256;

/// Default relative tolerance below which two unequal edge times are
/// considered an ambiguous coincidence.
pub const DEFAULT_COINCIDENCE_TOLERANCE: f64 = 1e-12;

/// Default number of macro-steps run by [`crate::sim::Simulation::run`].
pub const DEFAULT_MAX_MACRO_STEPS: u64 = 1000;
