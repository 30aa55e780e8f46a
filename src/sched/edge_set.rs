//! Simultaneous Edge Sets.

use crate::common::ClockId;

/// Clocks that share the earliest pending edge time, in execution order.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSet {
    /// Simulated time at which every clock in the set fires.
    pub time: f64,
    /// Firing clocks: Dependents, then Hybrids, then Independents.
    pub clocks: Vec<ClockId>,
}

impl EdgeSet {
    /// Number of clocks in the set.
    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Returns true if no clock fires.
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Returns true if `clock` fires in this set.
    pub fn contains(&self, clock: ClockId) -> bool {
        self.clocks.contains(&clock)
    }
}
