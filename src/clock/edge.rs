//! Clock State, Edge and Type Classifications.

use serde::Serialize;

/// Logic level of a clock between two edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ClockState {
    /// Low level. The next edge is positive.
    #[default]
    Low,
    /// High level. The next edge is negative.
    High,
}

impl ClockState {
    /// Returns the opposite level.
    pub fn toggled(self) -> Self {
        match self {
            ClockState::Low => ClockState::High,
            ClockState::High => ClockState::Low,
        }
    }

    /// Returns the edge that leaves this level.
    pub fn leaving_edge(self) -> EdgeType {
        match self {
            ClockState::Low => EdgeType::Positive,
            ClockState::High => EdgeType::Negative,
        }
    }
}

/// Direction of a clock transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EdgeType {
    /// LOW to HIGH.
    Positive,
    /// HIGH to LOW.
    Negative,
}

/// How a clock obtains its timing.
///
/// Transitions are monotone: a clock only ever moves away from
/// `Independent`, never back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ClockType {
    /// Times itself from its own frequency.
    #[default]
    Independent,
    /// Timing is copied down from a master clock.
    Dependent,
    /// Dependent on a master and itself a master of other clocks.
    Hybrid,
}
