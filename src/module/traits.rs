//! Processing Unit Trait.
//!
//! This module defines the interface every processing unit plugged into the
//! kernel implements. The kernel calls these hooks; a unit never calls the
//! kernel except through the context it is handed.

use super::context::{ConnectContext, InitContext, SettleContext};
use crate::common::Result;

/// Lifecycle hooks of a processing unit.
///
/// A unit keeps the handles of the ports, registers and wires declared for
/// it and reaches their values only through the context passed to each hook.
pub trait Module {
    /// Wires the unit into the graph.
    ///
    /// Called once during setup, in declaration order, before ports are
    /// optimized. This is where a unit binds its ports and registers its
    /// registers on clock edges.
    fn connect(&mut self, ctx: &mut ConnectContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Presets state after the graph has been validated.
    ///
    /// Called once, in declaration order, before the first macro-step.
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Settle phase.
    ///
    /// Reads ports and committed register outputs, stages register inputs
    /// and drives combinational outputs. Runs at most once per macro-step,
    /// either because one of the unit's registers is on a firing edge or
    /// because a consumer pulled one of its combinational outputs.
    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()>;
}
