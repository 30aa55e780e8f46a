//! Edge Counting Probe.
//!
//! A minimal sequential module that counts the edges of one clock in a
//! register. The runner attaches one to every configured clock.

use super::builder::SimulationBuilder;
use crate::clock::EdgeType;
use crate::common::{ClockId, ModuleId, Reg, Result};
use crate::module::{ConnectContext, InitContext, Module, SettleContext};

/// Counts the edges of one clock.
pub struct EdgeCounter {
    clock: ClockId,
    edge: EdgeType,
    count: Reg<u64>,
}

impl EdgeCounter {
    /// Declares a counter module named `name` under `parent`.
    ///
    /// # Returns
    ///
    /// The module handle and the register holding the count.
    pub fn attach(
        builder: &mut SimulationBuilder,
        parent: Option<ModuleId>,
        name: &str,
        clock: ClockId,
        edge: EdgeType,
    ) -> Result<(ModuleId, Reg<u64>)> {
        let id = builder.module(parent, name)?;
        let count = builder.register(id, "count", 0u64)?;
        builder.install(id, EdgeCounter { clock, edge, count })?;
        Ok((id, count))
    }
}

impl Module for EdgeCounter {
    fn connect(&mut self, ctx: &mut ConnectContext<'_>) -> Result<()> {
        ctx.register_on_edge(self.clock, self.count, self.edge)
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<()> {
        ctx.reset(self.count)
    }

    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        let n = ctx.output(self.count)?;
        ctx.stage(self.count, n + 1)
    }
}
