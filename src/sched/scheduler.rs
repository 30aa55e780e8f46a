//! Macro-Step Scheduler.
//!
//! The scheduler keeps every clock sorted by its next edge time. Each
//! macro-step it:
//! 1. Collects the clocks sharing the earliest edge time into an [`EdgeSet`].
//! 2. Settles the modules registered on the edges about to fire
//!    (negative edges before positive edges).
//! 3. Commits the registers registered on those edges.
//! 4. Fires each clock and resynchronizes the clocks derived from it.
//! 5. Re-sorts the clock list.

use tracing::trace;

use super::edge_set::EdgeSet;
use crate::clock::{ClockTree, ClockType, EdgeType};
use crate::common::{ClockId, Result, SimError};
use crate::sim::netlist::Netlist;
use crate::stats::SimStats;

/// Edge-set selection and macro-step execution.
#[derive(Clone, Debug)]
pub struct Scheduler {
    order: Vec<ClockId>,
    tolerance: f64,
}

impl Scheduler {
    /// Creates a scheduler over every clock in `tree`.
    ///
    /// # Arguments
    ///
    /// * `tree` - Initialized clock tree.
    /// * `tolerance` - Relative distance under which two unequal edge times
    ///   are rejected as an ambiguous coincidence.
    pub fn new(tree: &ClockTree, tolerance: f64) -> Result<Self> {
        if tree.is_empty() {
            return Err(SimError::NoClocks);
        }
        let mut scheduler = Self {
            order: tree.iter().map(|(id, _)| id).collect(),
            tolerance,
        };
        scheduler.resort(tree)?;
        Ok(scheduler)
    }

    /// Clocks in ascending next-edge-time order.
    pub fn order(&self) -> &[ClockId] {
        &self.order
    }

    /// Stable sort by next edge time. Ties keep their previous relative order.
    pub fn resort(&mut self, tree: &ClockTree) -> Result<()> {
        let mut keyed = Vec::with_capacity(self.order.len());
        for &id in &self.order {
            keyed.push((tree.get(id)?.next_edge_time(), id));
        }
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.order = keyed.into_iter().map(|(_, id)| id).collect();
        Ok(())
    }

    /// Collects the clocks firing at the earliest pending edge time.
    ///
    /// Order within the set: Dependent clocks, then Hybrid clocks, then
    /// Independent clocks, each group in sorted-list order.
    ///
    /// Only bit-identical times share a set. A clock of the same derivation
    /// tree that trails by less than the tolerance simply fires in the next
    /// set; its master's resynchronization realigns it.
    ///
    /// # Errors
    ///
    /// [`SimError::AmbiguousEdgeTime`] if a clock from a different derivation
    /// tree than every clock in the set has an edge that is not equal to the
    /// earliest one but lies within the coincidence tolerance.
    pub fn select_next_edge_set(&self, tree: &ClockTree) -> Result<EdgeSet> {
        let first = *self.order.first().ok_or(SimError::NoClocks)?;
        let time = tree.get(first)?.next_edge_time();
        let window = self.tolerance * time.abs();

        let mut roots = Vec::new();
        let mut dependents = Vec::new();
        let mut hybrids = Vec::new();
        let mut independents = Vec::new();
        for &id in &self.order {
            let clock = tree.get(id)?;
            let t = clock.next_edge_time();
            let root = tree.root(id)?;
            if t != time {
                if t - time > window {
                    break;
                }
                if !roots.contains(&root) {
                    return Err(SimError::AmbiguousEdgeTime {
                        first: tree.get(first)?.path().to_string(),
                        first_time: time,
                        second: clock.path().to_string(),
                        second_time: t,
                    });
                }
                continue;
            }
            if !roots.contains(&root) {
                roots.push(root);
            }
            match clock.clock_type() {
                ClockType::Dependent => dependents.push(id),
                ClockType::Hybrid => hybrids.push(id),
                ClockType::Independent => independents.push(id),
            }
        }

        dependents.extend(hybrids);
        dependents.extend(independents);
        Ok(EdgeSet {
            time,
            clocks: dependents,
        })
    }

    /// Executes one macro-step for `edge_set`.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleEdgeSet`] if a clock in the set no longer fires at
    /// the set's time, plus any error raised while settling.
    pub fn run(
        &mut self,
        edge_set: &EdgeSet,
        tree: &mut ClockTree,
        netlist: &mut Netlist,
        stats: &mut SimStats,
    ) -> Result<()> {
        let mut firings: Vec<(ClockId, EdgeType)> = Vec::with_capacity(edge_set.len());
        for &id in &edge_set.clocks {
            let clock = tree.get(id)?;
            if clock.next_edge_time() != edge_set.time {
                return Err(SimError::StaleEdgeSet {
                    time: edge_set.time,
                    clock: clock.path().to_string(),
                });
            }
            firings.push((id, clock.next_edge_type()));
        }
        let settles_before = netlist.settle_count();

        for pass in [EdgeType::Negative, EdgeType::Positive] {
            for &(id, edge) in firings.iter().filter(|(_, e)| *e == pass) {
                let modules: Vec<_> = tree.get(id)?.registrations(edge).keys().copied().collect();
                for module in modules {
                    netlist.settle(module, tree)?;
                }
            }
        }

        let mut commits = 0;
        for &(id, edge) in &firings {
            for (&module, registers) in tree.get(id)?.registrations(edge) {
                for &register in registers {
                    netlist.commit_register(register)?;
                    commits += 1;
                }
                netlist.clear_done(module)?;
            }
        }

        let mut resyncs = 0;
        for &id in &edge_set.clocks {
            resyncs += tree.advance(id)?;
        }
        netlist.end_macro_step();
        self.resort(tree)?;

        trace!(
            time = edge_set.time,
            clocks = edge_set.len(),
            commits,
            resyncs,
            "macro-step"
        );

        stats.macro_steps += 1;
        stats.edges_fired += edge_set.len() as u64;
        stats.settles += netlist.settle_count() - settles_before;
        stats.commits += commits;
        stats.resyncs += resyncs;
        stats.max_edge_set = stats.max_edge_set.max(edge_set.len());
        stats.sim_time = edge_set.time;
        Ok(())
    }
}
