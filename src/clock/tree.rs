//! Clock Tree and Derivation Linker.
//!
//! The tree is the arena that owns every clock of a simulation. It records
//! master/derived links, promotes clock types when links are made, and
//! resynchronizes derived clocks whenever their master completes an edge.
//!
//! A derived clock runs on its own between resynchronizations, stepping by
//! its own period. Every time the master fires, the tree checks the exact
//! integer alignment condition
//!
//! ```text
//! master.n_edges * derived.den == derived.n_edges * derived.num
//! ```
//!
//! and only when it holds copies the master's time accumulator down. Using
//! integers for the check is what keeps non-integer ratios such as 16/9 from
//! drifting apart over long runs.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::clock::{Clock, ClockSpec};
use super::edge::{ClockState, ClockType, EdgeType};
use crate::common::{ClockId, ModuleId, Result, SimError, Summation, TimeAccumulator};

/// Arena of clocks plus the derivation links between them.
#[derive(Debug)]
pub struct ClockTree {
    clocks: Vec<Clock>,
    negedge_enabled: bool,
    summation: Summation,
    resyncs: u64,
}

impl Default for ClockTree {
    fn default() -> Self {
        Self::new(true, Summation::default())
    }
}

impl ClockTree {
    /// Creates an empty tree.
    ///
    /// # Arguments
    ///
    /// * `negedge_enabled` - When false, clocks only produce positive edges
    ///   and step by a full period.
    /// * `summation` - Summation algorithm for every clock's time accumulator.
    pub fn new(negedge_enabled: bool, summation: Summation) -> Self {
        Self {
            clocks: Vec::new(),
            negedge_enabled,
            summation,
            resyncs: 0,
        }
    }

    /// Declares a new Independent clock at 1 Hz with zero phase.
    pub fn add(&mut self, path: impl Into<String>, owner: Option<ModuleId>) -> ClockId {
        let id = ClockId(self.clocks.len());
        self.clocks
            .push(Clock::new(path.into(), owner, self.summation));
        id
    }

    /// Returns the number of clocks.
    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Returns true if no clock was declared.
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Returns whether clocks produce negative edges.
    pub fn negedge_enabled(&self) -> bool {
        self.negedge_enabled
    }

    /// Returns the summation algorithm used for clock time.
    pub fn summation(&self) -> Summation {
        self.summation
    }

    /// Returns the total number of resynchronizations performed.
    pub fn resync_total(&self) -> u64 {
        self.resyncs
    }

    pub(crate) fn set_negedge_enabled(&mut self, enabled: bool) {
        self.negedge_enabled = enabled;
    }

    pub(crate) fn set_summation(&mut self, summation: Summation) {
        self.summation = summation;
    }

    /// Looks up a clock.
    pub fn get(&self, id: ClockId) -> Result<&Clock> {
        self.clocks.get(id.0).ok_or(SimError::InvalidHandle {
            kind: "clock",
            index: id.0,
        })
    }

    pub(crate) fn get_mut(&mut self, id: ClockId) -> Result<&mut Clock> {
        self.clocks.get_mut(id.0).ok_or(SimError::InvalidHandle {
            kind: "clock",
            index: id.0,
        })
    }

    /// Finds a clock by its full path.
    pub fn find(&self, path: &str) -> Option<ClockId> {
        self.clocks
            .iter()
            .position(|c| c.path() == path)
            .map(ClockId)
    }

    /// Iterates over all clocks in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ClockId, &Clock)> {
        self.clocks.iter().enumerate().map(|(i, c)| (ClockId(i), c))
    }

    /// Returns the root of the derivation tree containing `id`.
    ///
    /// A clock without a master is its own root.
    pub fn root(&self, id: ClockId) -> Result<ClockId> {
        let mut current = id;
        while let Some(master) = self.get(current)?.master {
            current = master;
        }
        Ok(current)
    }

    /// Applies user parameters to a clock.
    pub fn configure(&mut self, id: ClockId, spec: ClockSpec) -> Result<()> {
        self.get_mut(id)?.configure(spec)
    }

    /// Associates a module register with one edge of a clock.
    pub(crate) fn register_on_edge(
        &mut self,
        id: ClockId,
        module: ModuleId,
        register: usize,
        edge: EdgeType,
    ) -> Result<()> {
        self.get_mut(id)?.register_on_edge(module, register, edge);
        Ok(())
    }

    /// Registers `derived` as a clock derived from `master`.
    ///
    /// An Independent `derived` becomes Dependent; a `master` that is
    /// itself Dependent becomes Hybrid. A clock may have at most one master
    /// and the links may not form a cycle.
    pub fn link(&mut self, master: ClockId, derived: ClockId) -> Result<()> {
        let reject = |tree: &Self, reason: &'static str| -> Result<()> {
            Err(SimError::InvalidLink {
                master: tree.get(master)?.path().to_string(),
                derived: tree.get(derived)?.path().to_string(),
                reason,
            })
        };

        if master == derived {
            return reject(self, "a clock cannot derive from itself");
        }
        if self.get(derived)?.master.is_some() {
            return reject(self, "clock already has a master");
        }
        let mut cursor = Some(master);
        while let Some(id) = cursor {
            if id == derived {
                return reject(self, "derivation would form a cycle");
            }
            cursor = self.get(id)?.master;
        }

        let d = self.get_mut(derived)?;
        d.master = Some(master);
        if d.clock_type == ClockType::Independent {
            d.clock_type = ClockType::Dependent;
        }

        let m = self.get_mut(master)?;
        m.derived.push(derived);
        if m.clock_type == ClockType::Dependent {
            m.clock_type = ClockType::Hybrid;
        }

        debug!(
            master = self.get(master)?.path(),
            derived = self.get(derived)?.path(),
            "linked derived clock"
        );
        Ok(())
    }

    /// Resets every clock and computes its timing before the first macro-step.
    ///
    /// Roots take their periods from their own frequency and division
    /// factor and schedule their first edge at their phase offset. Derived
    /// clocks are then synchronized down the tree, which always succeeds at
    /// zero edges.
    pub fn init(&mut self) -> Result<()> {
        let summation = self.summation;
        for clock in &mut self.clocks {
            clock.state = ClockState::Low;
            clock.next_edge_type = EdgeType::Positive;
            clock.time = TimeAccumulator::new(summation);
            clock.last_edge_time = 0.0;
            clock.next_edge_time = 0.0;
            clock.n_ticks = 0;
            clock.n_edges = 0;
            clock.n_resyncs = 0;
        }
        self.resyncs = 0;

        let roots: Vec<ClockId> = self
            .iter()
            .filter(|(_, c)| c.master.is_none())
            .map(|(id, _)| id)
            .collect();

        // Periods first, breadth-first from the roots, so every master is
        // settled before the clocks derived from it.
        let mut queue: VecDeque<ClockId> = roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let master_period = match self.get(id)?.master {
                Some(m) => Some(self.get(m)?.full_period),
                None => None,
            };
            let clock = self.get_mut(id)?;
            match master_period {
                Some(full) => {
                    let scaled = full * clock.ratio();
                    clock.set_full_period(scaled);
                }
                None => clock.derive_own_period(),
            }
            queue.extend(clock.derived.iter().copied());
        }

        for &root in &roots {
            let clock = self.get_mut(root)?;
            let offset = clock.phase_offset();
            clock.next_edge_time = clock.time.advance(offset);
            self.sync_derived(root)?;
        }

        debug!(clocks = self.clocks.len(), "clock tree initialized");
        Ok(())
    }

    /// Fires the pending edge of a clock and resynchronizes its derived clocks.
    ///
    /// # Returns
    ///
    /// The number of derived clocks that were resynchronized, counted
    /// through the whole subtree.
    pub fn advance(&mut self, id: ClockId) -> Result<u64> {
        let negedge = self.negedge_enabled;
        self.get_mut(id)?.fire(negedge);
        self.sync_derived(id)
    }

    fn sync_derived(&mut self, master: ClockId) -> Result<u64> {
        let derived = self.get(master)?.derived.clone();
        let mut count = 0;
        for id in derived {
            count += self.synchronize(master, id)?;
        }
        Ok(count)
    }

    /// Resynchronizes `derived` to `master` if their edge counts align.
    ///
    /// When `master.n_edges * den == derived.n_edges * num` the master's
    /// time accumulator is copied into the derived clock, the derived periods
    /// are rescaled from the master's, the next edge is placed at the derived
    /// clock's phase offset and the clocks derived from `derived` are visited
    /// in turn. Otherwise nothing changes.
    ///
    /// # Returns
    ///
    /// The number of clocks resynchronized, `0` if the counts did not align.
    pub fn synchronize(&mut self, master: ClockId, derived: ClockId) -> Result<u64> {
        let m = self.get(master)?;
        let (master_edges, master_full) = (m.n_edges, m.full_period);
        let master_time = m.time.clone();

        let d = self.get(derived)?;
        let (num, den) = d.division_factor();
        if u128::from(master_edges) * u128::from(den) != u128::from(d.n_edges) * u128::from(num) {
            return Ok(0);
        }

        let d = self.get_mut(derived)?;
        d.time = master_time;
        let scaled = master_full * d.ratio();
        d.set_full_period(scaled);
        let offset = d.phase_offset();
        d.next_edge_time = d.time.advance(offset);
        d.n_resyncs += 1;
        trace!(
            clock = d.path(),
            master_edges,
            edges = d.n_edges,
            next = d.next_edge_time,
            "resynchronized"
        );
        self.resyncs += 1;

        Ok(1 + self.sync_derived(derived)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(frequency_hz: f64, num: u64, den: u64) -> ClockSpec {
        ClockSpec {
            frequency_hz,
            division_num: num,
            division_den: den,
            ..ClockSpec::default()
        }
    }

    #[test]
    fn link_promotes_types() {
        let mut tree = ClockTree::default();
        let a = tree.add("a", None);
        let b = tree.add("b", None);
        let c = tree.add("c", None);
        tree.link(a, b).unwrap();
        tree.link(b, c).unwrap();
        assert_eq!(tree.get(a).unwrap().clock_type(), ClockType::Independent);
        assert_eq!(tree.get(b).unwrap().clock_type(), ClockType::Hybrid);
        assert_eq!(tree.get(c).unwrap().clock_type(), ClockType::Dependent);
    }

    #[test]
    fn link_rejects_cycles_and_second_masters() {
        let mut tree = ClockTree::default();
        let a = tree.add("a", None);
        let b = tree.add("b", None);
        let c = tree.add("c", None);
        assert!(matches!(tree.link(a, a), Err(SimError::InvalidLink { .. })));
        tree.link(a, b).unwrap();
        assert!(matches!(tree.link(c, b), Err(SimError::InvalidLink { .. })));
        tree.link(b, c).unwrap();
        assert!(matches!(tree.link(c, a), Err(SimError::InvalidLink { .. })));
    }

    #[test]
    fn independent_clock_alternates_edges() {
        let mut tree = ClockTree::default();
        let a = tree.add("a", None);
        tree.configure(a, spec(0.25, 1, 1)).unwrap();
        tree.init().unwrap();

        let clock = tree.get(a).unwrap();
        assert_eq!(clock.full_period(), 4.0);
        assert_eq!(clock.next_edge_time(), 0.0);
        assert_eq!(clock.next_edge_type(), EdgeType::Positive);

        tree.advance(a).unwrap();
        let clock = tree.get(a).unwrap();
        assert_eq!(clock.state(), ClockState::High);
        assert_eq!(clock.next_edge_type(), EdgeType::Negative);
        assert_eq!(clock.next_edge_time(), 2.0);
        assert_eq!(clock.tick_count(), 1);

        tree.advance(a).unwrap();
        let clock = tree.get(a).unwrap();
        assert_eq!(clock.state(), ClockState::Low);
        assert_eq!(clock.next_edge_time(), 4.0);
        assert_eq!(clock.edge_count(), 2);
        assert_eq!(clock.tick_count(), 1);
    }

    #[test]
    fn posedge_only_steps_full_period() {
        let mut tree = ClockTree::new(false, Summation::Neumaier);
        let a = tree.add("a", None);
        tree.configure(a, spec(0.5, 1, 1)).unwrap();
        tree.init().unwrap();
        for _ in 0..3 {
            tree.advance(a).unwrap();
        }
        let clock = tree.get(a).unwrap();
        assert_eq!(clock.state(), ClockState::Low);
        assert_eq!(clock.next_edge_type(), EdgeType::Positive);
        assert_eq!(clock.tick_count(), 3);
        assert_eq!(clock.next_edge_time(), 6.0);
    }

    #[test]
    fn derived_period_scales_by_ratio() {
        let mut tree = ClockTree::default();
        let m = tree.add("m", None);
        let d = tree.add("d", None);
        tree.configure(m, spec(1.0 / 1.125, 1, 1)).unwrap();
        tree.configure(d, spec(1.0, 16, 9)).unwrap();
        tree.link(m, d).unwrap();
        tree.init().unwrap();
        assert_eq!(tree.get(d).unwrap().full_period(), 2.0);
        assert_eq!(tree.get(d).unwrap().resync_count(), 1);
    }

    #[test]
    fn zero_denominator_is_rejected() {
        let mut tree = ClockTree::default();
        let a = tree.add("a", None);
        assert!(matches!(
            tree.configure(a, spec(1.0, 1, 0)),
            Err(SimError::InvalidDivisionFactor { num: 1, den: 0, .. })
        ));
    }
}
