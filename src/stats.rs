//! Simulation statistics collection and reporting.
//!
//! Tracks macro-step counts, clock activity, settle and commit work and
//! wall-clock execution time.

use std::time::Instant;

use serde::Serialize;

/// Simulation statistics structure tracking kernel activity.
///
/// Updated by the scheduler once per macro-step.
#[derive(Clone, Debug, Serialize)]
pub struct SimStats {
    #[serde(skip)]
    start_time: Instant,
    /// Macro-steps executed.
    pub macro_steps: u64,
    /// Clock edges fired, summed over all clocks.
    pub edges_fired: u64,
    /// Settle phases executed, scheduled and on-demand.
    pub settles: u64,
    /// Register commits performed.
    pub commits: u64,
    /// Derived-clock resynchronizations performed after an edge.
    pub resyncs: u64,
    /// Largest number of clocks firing in one macro-step.
    pub max_edge_set: usize,
    /// Time of the most recent macro-step.
    pub sim_time: f64,
}

impl Default for SimStats {
    /// Returns the default value.
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            macro_steps: 0,
            edges_fired: 0,
            settles: 0,
            commits: 0,
            resyncs: 0,
            max_edge_set: 0,
            sim_time: 0.0,
        }
    }
}

impl SimStats {
    /// Seconds of host time since the statistics were created.
    pub fn host_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Prints a formatted summary of the run.
    ///
    /// Displays step and edge counts, per-step averages and execution time
    /// in a human-readable format.
    pub fn print(&self) {
        let seconds = self.host_seconds();
        let steps = if self.macro_steps == 0 {
            1
        } else {
            self.macro_steps
        };
        let steps_per_sec = if seconds > 0.0 {
            self.macro_steps as f64 / seconds
        } else {
            0.0
        };

        println!("\n==========================================================");
        println!("MULTI-RATE SIMULATION STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_time                 {:e}", self.sim_time);
        println!("macro_steps              {}", self.macro_steps);
        println!("steps_per_second         {:.2}", steps_per_sec);
        println!("----------------------------------------------------------");
        println!("KERNEL ACTIVITY");
        println!(
            "  edges.fired            {} ({:.2}/step)",
            self.edges_fired,
            self.edges_fired as f64 / steps as f64
        );
        println!("  edges.max_set          {}", self.max_edge_set);
        println!(
            "  settles                {} ({:.2}/step)",
            self.settles,
            self.settles as f64 / steps as f64
        );
        println!(
            "  commits                {} ({:.2}/step)",
            self.commits,
            self.commits as f64 / steps as f64
        );
        println!("  resyncs                {}", self.resyncs);
        println!("==========================================================");
    }
}
