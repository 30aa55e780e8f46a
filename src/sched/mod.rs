//! Scheduling.
//!
//! Selection of simultaneous edge sets and execution of macro-steps.

/// Simultaneous edge sets.
pub mod edge_set;

/// Edge-set selection and macro-step execution.
pub mod scheduler;

pub use edge_set::EdgeSet;
pub use scheduler::Scheduler;
