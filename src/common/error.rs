//! Kernel Error Types.
//!
//! Every failure the kernel can report is a configuration defect detected
//! during setup, or a programming defect (a combinational cycle) detected
//! while settling. There are no transient runtime errors to retry.

use thiserror::Error;

/// Errors raised while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// One or more ports were still unbound after port optimization.
    #[error("{} port(s) left unconnected: {}", .paths.len(), .paths.join(", "))]
    UnconnectedPorts {
        /// Full paths of the unbound ports.
        paths: Vec<String>,
    },

    /// A path did not name anything of the expected kind.
    #[error("`{path}` does not name a {kind}")]
    UnknownPath {
        /// The path that was looked up.
        path: String,
        /// What the path was expected to name ("clock", "module", ...).
        kind: &'static str,
    },

    /// Two entities were declared under the same full path.
    #[error("`{path}` is already declared")]
    DuplicateName {
        /// The conflicting path.
        path: String,
    },

    /// A declared name was empty or contained the path separator.
    #[error("invalid name `{name}`: names must be non-empty and must not contain '.'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A clock division factor had a zero numerator or denominator.
    #[error("clock `{path}` has invalid division factor {num}/{den}")]
    InvalidDivisionFactor {
        /// Full path of the clock.
        path: String,
        /// Numerator.
        num: u64,
        /// Denominator.
        den: u64,
    },

    /// An independent clock was configured with a non-positive or non-finite frequency.
    #[error("clock `{path}` has invalid frequency {frequency_hz} Hz")]
    InvalidFrequency {
        /// Full path of the clock.
        path: String,
        /// The rejected frequency.
        frequency_hz: f64,
    },

    /// A clock phase was not a finite number of degrees.
    #[error("clock `{path}` has invalid phase {phase_deg} degrees")]
    InvalidPhase {
        /// Full path of the clock.
        path: String,
        /// The rejected phase.
        phase_deg: f64,
    },

    /// A kernel setting is out of range.
    #[error("invalid simulation setting `{name}` = {value}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A clock derivation could not be registered.
    #[error("cannot derive clock `{derived}` from `{master}`: {reason}")]
    InvalidLink {
        /// Path of the would-be master.
        master: String,
        /// Path of the would-be derived clock.
        derived: String,
        /// Why the link was rejected.
        reason: &'static str,
    },

    /// A module's settle phase was re-entered while it was still running.
    #[error("cyclic combinational dependency: module `{path}` was re-entered during its own settle phase")]
    CombinationalCycle {
        /// Full path of the re-entered module.
        path: String,
    },

    /// Nested on-demand evaluation exceeded the configured depth limit.
    #[error("cyclic combinational dependency suspected: evaluation depth exceeded {limit} at module `{path}`")]
    EvaluationDepthExceeded {
        /// Full path of the module that would have exceeded the limit.
        path: String,
        /// The configured limit.
        limit: usize,
    },

    /// A chain of forwarding ports loops back on itself.
    #[error("port `{path}` forwards into a loop")]
    ForwardingLoop {
        /// Full path of the port whose chain loops.
        path: String,
    },

    /// Two clocks have edge times that are not equal but closer than the coincidence tolerance.
    #[error(
        "ambiguous edge coincidence: `{first}` at {first_time:e} and `{second}` at {second_time:e} \
         differ by less than the coincidence tolerance"
    )]
    AmbiguousEdgeTime {
        /// Clock holding the earliest edge.
        first: String,
        /// Edge time of `first`.
        first_time: f64,
        /// Clock whose edge nearly coincides.
        second: String,
        /// Edge time of `second`.
        second_time: f64,
    },

    /// An edge set was executed after the clocks it names had moved on.
    #[error("edge set at {time:e} is stale: clock `{clock}` no longer fires at that time")]
    StaleEdgeSet {
        /// Time recorded in the edge set.
        time: f64,
        /// First clock found out of date.
        clock: String,
    },

    /// A storage cell did not hold the type its handle promised.
    #[error("type mismatch on `{path}`: expected {expected}")]
    TypeMismatch {
        /// Full path of the cell.
        path: String,
        /// Name of the expected type.
        expected: &'static str,
    },

    /// A handle does not belong to this simulation.
    #[error("{kind} handle {index} does not belong to this simulation")]
    InvalidHandle {
        /// Kind of handle ("port", "register", ...).
        kind: &'static str,
        /// Index carried by the handle.
        index: usize,
    },

    /// A module tried to mutate state owned by another module.
    #[error("module `{module}` does not own `{path}`")]
    ForeignHandle {
        /// Path of the module attempting the access.
        module: String,
        /// Path of the register or wire.
        path: String,
    },

    /// A module slot was declared but never given a unit.
    #[error("module `{path}` was declared but no unit was installed")]
    ModuleNotInstalled {
        /// Full path of the module slot.
        path: String,
    },

    /// The simulation contains no clocks, so no macro-step can be scheduled.
    #[error("simulation has no clocks to schedule")]
    NoClocks,

    /// A module hook reported a failure of its own.
    #[error("module `{path}`: {message}")]
    Module {
        /// Full path of the failing module.
        path: String,
        /// Message supplied by the module.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result alias used throughout the kernel.
pub type Result<T> = std::result::Result<T, SimError>;
