//! Multi-Rate Simulation Kernel CLI.
//!
//! Builds the clock network described by a TOML configuration file, attaches
//! an edge-counting probe to every clock, runs the requested number of
//! macro-steps and prints run statistics.
//!
//! # Usage
//!
//! ```text
//! multirate-sim --config configs/default.toml --steps 5000 --log-level debug
//! ```

use clap::{Parser, ValueEnum};
use std::process;

use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use multirate_sim::clock::EdgeType;
use multirate_sim::common::{Reg, Result};
use multirate_sim::config::Config;
use multirate_sim::sim::{EdgeCounter, SimulationBuilder};

/// Console log levels.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliLogLevel {
    fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

/// Command-line arguments for the simulation runner.
#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-Rate Discrete-Event Simulation Kernel")]
struct Args {
    #[arg(short, long, default_value = "configs/default.toml")]
    config: String,

    /// Overrides `simulation.max_macro_steps`.
    #[arg(short, long)]
    steps: Option<u64>,

    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Suppresses the statistics table.
    #[arg(short, long)]
    quiet: bool,

    /// Prints statistics as JSON instead of a table.
    #[arg(long)]
    stats_json: bool,

    /// Prints the declared hierarchy as JSON before running.
    #[arg(long)]
    hierarchy: bool,
}

fn default_level() -> Level {
    if cfg!(feature = "always-trace") {
        Level::TRACE
    } else {
        Level::WARN
    }
}

fn init_tracing(level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main entry point for the simulation runner.
///
/// # Behavior
///
/// 1. **Configuration**: Parses arguments and loads the TOML configuration.
/// 2. **Setup**: Declares every configured clock and one probe per clock.
/// 3. **Simulation Loop**: Runs the requested number of macro-steps.
/// 4. **Teardown**: Logs per-clock counts and prints statistics.
fn main() {
    let args = Args::parse();
    init_tracing(
        args.log_level
            .map(CliLogLevel::as_tracing_level)
            .unwrap_or_else(default_level),
    );

    if let Err(e) = run(&args) {
        error!("{e}");
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = Config::from_file(&args.config)?;
    if let Some(steps) = args.steps {
        config.simulation.max_macro_steps = steps;
    }

    let mut builder = SimulationBuilder::new();
    let mut probes: Vec<(String, Reg<u64>)> = Vec::with_capacity(config.clocks.len());
    for entry in &config.clocks {
        let clock = builder.clock(None, &entry.path)?;
        let name = format!("{}_probe", entry.path);
        let (_, count) = EdgeCounter::attach(&mut builder, None, &name, clock, EdgeType::Positive)?;
        probes.push((entry.path.clone(), count));
    }
    builder.apply_config(&config)?;
    let mut sim = builder.build()?;

    if args.hierarchy {
        println!("{}", to_json(&sim.hierarchy()));
    }

    let steps = sim.run()?;
    info!(steps, time = sim.time(), "run complete");

    for (path, count) in &probes {
        let id = sim.clock_id(path)?;
        let clock = sim.clock(id)?;
        info!(
            clock = %path,
            ticks = clock.tick_count(),
            edges = clock.edge_count(),
            counted = sim.register(*count)?,
            resyncs = clock.resync_count(),
            "clock summary"
        );
    }

    if args.stats_json {
        println!("{}", to_json(sim.stats()));
    } else if !args.quiet {
        sim.stats().print();
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
