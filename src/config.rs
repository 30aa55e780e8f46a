use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::clock::ClockSpec;
use crate::common::constants::{
    DEFAULT_COINCIDENCE_TOLERANCE, DEFAULT_MAX_COMBINATIONAL_DEPTH, DEFAULT_MAX_MACRO_STEPS,
};
use crate::common::{Result, SimError, Summation};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub clocks: Vec<ClockConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_max_macro_steps")]
    pub max_macro_steps: u64,

    #[serde(default = "default_negedge_enabled")]
    pub negedge_enabled: bool,

    #[serde(default = "default_max_combinational_depth")]
    pub max_combinational_depth: usize,

    #[serde(default = "default_coincidence_tolerance")]
    pub coincidence_tolerance: f64,

    #[serde(default)]
    pub summation: Summation,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_macro_steps: default_max_macro_steps(),
            negedge_enabled: default_negedge_enabled(),
            max_combinational_depth: default_max_combinational_depth(),
            coincidence_tolerance: default_coincidence_tolerance(),
            summation: Summation::default(),
        }
    }
}

impl SimulationConfig {
    /// Rejects kernel settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_combinational_depth == 0 {
            return Err(SimError::InvalidSetting {
                name: "max_combinational_depth",
                value: self.max_combinational_depth.to_string(),
            });
        }
        if !self.coincidence_tolerance.is_finite() || self.coincidence_tolerance < 0.0 {
            return Err(SimError::InvalidSetting {
                name: "coincidence_tolerance",
                value: self.coincidence_tolerance.to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters applied to one clock, addressed by full path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    pub path: String,

    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    #[serde(default)]
    pub phase_deg: f64,

    #[serde(default = "default_division")]
    pub division_num: u64,

    #[serde(default = "default_division")]
    pub division_den: u64,

    /// Full path of the master clock, for derived clocks.
    #[serde(default)]
    pub master: Option<String>,
}

impl ClockConfig {
    pub fn spec(&self) -> ClockSpec {
        ClockSpec {
            frequency_hz: self.frequency_hz,
            phase_deg: self.phase_deg,
            division_num: self.division_num,
            division_den: self.division_den,
        }
    }
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        fs::read_to_string(path)?.parse()
    }

    /// Rejects values the kernel cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        for clock in &self.clocks {
            if clock.division_num == 0 || clock.division_den == 0 {
                return Err(SimError::InvalidDivisionFactor {
                    path: clock.path.clone(),
                    num: clock.division_num,
                    den: clock.division_den,
                });
            }
            if !clock.frequency_hz.is_finite() || clock.frequency_hz <= 0.0 {
                return Err(SimError::InvalidFrequency {
                    path: clock.path.clone(),
                    frequency_hz: clock.frequency_hz,
                });
            }
            if !clock.phase_deg.is_finite() {
                return Err(SimError::InvalidPhase {
                    path: clock.path.clone(),
                    phase_deg: clock.phase_deg,
                });
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn default_max_macro_steps() -> u64 {
    DEFAULT_MAX_MACRO_STEPS
}

fn default_negedge_enabled() -> bool {
    true
}

fn default_max_combinational_depth() -> usize {
    DEFAULT_MAX_COMBINATIONAL_DEPTH
}

fn default_coincidence_tolerance() -> f64 {
    DEFAULT_COINCIDENCE_TOLERANCE
}

fn default_frequency_hz() -> f64 {
    1.0
}

fn default_division() -> u64 {
    1
}
