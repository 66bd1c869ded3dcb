//! Configuration system for the memory-controller model.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the controller. It provides:
//! 1. **Defaults:** Baseline capacity, latency, line size and device timing constants.
//! 2. **Structures:** Controller, device (technology) and simulation-context configuration.
//! 3. **Enums:** The device timing oracle model.
//!
//! Configuration is supplied as JSON. The technology file accepts the device simulator's own
//! key names (`IgnoreData`, `EventDriven`, `CPUFreq`, `CLK`) as aliases.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{MemCtrlError, Result};

/// Default configuration constants.
///
/// These values define the baseline configuration when a key is not
/// explicitly present in the JSON files.
mod defaults {
    /// Memory capacity in MiB (16 GiB).
    pub const CAPACITY_MB: u32 = 16384;

    /// Minimum latency, in processor cycles, committed to the requester.
    ///
    /// Also the lower bound the tick bridge uses to schedule its first wake-up.
    pub const MIN_LATENCY: u64 = 100;

    /// Cache line size in bytes.
    pub const LINE_SIZE: u32 = 64;

    /// Length of one bound/weave phase in cycles.
    pub const PHASE_LENGTH: u64 = 1000;

    /// Device service latency of the fixed-latency oracle.
    pub const ORACLE_LATENCY: u64 = 100;

    /// Maximum requests the device accepts before refusing issue.
    pub const QUEUE_DEPTH: usize = 32;

    /// CAS (Column Access Strobe) latency in cycles.
    pub const T_CAS: u64 = 14;

    /// RAS (Row Access Strobe) latency in cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in cycles.
    pub const T_PRE: u64 = 14;

    /// Bytes covered by one DRAM row.
    pub const ROW_BYTES: u64 = 2048;

    /// Processor frequency in MHz.
    pub const CPU_FREQ_MHZ: f64 = 2000.0;

    /// Memory bus frequency in MHz.
    pub const BUS_FREQ_MHZ: f64 = 666.0;
}

/// Device timing oracle models.
///
/// Specifies which timing model sits behind the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OracleModel {
    /// Every request completes a fixed number of cycles after issue.
    #[default]
    Fixed,
    /// Single-channel open-row DRAM model (CAS, RAS, precharge).
    #[serde(alias = "DRAM")]
    RowBuffer,
    /// External cycle-level device simulator.
    ///
    /// Not linked into this build; selecting it fails construction.
    #[serde(alias = "NVMain")]
    External,
}

/// Memory controller configuration.
///
/// # Examples
///
/// ```
/// use wavemem_core::config::ControllerConfig;
///
/// let json = r#"{
///     "tech_ini": "configs/pcm.json",
///     "output_file": "nvmain.out",
///     "name": "mem-0",
///     "min_latency": 120
/// }"#;
///
/// let config = ControllerConfig::from_json(json).unwrap();
/// assert_eq!(config.min_latency, 120);
/// assert_eq!(config.capacity_mb, 16384);
/// assert!(!config.memtrace);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Path of the technology (device timing) configuration file.
    pub tech_ini: String,

    /// Environment variable whose name, wherever it appears in `tech_ini`, is
    /// replaced by the variable's value (empty when unset).
    #[serde(default)]
    pub env_var: Option<String>,

    /// Statistics log file name; the log lands at `<output_dir>/<name>-<output_file>`.
    pub output_file: String,

    /// Trace name. Accepted for compatibility, unused.
    #[serde(default)]
    pub trace_name: String,

    /// Memory capacity in MiB.
    #[serde(default = "ControllerConfig::default_capacity_mb")]
    pub capacity_mb: u32,

    /// Minimum latency committed to the requester, in cycles.
    #[serde(default = "ControllerConfig::default_min_latency")]
    pub min_latency: u64,

    /// Simulation domain the controller's events belong to.
    #[serde(default)]
    pub domain: u32,

    /// Controller name; prefixes the statistics log and the statistics group.
    pub name: String,

    /// Append every recorded access to `<output_dir>/memory.trace`.
    #[serde(default)]
    pub memtrace: bool,
}

impl ControllerConfig {
    fn default_capacity_mb() -> u32 {
        defaults::CAPACITY_MB
    }

    fn default_min_latency() -> u64 {
        defaults::MIN_LATENCY
    }

    /// Creates a configuration with default capacity, latency and domain.
    pub fn new(name: impl Into<String>, tech_ini: impl Into<String>, output_file: impl Into<String>) -> Self {
        Self {
            tech_ini: tech_ini.into(),
            env_var: None,
            output_file: output_file.into(),
            trace_name: String::new(),
            capacity_mb: defaults::CAPACITY_MB,
            min_latency: defaults::MIN_LATENCY,
            domain: 0,
            name: name.into(),
            memtrace: false,
        }
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks values the controller cannot run with.
    ///
    /// A zero `min_latency` is accepted here: `access` reports it as a
    /// non-positive latency on the first request.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(MemCtrlError::Config("controller name is empty".into()));
        }
        if self.output_file.is_empty() {
            return Err(MemCtrlError::Config(format!(
                "controller `{}` has no output_file",
                self.name
            )));
        }
        if self.capacity_mb == 0 {
            return Err(MemCtrlError::Config(format!(
                "controller `{}` has zero capacity",
                self.name
            )));
        }
        Ok(())
    }

    /// Returns `tech_ini` with the configured environment variable substituted.
    pub fn resolved_tech_path(&self) -> String {
        resolve_tech_path(&self.tech_ini, self.env_var.as_deref(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Loads the technology configuration `tech_ini` points at.
    pub fn load_oracle_config(&self) -> Result<OracleConfig> {
        OracleConfig::from_file(self.resolved_tech_path())
    }
}

/// Replaces every occurrence of `env_var` in `path` with the value `lookup` returns for it.
///
/// An unset variable is replaced by the empty string. Without `env_var` the path is
/// returned unchanged.
pub fn resolve_tech_path<F>(path: &str, env_var: Option<&str>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match env_var {
        Some(var) if !var.is_empty() => path.replace(var, &lookup(var).unwrap_or_default()),
        _ => path.to_owned(),
    }
}

/// Device timing oracle (technology) configuration.
///
/// Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Timing model behind the controller.
    pub model: OracleModel,

    /// Service latency of the fixed-latency model, in cycles.
    pub latency: u64,

    /// Requests the device holds before refusing issue (0 = unbounded).
    pub queue_depth: usize,

    /// Column access latency (row buffer model).
    pub t_cas: u64,

    /// Row activation latency (row buffer model).
    pub t_ras: u64,

    /// Precharge latency (row buffer model).
    pub t_pre: u64,

    /// Bytes per DRAM row; must be a power of two.
    pub row_bytes: u64,

    /// Processor frequency in MHz.
    #[serde(alias = "CPUFreq")]
    pub cpu_freq_mhz: f64,

    /// Memory bus frequency in MHz.
    #[serde(alias = "CLK")]
    pub bus_freq_mhz: f64,

    /// Never materialize request payload bytes.
    #[serde(alias = "IgnoreData")]
    pub ignore_data: bool,

    /// Reserved for mode selection; the controller always drives the device
    /// through the tick bridge.
    #[serde(alias = "EventDriven")]
    pub event_driven: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: OracleModel::default(),
            latency: defaults::ORACLE_LATENCY,
            queue_depth: defaults::QUEUE_DEPTH,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            row_bytes: defaults::ROW_BYTES,
            cpu_freq_mhz: defaults::CPU_FREQ_MHZ,
            bus_freq_mhz: defaults::BUS_FREQ_MHZ,
            ignore_data: false,
            event_driven: false,
        }
    }
}

impl OracleConfig {
    /// Parses and validates a technology configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a technology configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks device timing values.
    pub fn validate(&self) -> Result<()> {
        if !self.row_bytes.is_power_of_two() {
            return Err(MemCtrlError::Config(format!(
                "row_bytes {} is not a power of two",
                self.row_bytes
            )));
        }
        if self.cpu_freq_mhz <= 0.0 || self.bus_freq_mhz <= 0.0 {
            return Err(MemCtrlError::Config("frequencies must be positive".into()));
        }
        Ok(())
    }
}

/// Simulation-wide settings shared by all controllers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimContextConfig {
    /// Directory receiving statistics logs and memory traces.
    #[serde(default = "SimContextConfig::default_output_dir")]
    pub output_dir: PathBuf,

    /// Cache line size in bytes; must be a power of two.
    #[serde(default = "SimContextConfig::default_line_size")]
    pub line_size: u32,

    /// A DRAM cache sits between the last-level cache and this controller,
    /// so clean evictions are timed instead of discarded.
    #[serde(default)]
    pub has_dram_cache: bool,

    /// Bound/weave phase length in cycles.
    #[serde(default = "SimContextConfig::default_phase_length")]
    pub phase_length: u64,
}

impl SimContextConfig {
    fn default_output_dir() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_line_size() -> u32 {
        defaults::LINE_SIZE
    }

    fn default_phase_length() -> u64 {
        defaults::PHASE_LENGTH
    }

    /// Checks line size and phase length.
    pub fn validate(&self) -> Result<()> {
        if !self.line_size.is_power_of_two() {
            return Err(MemCtrlError::Config(format!(
                "line_size {} is not a power of two",
                self.line_size
            )));
        }
        if self.phase_length == 0 {
            return Err(MemCtrlError::Config("phase_length must be positive".into()));
        }
        Ok(())
    }
}

impl Default for SimContextConfig {
    fn default() -> Self {
        Self {
            output_dir: Self::default_output_dir(),
            line_size: defaults::LINE_SIZE,
            has_dram_cache: false,
            phase_length: defaults::PHASE_LENGTH,
        }
    }
}
