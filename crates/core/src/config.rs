//! Configuration system for the rename simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! replay run. It provides:
//! 1. **Defaults:** Baseline constants for the register file and replay pipeline.
//! 2. **Structures:** Hierarchical config for general options, the rename unit, and the pipeline model.
//!
//! Configuration is supplied as JSON (the CLI's `--config` flag) or via
//! `Config::default()`.

use serde::Deserialize;

use crate::common::constants::MAX_PHYS_ID;

/// Default configuration constants for the simulator.
mod defaults {
    /// Default physical register file size (128 slots).
    ///
    /// Large enough that the bundled synthetic traces replay without
    /// stalling, small enough that exhaustion is easy to provoke by hand.
    pub const NUM_PHYSICAL_REGISTERS: usize = 128;

    /// Default rename width (4 instructions per cycle).
    pub const PIPELINE_WIDTH: usize = 4;

    /// Default retire width (4 instructions per cycle).
    pub const RETIRE_WIDTH: usize = 4;

    /// Default in-flight window capacity (64 instructions).
    ///
    /// Stands in for the reorder buffer the replay model does not simulate;
    /// rename stalls when this many instructions are in flight.
    pub const WINDOW_SIZE: usize = 64;

    /// Default rename-to-complete latency in cycles.
    pub const COMPLETE_LATENCY: u64 = 3;

    /// Default misprediction interval (0 = never mispredict).
    ///
    /// When non-zero, every Nth taken branch squashes the instructions
    /// renamed after it, exercising the rollback path.
    pub const MISPREDICT_INTERVAL: u64 = 0;
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use oosim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.rename.num_physical_registers, 128);
/// assert_eq!(config.pipeline.width, 4);
/// ```
///
/// Deserializing from JSON (typical `--config` usage; absent fields keep
/// their defaults):
///
/// ```
/// use oosim_core::config::Config;
///
/// let json = r#"{
///     "general": { "trace_renames": true },
///     "rename": { "num_physical_registers": 64 },
///     "pipeline": { "width": 2, "mispredict_interval": 50 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert!(config.general.trace_renames);
/// assert_eq!(config.rename.num_physical_registers, 64);
/// assert_eq!(config.pipeline.retire_width, 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General simulation settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Rename unit configuration.
    #[serde(default)]
    pub rename: RenameConfig,
    /// Replay pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// General simulation settings and options.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Enable per-operation rename tracing (emitted at `log` debug level).
    #[serde(default)]
    pub trace_renames: bool,

    /// Run the allocator's invariant validator after every cycle.
    ///
    /// Expensive; intended for debugging and tests. A violation aborts the
    /// replay.
    #[serde(default)]
    pub validate_each_cycle: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_renames: false,
            validate_each_cycle: false,
        }
    }
}

/// Rename unit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameConfig {
    /// Number of physical registers. Must be in `(0, 65536]`.
    #[serde(default = "RenameConfig::default_num_physical_registers")]
    pub num_physical_registers: usize,
}

impl RenameConfig {
    /// Returns the default physical register file size.
    fn default_num_physical_registers() -> usize {
        defaults::NUM_PHYSICAL_REGISTERS
    }

    /// Checks the `(0, MAX_PHYS_ID]` constraint on the register file size.
    pub fn is_valid(&self) -> bool {
        self.num_physical_registers > 0 && self.num_physical_registers <= MAX_PHYS_ID
    }
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            num_physical_registers: defaults::NUM_PHYSICAL_REGISTERS,
        }
    }
}

/// Replay pipeline configuration.
///
/// These knobs shape the cycle model that drives the rename unit; they do
/// not affect the allocator's own semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Instructions renamed per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub width: usize,

    /// Instructions retired per cycle.
    #[serde(default = "PipelineConfig::default_retire_width")]
    pub retire_width: usize,

    /// In-flight window capacity (rename stalls when full).
    #[serde(default = "PipelineConfig::default_window_size")]
    pub window_size: usize,

    /// Cycles between rename and completion of an instruction.
    #[serde(default = "PipelineConfig::default_complete_latency")]
    pub complete_latency: u64,

    /// Every Nth taken branch is treated as mispredicted (0 = never).
    #[serde(default)]
    pub mispredict_interval: u64,
}

impl PipelineConfig {
    /// Returns the default rename width.
    fn default_width() -> usize {
        defaults::PIPELINE_WIDTH
    }

    /// Returns the default retire width.
    fn default_retire_width() -> usize {
        defaults::RETIRE_WIDTH
    }

    /// Returns the default window capacity.
    fn default_window_size() -> usize {
        defaults::WINDOW_SIZE
    }

    /// Returns the default completion latency.
    fn default_complete_latency() -> u64 {
        defaults::COMPLETE_LATENCY
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: defaults::PIPELINE_WIDTH,
            retire_width: defaults::RETIRE_WIDTH,
            window_size: defaults::WINDOW_SIZE,
            complete_latency: defaults::COMPLETE_LATENCY,
            mispredict_interval: defaults::MISPREDICT_INTERVAL,
        }
    }
}
