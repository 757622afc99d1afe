#![deny(unsafe_code)]

//! Configuration loading, validation, and material profiles for mmpost.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure,
//! and the [`material`] module for the per-tool material policy table.

/// Per-tool material profiles and the lookup table built from them.
pub mod material;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Hottest nozzle temperature accepted in a tool profile.
pub const MAX_TEMPERATURE: f64 = 500.0;

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Output file configuration.
    #[serde(default)]
    pub output: OutputConfig,

    /// Rewrite behavior switches.
    #[serde(default)]
    pub postprocess: PostprocessConfig,

    /// Per-tool material profiles.
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Output file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Infix inserted between the input file stem and its extension.
    #[serde(default = "default_output_suffix")]
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: default_output_suffix(),
        }
    }
}

fn default_output_suffix() -> String {
    "postprocessed".to_string()
}

/// Switches controlling what the rewriter inserts.
///
/// All optional behaviors default to off so that a program without
/// tool-change regions passes through byte-for-byte.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PostprocessConfig {
    /// Emit `M109` (set and wait) instead of `M104` for temperature ramps.
    #[serde(default)]
    pub wait_for_temperature: bool,

    /// Feed rate (mm/min) attached to wipe moves. Omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wipe_feed_rate: Option<f64>,

    /// Drop temperature commands that re-set an already commanded target.
    #[serde(default)]
    pub minimize_temperatures: bool,

    /// Append `M104 T<n> S0` for every configured tool at the end.
    #[serde(default)]
    pub cooldown_at_end: bool,
}

/// A single tool profile as expressed in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool (extruder) index, as used by `T<n>` commands.
    pub index: u32,

    /// Material label, for logs and reports.
    #[serde(default)]
    pub material: String,

    /// Printing temperature in degrees Celsius.
    pub target_temperature: f64,

    /// Temperature to park the nozzle at while another tool prints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_temperature: Option<f64>,

    /// Whether the material oozes and needs a wipe before going idle.
    #[serde(default)]
    pub oozy: bool,

    /// Wipe stroke offset from the home position.
    #[serde(default)]
    pub wipe_offset: WipeOffsetConfig,
}

/// Wipe stroke offset in millimetres.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct WipeOffsetConfig {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), tools = config.tools.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.suffix.is_empty() {
            return Err(ConfigError::Validation(
                "output.suffix must not be empty".to_string(),
            ));
        }
        if self.output.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "output.suffix must not contain path separators, got {:?}",
                self.output.suffix
            )));
        }

        if let Some(feed) = self.postprocess.wipe_feed_rate {
            if !feed.is_finite() || feed <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "postprocess.wipe_feed_rate must be positive, got {feed}"
                )));
            }
        }

        // Validate tool profiles
        let mut seen = HashSet::new();
        for (i, tool) in self.tools.iter().enumerate() {
            if !seen.insert(tool.index) {
                return Err(ConfigError::Validation(format!(
                    "tools[{i}].index {} is configured more than once",
                    tool.index
                )));
            }
            let target = tool.target_temperature;
            if !target.is_finite() || target <= 0.0 || target > MAX_TEMPERATURE {
                return Err(ConfigError::Validation(format!(
                    "tools[{i}].target_temperature must be in (0, {MAX_TEMPERATURE}], got {target}"
                )));
            }
            if let Some(idle) = tool.idle_temperature {
                if !idle.is_finite() || idle < 0.0 || idle > target {
                    return Err(ConfigError::Validation(format!(
                        "tools[{i}].idle_temperature must be in [0, {target}], got {idle}"
                    )));
                }
            }
            if !tool.wipe_offset.x.is_finite() || !tool.wipe_offset.y.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "tools[{i}].wipe_offset must be finite"
                )));
            }
            if tool.oozy && tool.wipe_offset.x == 0.0 && tool.wipe_offset.y == 0.0 {
                return Err(ConfigError::Validation(format!(
                    "tools[{i}].wipe_offset must be non-zero for an oozy tool"
                )));
            }
        }

        Ok(())
    }

    /// Build a [`MaterialTable`](material::MaterialTable) from the configured tools.
    pub fn build_material_table(&self) -> material::MaterialTable {
        let mut table = material::MaterialTable::new();
        for tool in &self.tools {
            table.insert(
                tool.index,
                material::MaterialProfile {
                    material: tool.material.clone(),
                    target_temperature: tool.target_temperature,
                    idle_temperature: tool.idle_temperature,
                    is_oozy: tool.oozy,
                    wipe_offset: material::Offset::new(tool.wipe_offset.x, tool.wipe_offset.y),
                },
            );
        }
        table
    }
}
