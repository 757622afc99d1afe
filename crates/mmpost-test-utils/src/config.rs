//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use mmpost_config::{AppConfig, ToolConfig, WipeOffsetConfig};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .tool(0, "PLA", 210.0)
///     .oozy_tool(1, "PETG", 240.0, (5.0, 0.0))
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Add a non-oozy tool.
    pub fn tool(mut self, index: u32, material: &str, target_temperature: f64) -> Self {
        self.config.tools.push(ToolConfig {
            index,
            material: material.to_string(),
            target_temperature,
            idle_temperature: None,
            oozy: false,
            wipe_offset: WipeOffsetConfig::default(),
        });
        self
    }

    /// Add an oozy tool wiping by `(x, y)`.
    pub fn oozy_tool(
        mut self,
        index: u32,
        material: &str,
        target_temperature: f64,
        (x, y): (f64, f64),
    ) -> Self {
        self = self.tool(index, material, target_temperature);
        if let Some(tool) = self.config.tools.last_mut() {
            tool.oozy = true;
            tool.wipe_offset = WipeOffsetConfig { x, y };
        }
        self
    }

    /// Set the idle temperature of the most recently added tool.
    pub fn idle(mut self, temperature: f64) -> Self {
        if let Some(tool) = self.config.tools.last_mut() {
            tool.idle_temperature = Some(temperature);
        }
        self
    }

    pub fn wait_for_temperature(mut self, wait: bool) -> Self {
        self.config.postprocess.wait_for_temperature = wait;
        self
    }

    pub fn wipe_feed_rate(mut self, feed: f64) -> Self {
        self.config.postprocess.wipe_feed_rate = Some(feed);
        self
    }

    pub fn minimize_temperatures(mut self, enabled: bool) -> Self {
        self.config.postprocess.minimize_temperatures = enabled;
        self
    }

    pub fn cooldown_at_end(mut self, enabled: bool) -> Self {
        self.config.postprocess.cooldown_at_end = enabled;
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.config.output.suffix = suffix.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }

    /// Serialize the built config to TOML, for writing config files.
    pub fn to_toml(&self) -> String {
        toml_string(&self.config)
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The two-tool setup used throughout the scenario tests: T0 is oozy PETG
/// wiping 5 mm along X, T1 is PLA at 210.
pub fn two_tool_config() -> AppConfig {
    TestConfigBuilder::new()
        .oozy_tool(0, "PETG", 240.0, (5.0, 0.0))
        .tool(1, "PLA", 210.0)
        .build()
}

fn toml_string(config: &AppConfig) -> String {
    toml::to_string(config).expect("test config serializes to TOML")
}
