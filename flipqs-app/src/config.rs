use anyhow::{Context, Result};
use flipqs_core::{PanelSettings, NOTIFICATION_PANEL_ID};
use flipqs_executor::DEFAULT_SHELL;
use flipqs_interfaces::ConfiguredPermissions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "flipqs.toml";
pub const SHELL_ENV: &str = "FLIPQS_SHELL";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const MAX_SETTLE_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Privileged shell each command is piped into.
    pub shell: String,
    pub settle_delay_ms: u64,
    pub trigger_source: String,
    pub event_buffer: usize,
    pub log_level: String,
    /// Package name used in the overlay grant hint.
    pub package: String,
    pub permissions: PermissionsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub overlay: bool,
    pub short_range_radio: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            overlay: true,
            short_range_radio: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            settle_delay_ms: 1500,
            trigger_source: NOTIFICATION_PANEL_ID.to_string(),
            event_buffer: flipqs_core::DEFAULT_EVENT_BUFFER,
            log_level: "info".to_string(),
            package: "com.chriskinda.qs".to_string(),
            permissions: PermissionsConfig::default(),
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(std::env::var(SHELL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, shell: Option<String>) {
        if let Some(shell) = shell.filter(|s| !s.trim().is_empty()) {
            self.shell = shell;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shell.trim().is_empty() {
            anyhow::bail!("shell cannot be empty");
        }
        if self.trigger_source.trim().is_empty() {
            anyhow::bail!("trigger_source cannot be empty");
        }
        if self.event_buffer == 0 {
            anyhow::bail!("event_buffer must be at least 1");
        }
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            anyhow::bail!(
                "settle_delay_ms must be at most {} (got {})",
                MAX_SETTLE_DELAY_MS,
                self.settle_delay_ms
            );
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            anyhow::bail!("Unknown log_level '{}'", self.log_level);
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            settle_delay: self.settle_delay(),
            ..PanelSettings::default()
        }
    }

    pub fn permissions(&self) -> ConfiguredPermissions {
        ConfiguredPermissions::new(self.permissions.overlay, self.permissions.short_range_radio)
    }
}
