//! Configuration
//!
//! Settings for the client binary, settle delay and identity probe.
//! Loaded from TOML or JSON; every field has a default so an absent
//! or partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default identity endpoint
pub const DEFAULT_PROBE_URL: &str = "https://am.i.mullvad.net/json";

/// Browser user agents the probe picks from
const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Identity probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Identity endpoint
    pub url: String,
    /// Overall request timeout (seconds)
    pub timeout_secs: u64,
    /// Connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// User agents to rotate through
    pub user_agents: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROBE_URL.to_string(),
            timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// VPN client binary
    pub binary: String,
    /// Pause after every client command (milliseconds)
    pub settle_delay_ms: u64,
    /// Identity probe
    pub probe: ProbeConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            binary: "mullvad".to_string(),
            settle_delay_ms: 2000,
            probe: ProbeConfig::default(),
        }
    }
}

impl ControlConfig {
    /// Default config file location (`<config dir>/mullctrl/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mullctrl").join("config.toml"))
    }

    /// Load from file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
            "toml" => Self::from_toml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    /// Load from the given path, or the default location
    ///
    /// A missing file at the default location yields defaults; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Export as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Settle delay as a duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("binary must not be empty".into()));
        }
        if self.probe.url.trim().is_empty() {
            return Err(ConfigError::Invalid("probe url must not be empty".into()));
        }
        if self.probe.timeout_secs == 0 || self.probe.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("probe timeouts must be positive".into()));
        }
        if self.probe.connect_timeout_secs > self.probe.timeout_secs {
            return Err(ConfigError::Invalid(
                "connect timeout exceeds overall timeout".into(),
            ));
        }
        if self.probe.user_agents.is_empty() {
            return Err(ConfigError::Invalid("user agent pool is empty".into()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported config format")]
    UnsupportedFormat,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
