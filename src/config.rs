//! Simulator configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via --config or PETRINET_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Simulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Firing defaults.
    pub simulation: SimulationConfig,
    /// Interactive session settings.
    pub repl: ReplConfig,
    /// Log filter.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from `path` (if any), then applies environment
    /// variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.simulation.apply_env_overrides();
        self.repl.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.default_multiple <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "simulation.default_multiple must be positive, got {}",
                self.simulation.default_multiple
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Firing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Multiplier used when a command does not give one.
    pub default_multiple: i64,
    /// Reject declarations whose version is not the supported one. When
    /// false, a mismatched version is logged and loaded anyway.
    pub strict_version: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_multiple: 1,
            strict_version: true,
        }
    }
}

impl SimulationConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(multiple) = std::env::var("PETRINET_DEFAULT_MULTIPLE") {
            if let Ok(n) = multiple.parse() {
                self.default_multiple = n;
            }
        }

        if let Ok(strict) = std::env::var("PETRINET_STRICT_VERSION") {
            self.strict_version = strict == "1" || strict.to_lowercase() == "true";
        }
    }
}

/// Interactive session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Where line history is kept. Defaults to `~/.petrinet_history`.
    pub history_file: Option<PathBuf>,
    pub prompt: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            prompt: "petrinet>".to_string(),
        }
    }
}

impl ReplConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PETRINET_HISTORY_FILE") {
            self.history_file = Some(PathBuf::from(path));
        }

        if let Ok(prompt) = std::env::var("PETRINET_PROMPT") {
            if !prompt.is_empty() {
                self.prompt = prompt;
            }
        }
    }

    /// Resolved history file path.
    pub fn history_path(&self) -> PathBuf {
        self.history_file.clone().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".petrinet_history"))
                .unwrap_or_else(|_| ".petrinet_history".into())
        })
    }
}

/// Log filter used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(filter) = std::env::var("PETRINET_LOG") {
            if !filter.is_empty() {
                self.filter = filter;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
