//! Configuration handling for cuesheet
//!
//! Configuration is read from the first of:
//! 1. an explicit `--config` path
//! 2. `cuesheet.toml` in the current directory or any parent
//! 3. `config.toml` in the platform config directory
//!
//! Missing files mean built-in defaults; every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{ActionPolicy, EngineConfig, RiskPolicy, RunOfShowWindows, SeverityWeights};

/// File name searched for in the working directory and its parents
pub const PROJECT_CONFIG_FILE: &str = "cuesheet.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Used when `--format` is not given
    pub default_format: OutputFormat,
}

/// Settings for `cuesheet watch`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a burst of file changes triggers a re-run
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

/// Everything a config file may contain
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub risk: RiskPolicy,
    pub severity: SeverityWeights,
    pub actions: ActionPolicy,
    pub run_of_show: RunOfShowWindows,
    pub output: OutputConfig,
    pub watch: WatchConfig,
}

impl Settings {
    /// The engine-facing subset
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            risk: self.risk.clone(),
            severity: self.severity.clone(),
            actions: self.actions.clone(),
            run_of_show: self.run_of_show.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.risk.float_threshold_ratio;
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "risk.float_threshold_ratio must be a non-negative number, got {}",
                ratio
            )));
        }

        let severity = &self.severity;
        for (name, weight) in [
            ("priority_weight", severity.priority_weight),
            ("deadline_weight", severity.deadline_weight),
            ("blocking_weight", severity.blocking_weight),
        ] {
            if weight > SeverityWeights::MAX_WEIGHT {
                return Err(ConfigError::Invalid(format!(
                    "severity.{} must be at most {}, got {}",
                    name,
                    SeverityWeights::MAX_WEIGHT,
                    weight
                )));
            }
        }
        Ok(())
    }
}

/// Loaded configuration and where it came from
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

impl Config {
    /// Built-in defaults, not backed by any file
    pub fn defaults() -> Self {
        Self {
            settings: Settings::default(),
            source: None,
        }
    }

    /// Loads configuration from an explicit path or the default locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        if let Some(path) = Self::find_project_config(&cwd) {
            return Self::from_file(&path);
        }

        match Self::global_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::defaults()),
        }
    }

    /// Reads and validates one config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        settings.validate()?;

        Ok(Self {
            settings,
            source: Some(path.to_path_buf()),
        })
    }

    /// Finds `cuesheet.toml` in `start` or the nearest ancestor
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns the global config file location
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "cuesheet", "cuesheet")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Serializes the settings as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.settings).context("Failed to serialize config")
    }

    /// Writes the default settings to `path`, refusing to overwrite
    pub fn write_defaults(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(ConfigError::Invalid(format!(
                "{} already exists",
                path.display()
            ))
            .into());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = Self::defaults().to_toml()?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Minutes, Priority};
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::defaults();

        assert!(config.source.is_none());
        assert_eq!(config.settings.output.default_format, OutputFormat::Text);
        assert_eq!(config.settings.watch.debounce_ms, 500);
        assert_eq!(config.settings.risk.float_threshold_ratio, 0.10);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[risk]
lead_time_hours = 24
top_priority_band = 2

[output]
default_format = "json"
"#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.risk.lead_time, Minutes::from_hours_whole(24));
        assert_eq!(settings.risk.top_priority_band, Priority::High);
        assert_eq!(settings.output.default_format, OutputFormat::Json);
        assert_eq!(settings.actions, ActionPolicy::default());
    }

    #[test]
    fn find_project_config_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let sub_dir = dir.path().join("events").join("spring");
        fs::create_dir_all(&sub_dir).unwrap();

        let found = Config::find_project_config(&sub_dir).unwrap();
        assert_eq!(found, dir.path().join(PROJECT_CONFIG_FILE));
    }

    #[test]
    fn from_file_records_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[watch]\ndebounce_ms = 50\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert_eq!(config.settings.watch.debounce_ms, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[risk\nlead_time_hours = ").unwrap();

        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn negative_ratio_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neg.toml");
        fs::write(&path, "[risk]\nfloat_threshold_ratio = -0.5\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("float_threshold_ratio"));
    }

    #[test]
    fn oversized_severity_weight_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.toml");
        fs::write(&path, "[severity]\nblocking_weight = 4000000000\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("severity.blocking_weight"));
    }

    #[test]
    fn negative_window_is_rejected() {
        let toml = "[run_of_show]\nsetup_hours = -1\n";
        assert!(toml::from_str::<Settings>(toml).is_err());
    }

    #[test]
    fn defaults_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(PROJECT_CONFIG_FILE);

        Config::write_defaults(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.settings, Settings::default());

        assert!(Config::write_defaults(&path).is_err());
    }
}
