//! Kernel configuration
//!
//! Loaded from TOML or YAML, format picked from the file extension.

use crate::communication::DEFAULT_MESSENGER_BUDGET;
use crate::core::{Address, DEFAULT_NODE_BUDGET};
use crate::error::{ObdError, ObdResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default rate of the run loop
pub const DEFAULT_TICK_RATE_HZ: f64 = 50.0;

/// Tunables of the kernel tick loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Fixed tick rate of `System::run`
    pub tick_rate_hz: f64,
    /// Successful routes per tick
    pub messenger_budget: usize,
    /// Successful treatments per node per tick
    pub node_budget: usize,
    /// Address `NodeInfo::console` targets; diagnostics are only logged when unset
    pub diagnostic_sink: Option<Address>,
    /// Stop the run loop after that many ticks
    pub max_ticks: Option<u64>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            messenger_budget: DEFAULT_MESSENGER_BUDGET,
            node_budget: DEFAULT_NODE_BUDGET,
            diagnostic_sink: None,
            max_ticks: None,
        }
    }
}

impl KernelConfig {
    /// Load config from a file (auto-detect format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> ObdResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ObdError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents)?,
            _ => Self::from_toml_str(&contents).or_else(|_| Self::from_yaml_str(&contents))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ObdResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_yaml_str(contents: &str) -> ObdResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| ObdError::config(format!("invalid YAML: {}", e)))
    }

    /// Write the config back, YAML for `.yaml`/`.yml`, TOML otherwise
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ObdResult<()> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> ObdResult<()> {
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(ObdError::config(format!(
                "tick_rate_hz must be positive, got {}",
                self.tick_rate_hz
            )));
        }
        if self.messenger_budget == 0 {
            return Err(ObdError::config("messenger_budget must be at least 1"));
        }
        if self.node_budget == 0 {
            return Err(ObdError::config("node_budget must be at least 1"));
        }
        if self.diagnostic_sink == Some(Address::BROADCAST) {
            return Err(ObdError::config(
                "diagnostic_sink cannot be the broadcast address",
            ));
        }
        Ok(())
    }

    /// Time between two ticks of the run loop
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.messenger_budget, 10);
        assert_eq!(config.node_budget, 3);
        assert_eq!(config.diagnostic_sink, None);
        assert_eq!(config.tick_period(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = KernelConfig::from_toml_str(
            r#"
            tick_rate_hz = 100.0
            diagnostic_sink = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_rate_hz, 100.0);
        assert_eq!(config.diagnostic_sink, Some(Address::new(1)));
        assert_eq!(config.node_budget, DEFAULT_NODE_BUDGET);
    }

    #[test]
    fn test_yaml() {
        let config = KernelConfig::from_yaml_str("messenger_budget: 4\nmax_ticks: 20\n").unwrap();
        assert_eq!(config.messenger_budget, 4);
        assert_eq!(config.max_ticks, Some(20));
        assert!(KernelConfig::from_yaml_str("messenger_budget: [").is_err());
    }

    #[test]
    fn test_validate() {
        let zero_node = KernelConfig {
            node_budget: 0,
            ..KernelConfig::default()
        };
        assert!(matches!(zero_node.validate(), Err(ObdError::Config(_))));

        let frozen = KernelConfig {
            tick_rate_hz: 0.0,
            ..KernelConfig::default()
        };
        assert!(frozen.validate().is_err());

        let sink_everywhere = KernelConfig {
            diagnostic_sink: Some(Address::BROADCAST),
            ..KernelConfig::default()
        };
        assert!(sink_everywhere.validate().is_err());
    }

    #[test]
    fn test_save_and_load_files() {
        let dir = TempDir::new().unwrap();
        let config = KernelConfig {
            tick_rate_hz: 25.0,
            messenger_budget: 12,
            diagnostic_sink: Some(Address::new(1)),
            ..KernelConfig::default()
        };

        for name in ["kernel.toml", "nested/kernel.yaml"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).unwrap();
            assert_eq!(KernelConfig::from_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_from_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(KernelConfig::from_file(dir.path().join("missing.toml")).is_err());

        let path = dir.path().join("kernel.conf");
        std::fs::write(&path, "node_budget = 0").unwrap();
        assert!(matches!(
            KernelConfig::from_file(&path),
            Err(ObdError::Config(_))
        ));
    }
}
