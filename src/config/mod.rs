use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub use crate::nats::NatsConfig;
use crate::outlier::DEFAULT_OUTLIER_Z_THRESHOLD;
use crate::state::EvictionPolicy;
use crate::window::DEFAULT_WINDOW_CAPACITY;

/// Config file read when `HEATGATE_CONFIG` is unset (optional)
pub const DEFAULT_CONFIG_PATH: &str = "heatgate.toml";

/// Complete heatgate configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeatgateConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Decision engine parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Temperature threshold in degrees (required)
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Samples kept per entity
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// |z| above which a reading is discarded
    #[serde(default = "default_outlier_z_threshold")]
    pub outlier_z_threshold: f64,
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_outlier_z_threshold() -> f64 {
    DEFAULT_OUTLIER_Z_THRESHOLD
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            window_capacity: default_window_capacity(),
            outlier_z_threshold: default_outlier_z_threshold(),
        }
    }
}

/// Entity store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Evict entities idle for longer than this; unset keeps them forever
    #[serde(default)]
    pub idle_ttl_seconds: Option<u64>,
    /// How often the eviction sweep runs (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: None,
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl StoreConfig {
    pub fn eviction_policy(&self) -> EvictionPolicy {
        match self.idle_ttl_seconds {
            Some(secs) => EvictionPolicy::IdleFor(Duration::from_secs(secs)),
            None => EvictionPolicy::Never,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// How often to log a metrics summary (seconds, 0 disables)
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

fn default_log_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_interval_seconds: default_log_interval(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingThreshold,
    InvalidThreshold(f64),
    InvalidWindowCapacity(usize),
    InvalidOutlierThreshold(f64),
    InvalidSweepInterval,
    InvalidEnv { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingThreshold => {
                write!(f, "control.threshold is required (or set HEATGATE_THRESHOLD)")
            }
            ConfigError::InvalidThreshold(t) => {
                write!(f, "control.threshold must be finite, got {}", t)
            }
            ConfigError::InvalidWindowCapacity(n) => {
                write!(f, "control.window_capacity must be at least 1, got {}", n)
            }
            ConfigError::InvalidOutlierThreshold(z) => {
                write!(
                    f,
                    "control.outlier_z_threshold must be finite and non-negative, got {}",
                    z
                )
            }
            ConfigError::InvalidSweepInterval => {
                write!(f, "store.sweep_interval_seconds must be positive when idle_ttl_seconds is set")
            }
            ConfigError::InvalidEnv { var, value } => {
                write!(f, "invalid value '{}' for {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl HeatgateConfig {
    /// Load the config file (if any), apply environment overrides and validate.
    ///
    /// `HEATGATE_CONFIG` names a file that must exist; otherwise
    /// `heatgate.toml` is read only when present.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("HEATGATE_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH)?,
            Err(_) => HeatgateConfig::default(),
        };

        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HEATGATE_NATS_HOST") {
            self.nats.host = v;
        }
        if let Some(v) = lookup("HEATGATE_NATS_PORT") {
            self.nats.port = parse_env("HEATGATE_NATS_PORT", v)?;
        }
        if let Some(v) = lookup("HEATGATE_THRESHOLD") {
            self.control.threshold = Some(parse_env("HEATGATE_THRESHOLD", v)?);
        }
        if let Some(v) = lookup("HEATGATE_WINDOW_CAPACITY") {
            self.control.window_capacity = parse_env("HEATGATE_WINDOW_CAPACITY", v)?;
        }
        if let Some(v) = lookup("HEATGATE_OUTLIER_Z_THRESHOLD") {
            self.control.outlier_z_threshold = parse_env("HEATGATE_OUTLIER_Z_THRESHOLD", v)?;
        }
        if let Some(v) = lookup("HEATGATE_IDLE_TTL_SECONDS") {
            self.store.idle_ttl_seconds = Some(parse_env("HEATGATE_IDLE_TTL_SECONDS", v)?);
        }
        Ok(())
    }

    /// Check the decision engine parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.control.threshold {
            None => return Err(ConfigError::MissingThreshold),
            Some(t) if !t.is_finite() => return Err(ConfigError::InvalidThreshold(t)),
            Some(_) => {}
        }
        if self.control.window_capacity == 0 {
            return Err(ConfigError::InvalidWindowCapacity(0));
        }
        let z = self.control.outlier_z_threshold;
        if !z.is_finite() || z < 0.0 {
            return Err(ConfigError::InvalidOutlierThreshold(z));
        }
        if self.store.idle_ttl_seconds.is_some() && self.store.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<HeatgateConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path))?;
    let config: HeatgateConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn valid_config() -> HeatgateConfig {
        let mut config = HeatgateConfig::default();
        config.control.threshold = Some(22.0);
        config
    }

    #[test]
    fn test_default_config() {
        let config = HeatgateConfig::default();
        assert_eq!(config.nats.host, "localhost");
        assert_eq!(config.nats.port, 4222);
        assert_eq!(config.control.threshold, None);
        assert_eq!(config.control.window_capacity, 100);
        assert_eq!(config.control.outlier_z_threshold, 3.0);
        assert_eq!(config.store.eviction_policy(), EvictionPolicy::Never);
        assert_eq!(config.metrics.log_interval_seconds, 60);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [nats]
            host = "broker.local"
            port = 4333

            [control]
            threshold = 21.5
            window_capacity = 50
            outlier_z_threshold = 2.5

            [store]
            idle_ttl_seconds = 3600
            sweep_interval_seconds = 30

            [metrics]
            log_interval_seconds = 0
        "#;

        let config: HeatgateConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.nats.url(), "nats://broker.local:4333");
        assert_eq!(config.control.threshold, Some(21.5));
        assert_eq!(config.control.window_capacity, 50);
        assert_eq!(config.control.outlier_z_threshold, 2.5);
        assert_eq!(
            config.store.eviction_policy(),
            EvictionPolicy::IdleFor(Duration::from_secs(3600))
        );
        assert_eq!(config.store.sweep_interval_seconds, 30);
        assert_eq!(config.metrics.log_interval_seconds, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and fields use defaults
        let toml = r#"
            [control]
            threshold = 20.0
        "#;

        let config: HeatgateConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.control.threshold, Some(20.0));
        assert_eq!(config.control.window_capacity, 100);
        assert_eq!(config.nats.port, 4222);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_is_required() {
        let config = HeatgateConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingThreshold));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = valid_config();
        config.control.threshold = Some(f64::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));

        let mut config = valid_config();
        config.control.window_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindowCapacity(0)));

        let mut config = valid_config();
        config.control.outlier_z_threshold = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidOutlierThreshold(-1.0)));

        let mut config = valid_config();
        config.store.idle_ttl_seconds = Some(10);
        config.store.sweep_interval_seconds = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSweepInterval));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HEATGATE_NATS_HOST", "10.0.0.5"),
            ("HEATGATE_NATS_PORT", "4223"),
            ("HEATGATE_THRESHOLD", " 19.5 "),
            ("HEATGATE_WINDOW_CAPACITY", "10"),
            ("HEATGATE_OUTLIER_Z_THRESHOLD", "4"),
            ("HEATGATE_IDLE_TTL_SECONDS", "120"),
        ]
        .into_iter()
        .collect();

        let mut config = HeatgateConfig::default();
        config
            .apply_overrides(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.nats.url(), "nats://10.0.0.5:4223");
        assert_eq!(config.control.threshold, Some(19.5));
        assert_eq!(config.control.window_capacity, 10);
        assert_eq!(config.control.outlier_z_threshold, 4.0);
        assert_eq!(config.store.idle_ttl_seconds, Some(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_override() {
        let mut config = HeatgateConfig::default();
        let err = config
            .apply_overrides(|var| (var == "HEATGATE_THRESHOLD").then(|| "warm".to_string()))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: "HEATGATE_THRESHOLD",
                value: "warm".to_string()
            }
        );
        assert_eq!(err.to_string(), "invalid value 'warm' for HEATGATE_THRESHOLD");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[control]\nthreshold = 23.0\nwindow_capacity = 20").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.control.threshold, Some(23.0));
        assert_eq!(config.control.window_capacity, 20);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(load_config("/nonexistent/heatgate.toml").is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[control\nthreshold = ").unwrap();
        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }
}
