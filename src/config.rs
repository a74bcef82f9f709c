//! Harness Configuration
//!
//! Handles parsing and management of selfmatch.toml configuration files.
//! Every field has a code-level default, so a missing file is not an error.

use crate::identity::FEATURES_LENGTH;
use crate::settle::SettleStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name searched for by [`HarnessConfig::find_and_load`]
pub const CONFIG_FILE_NAME: &str = "selfmatch.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching selfmatch.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HarnessConfig {
    /// Remote service location and transport settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Population and worker pool sizing
    #[serde(default)]
    pub run: RunConfig,

    /// Wait between ingestion and verification
    #[serde(default)]
    pub settle: SettleConfig,

    /// Self-match criteria
    #[serde(default)]
    pub verify: VerifyConfig,
}

impl HarnessConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading config");
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Reject settings the harness cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("service.base_url is empty".into()));
        }
        if !(self.service.timeout_secs > 0.0)
            || Duration::try_from_secs_f64(self.service.timeout_secs).is_err()
        {
            return Err(ConfigError::Invalid(format!(
                "service.timeout_secs must be a positive finite number, got {}",
                self.service.timeout_secs
            )));
        }
        if self.run.population == 0 {
            return Err(ConfigError::Invalid("run.population must be at least 1".into()));
        }
        if self.run.sample_size == 0 {
            return Err(ConfigError::Invalid("run.sample_size must be at least 1".into()));
        }
        if self.run.features_length == 0 {
            return Err(ConfigError::Invalid(
                "run.features_length must be at least 1".into(),
            ));
        }
        if self.verify.top_n == 0 {
            return Err(ConfigError::Invalid("verify.top_n must be at least 1".into()));
        }
        if !(self.verify.threshold > 0.0 && self.verify.threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "verify.threshold must be in (0, 1], got {}",
                self.verify.threshold
            )));
        }
        Ok(())
    }
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Base address, e.g. http://localhost:8080
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout covering connect, send and receive
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Registration endpoint path
    #[serde(default = "default_register_path")]
    pub register_path: String,

    /// Similarity query endpoint path
    #[serde(default = "default_query_path")]
    pub query_path: String,
}

impl ServiceConfig {
    /// Request timeout. Values `validate` rejects fall back to the default.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_timeout_secs()))
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_register_path() -> String {
    "/add_person".to_string()
}

fn default_query_path() -> String {
    "/get_similar_person".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            register_path: default_register_path(),
            query_path: default_query_path(),
        }
    }
}

/// Run sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Identities generated and ingested
    #[serde(default = "default_population")]
    pub population: usize,

    /// Identities sampled for verification (clamped to population)
    #[serde(default = "default_population")]
    pub sample_size: usize,

    /// Feature vector length
    #[serde(default = "default_features_length")]
    pub features_length: usize,

    /// Ingestion worker pool size
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Seed for identity generation and sampling; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_population() -> usize {
    5
}

fn default_features_length() -> usize {
    FEATURES_LENGTH
}

fn default_max_workers() -> usize {
    20
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            population: default_population(),
            sample_size: default_population(),
            features_length: default_features_length(),
            max_workers: default_max_workers(),
            seed: None,
        }
    }
}

/// How the harness waits for the service to index new writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// Sleep for `delay_ms`
    #[default]
    Fixed,
    /// Re-query acknowledged identities until all self-match or `poll_timeout_ms` passes
    Poll,
}

/// Settle stage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettleConfig {
    #[serde(default)]
    pub mode: SettleMode,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_poll_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl SettleConfig {
    pub fn strategy(&self) -> SettleStrategy {
        match self.mode {
            SettleMode::Fixed => SettleStrategy::Fixed {
                delay: Duration::from_millis(self.delay_ms),
            },
            SettleMode::Poll => SettleStrategy::Poll {
                timeout: Duration::from_millis(self.poll_timeout_ms),
                interval: Duration::from_millis(self.poll_interval_ms),
            },
        }
    }
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            mode: SettleMode::Fixed,
            delay_ms: default_delay_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Self-match criteria.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyConfig {
    /// Candidates requested per query; only rank 0 is judged
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Rank-0 score must be strictly greater than this
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Run the service property probes after verification
    #[serde(default)]
    pub probes: bool,
}

fn default_top_n() -> usize {
    3
}

fn default_threshold() -> f64 {
    0.999
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            threshold: default_threshold(),
            probes: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.service.base_url, "http://localhost:8080");
        assert_eq!(config.run.population, 5);
        assert_eq!(config.run.sample_size, 5);
        assert_eq!(config.run.features_length, 256);
        assert_eq!(config.run.max_workers, 20);
        assert_eq!(config.verify.top_n, 3);
        assert_eq!(config.verify.threshold, 0.999);
        assert_eq!(
            config.settle.strategy(),
            SettleStrategy::Fixed {
                delay: Duration::from_secs(2)
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[service]
base_url = "http://10.0.0.5:9000"
timeout_secs = 2.5

[run]
population = 50
sample_size = 10
seed = 7

[settle]
mode = "poll"
poll_timeout_ms = 3000
"#;
        let config: HarnessConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.service.timeout(), Duration::from_millis(2500));
        assert_eq!(config.service.register_path, "/add_person");
        assert_eq!(config.run.population, 50);
        assert_eq!(config.run.seed, Some(7));
        assert_eq!(config.run.max_workers, 20);
        assert_eq!(
            config.settle.strategy(),
            SettleStrategy::Poll {
                timeout: Duration::from_secs(3),
                interval: Duration::from_millis(250)
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HarnessConfig::default();
        config.verify.threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HarnessConfig::default();
        config.run.features_length = 0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.verify.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.service.timeout_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.run.sample_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_finite_timeout_rejected() {
        for secs in [f64::INFINITY, f64::NAN, -1.0, 1e300] {
            let mut config = HarnessConfig::default();
            config.service.timeout_secs = secs;
            assert!(config.validate().is_err(), "accepted {}", secs);
            assert_eq!(config.service.timeout(), Duration::from_secs(10));
        }
    }

    #[test]
    fn test_save_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut config = HarnessConfig::default();
        config.run.seed = Some(11);
        config.verify.probes = true;
        config.save(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let found = HarnessConfig::find_and_load(&nested).unwrap();
        assert_eq!(found, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = HarnessConfig::load(Path::new("/nonexistent/selfmatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
