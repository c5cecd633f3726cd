use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::core::error::{CacheError, Result};

/// Main cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Levels ordered fastest to slowest; the last one is authoritative
    pub levels: Vec<LevelConfig>,
    /// Background TTL sweep interval; `None` disables the sweeper
    #[serde(default)]
    pub sweep_interval_ms: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub capacity: usize,
    #[serde(default)]
    pub default_ttl_secs: Option<u64>,
}

impl LevelConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Install a global tracing subscriber
    ///
    /// `RUST_LOG` takes precedence over the configured level. Fails instead of panicking
    /// when a subscriber is already installed.
    pub fn init(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))?;

        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        match self.format.as_str() {
            "json" => builder
                .json()
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e)),
            _ => builder
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e)),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelConfig {
                    name: "l1".to_string(),
                    capacity: 1_000,
                    default_ttl_secs: Some(60),
                },
                LevelConfig {
                    name: "l2".to_string(),
                    capacity: 10_000,
                    default_ttl_secs: Some(600),
                },
            ],
            sweep_interval_ms: Some(1_000),
            logging: LoggingConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        Ok(config)
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: CacheConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no cache can be built from
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(CacheError::InvalidConfig(
                "at least one level is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for level in &self.levels {
            if level.capacity == 0 {
                return Err(CacheError::InvalidCapacity(level.name.clone()));
            }
            if !names.insert(level.name.as_str()) {
                return Err(CacheError::InvalidConfig(format!(
                    "duplicate level name '{}'",
                    level.name
                )));
            }
        }

        if self.sweep_interval_ms == Some(0) {
            return Err(CacheError::InvalidConfig(
                "sweep_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms.map(Duration::from_millis)
    }
}
