//! Configuration management for sherlock
//!
//! Loads the TOML configuration file, applies `SHERLOCK_*` environment
//! overrides and validates the result before anything is built from it.

use crate::error::{Result, SherlockError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub scheduler: SchedulerConfig,
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Job scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Initial capacity of the job queue (it grows past this)
    pub queue_capacity: usize,
    /// Worker threads in the detection pool, 0 for one per core
    #[serde(default)]
    pub pool_threads: usize,
}

/// Detection task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Largest worker range run sequentially before splitting
    pub split_threshold: usize,
}

/// Match scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Largest fraction of the corpus a match group may touch and be kept
    pub common_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber` filter directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sherlock=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SherlockError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SherlockError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides()?;

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SherlockError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SherlockError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SHERLOCK_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let overrides: Vec<(String, String)> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix("SHERLOCK_")
                    .map(|config_key| (config_key.to_string(), value))
            })
            .collect();

        for (key, value) in overrides {
            self.set_value_from_env(&key, &value)?;
        }
        Ok(())
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "SCHEDULER__QUEUE_CAPACITY" => {
                self.scheduler.queue_capacity = parse_value(path, value)?;
            }
            "SCHEDULER__POOL_THREADS" => {
                self.scheduler.pool_threads = parse_value(path, value)?;
            }
            "DETECTION__SPLIT_THRESHOLD" => {
                self.detection.split_threshold = parse_value(path, value)?;
            }
            "SCORING__COMMON_THRESHOLD" => {
                self.scoring.common_threshold = parse_value(path, value)?;
            }
            "LOGGING__FILTER" => {
                self.logging.filter = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            SherlockError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("sherlock").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| SherlockError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            scheduler: SchedulerConfig {
                queue_capacity: 10,
                pool_threads: 0,
            },
            detection: DetectionConfig { split_threshold: 4 },
            scoring: ScoringConfig {
                common_threshold: 0.3,
            },
            logging: LoggingConfig::default(),
        }
    }
}
