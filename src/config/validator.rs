use crate::config::Config;
use crate::error::{Result, SherlockError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_scheduler(config, &mut errors);
        Self::validate_detection(config, &mut errors);
        Self::validate_scoring(config, &mut errors);
        Self::validate_logging(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SherlockError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_scheduler(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.scheduler.queue_capacity == 0 {
            errors.push(ValidationError::new(
                "scheduler.queue_capacity",
                "Queue capacity must be greater than 0",
            ));
        }

        if config.scheduler.pool_threads > 1024 {
            errors.push(ValidationError::new(
                "scheduler.pool_threads",
                format!(
                    "Pool threads must be at most 1024, got {}",
                    config.scheduler.pool_threads
                ),
            ));
        }
    }

    fn validate_detection(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.detection.split_threshold == 0 {
            errors.push(ValidationError::new(
                "detection.split_threshold",
                "Split threshold must be at least 1",
            ));
        }
    }

    fn validate_scoring(config: &Config, errors: &mut Vec<ValidationError>) {
        let threshold = config.scoring.common_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            errors.push(ValidationError::new(
                "scoring.common_threshold",
                format!("Common threshold must be in (0.0, 1.0], got {}", threshold),
            ));
        }
    }

    fn validate_logging(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.logging.filter.trim().is_empty() {
            errors.push(ValidationError::new(
                "logging.filter",
                "Log filter cannot be empty",
            ));
        }
    }
}
