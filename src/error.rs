use crate::model::FileId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sherlock engine
#[derive(Error, Debug)]
pub enum SherlockError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// A match record's payload and location sequences disagree in length
    #[error("Match record misaligned: {objects} objects, {locations} locations")]
    RecordMisaligned { objects: usize, locations: usize },

    /// A detector worker failed while executing
    #[error("Detector worker '{worker}' failed: {message}")]
    Worker { worker: String, message: String },

    /// A scheduled job panicked inside its action
    #[error("Job panicked: {0}")]
    JobPanicked(String),

    /// A scheduled job was dropped before it ran (scheduler shut down)
    #[error("Job cancelled before completion")]
    JobCancelled,

    /// The scheduler no longer accepts work
    #[error("Scheduler is shut down")]
    SchedulerShutdown,

    /// Scoring was requested for a file outside the current match group
    #[error("File {0} is not part of the current match group")]
    FileNotInGroup(FileId),

    /// No detector registered under this id
    #[error("Unknown detector: {0}")]
    UnknownDetector(String),

    /// A detector id was registered twice
    #[error("Detector already registered: {0}")]
    DuplicateDetector(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SherlockError {
    /// Build a worker failure from any displayable cause
    pub fn worker(worker: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Worker {
            worker: worker.into(),
            message: message.to_string(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for sherlock operations
pub type Result<T> = std::result::Result<T, SherlockError>;
