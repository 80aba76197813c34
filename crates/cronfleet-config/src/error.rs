//! Configuration errors.

use cronfleet_protocols::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Unknown notification driver: {0}")]
    UnknownDriver(String),

    #[error("Invalid schedule for job '{job}': {source}")]
    Schedule {
        job: String,
        #[source]
        source: ScheduleError,
    },

    #[error("No job definitions found in {0}")]
    NoJobs(String),

    #[error("Duplicate job id: {0}")]
    DuplicateJob(String),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yml::Error,
    },

    #[error("Configuration is invalid: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yml::Error),
}
