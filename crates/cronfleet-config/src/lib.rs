//! # cronfleet Config
//!
//! Service configuration and job definitions, both read from YAML files with
//! `${VAR}` environment expansion.

mod error;
mod jobs;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use jobs::{JobDefinition, JobSet};
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
