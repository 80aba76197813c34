//! Errors raised by external collaborators.

use std::fmt;

use thiserror::Error;

/// How a failure should be treated by the loop that hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Network or availability failure. The unit of work can be retried.
    Transient,
    /// A persisted payload could not be decoded.
    Corrupt,
    /// A job, template family or launch parameter cannot be resolved.
    Configuration,
    /// A notification sink failed to accept a payload.
    Delivery,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Corrupt => write!(f, "corrupt"),
            ErrorClass::Configuration => write!(f, "configuration"),
            ErrorClass::Delivery => write!(f, "delivery"),
        }
    }
}

/// Execution platform and log retrieval errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Platform request failed: {0}")]
    Request(String),

    /// The platform had no capacity for the launch right now.
    #[error("Launch rejected by platform: {0}")]
    Rejected(String),

    /// The platform refused the launch for a reason retrying won't change.
    #[error("Launch cannot be placed: {0}")]
    Unplaceable(String),

    #[error("Platform denied request: {0}")]
    Denied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid launch parameters: {0}")]
    InvalidParameters(String),

    #[error("Unexpected platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PlatformError::Request(_) | PlatformError::Rejected(_) => ErrorClass::Transient,
            PlatformError::NotFound(_)
            | PlatformError::InvalidParameters(_)
            | PlatformError::Unplaceable(_)
            | PlatformError::Denied(_) => ErrorClass::Configuration,
            PlatformError::InvalidResponse(_) => ErrorClass::Corrupt,
        }
    }
}

/// Notification sink errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(String),

    #[error("Notification rejected by {sink}: {message}")]
    Rejected { sink: String, message: String },

    #[error("Invalid notifier configuration: {0}")]
    Config(String),
}

impl NotifyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            NotifyError::Config(_) => ErrorClass::Configuration,
            _ => ErrorClass::Delivery,
        }
    }
}
