//! Error types for the loops.

use std::time::Duration;

use cronfleet_protocols::{ErrorClass, NotifyError, PlatformError};
use cronfleet_queue::StoreError;
use thiserror::Error;

/// Failure of one unit of work inside a loop tick.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A work item names a job that is not loaded.
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The template family has no registered revision.
    #[error("No revision found for task definition family '{0}'")]
    NoRevision(String),

    #[error("Sink '{sink}' failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: NotifyError,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl DispatchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DispatchError::Store(e) => e.class(),
            DispatchError::Platform(e) => e.class(),
            DispatchError::UnknownJob(_) | DispatchError::NoRevision(_) => {
                ErrorClass::Configuration
            }
            DispatchError::Sink { source, .. } => source.class(),
            DispatchError::Timeout { .. } => ErrorClass::Transient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Why a loop stopped for good.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("{name} loop failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: DispatchError,
    },

    #[error("{name} loop panicked {restarts} times, giving up")]
    Panicked { name: &'static str, restarts: u32 },
}
