//! Store errors.

use cronfleet_protocols::ErrorClass;
use thiserror::Error;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// A command was sent but failed.
    #[error("Store command failed: {0}")]
    Command(String),

    /// A stored item is not valid JSON for its queue.
    #[error("Undecodable item in {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored instant is not RFC 3339.
    #[error("Invalid timestamp '{value}' in {key}")]
    Timestamp { key: String, value: String },
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::Connection(_) | StoreError::Command(_) => ErrorClass::Transient,
            StoreError::Codec { .. } | StoreError::Timestamp { .. } => ErrorClass::Corrupt,
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}
