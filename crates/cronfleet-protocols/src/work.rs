//! Items that travel through the work and watch queues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::platform::{ExecutionHandle, TaskTemplate};

/// One scheduled firing of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueInstant {
    /// The occurrence this item was created for.
    pub time: DateTime<Utc>,
    /// Job definition id.
    pub job_id: String,
    /// Unique id of this instance.
    pub instance_id: String,
}

impl DueInstant {
    /// Create an item with a fresh instance id.
    pub fn new(job_id: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            time,
            job_id: job_id.into(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }
}

/// A started execution waiting to reach a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub job_id: String,
    pub instance_id: String,
    /// Resolved template, kept for the container and log layout.
    pub template: TaskTemplate,
    pub handle: ExecutionHandle,
}
