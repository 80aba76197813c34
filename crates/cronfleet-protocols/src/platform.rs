//! Execution platform and log retrieval protocols.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// The only logging driver whose output can be fetched.
pub const AWSLOGS_DRIVER: &str = "awslogs";

/// Log option naming the log group.
pub const AWSLOGS_GROUP_OPTION: &str = "awslogs-group";

/// Log option naming the stream prefix.
pub const AWSLOGS_STREAM_PREFIX_OPTION: &str = "awslogs-stream-prefix";

/// Status after which an execution never changes again.
pub const TERMINAL_STATUS: &str = "STOPPED";

/// Logging setup of one container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogConfiguration {
    pub driver: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// A container as declared in a task template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    #[serde(default)]
    pub log_configuration: Option<LogConfiguration>,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_configuration: None,
        }
    }

    /// Attach an `awslogs` configuration.
    pub fn with_awslogs(mut self, group: &str, stream_prefix: &str) -> Self {
        let mut options = BTreeMap::new();
        options.insert(AWSLOGS_GROUP_OPTION.to_string(), group.to_string());
        options.insert(
            AWSLOGS_STREAM_PREFIX_OPTION.to_string(),
            stream_prefix.to_string(),
        );
        self.log_configuration = Some(LogConfiguration {
            driver: AWSLOGS_DRIVER.to_string(),
            options,
        });
        self
    }

    pub fn uses_awslogs(&self) -> bool {
        self.log_configuration
            .as_ref()
            .is_some_and(|c| c.driver == AWSLOGS_DRIVER)
    }

    pub fn log_group(&self) -> Option<&str> {
        self.log_option(AWSLOGS_GROUP_OPTION)
    }

    pub fn stream_prefix(&self) -> Option<&str> {
        self.log_option(AWSLOGS_STREAM_PREFIX_OPTION)
    }

    fn log_option(&self, key: &str) -> Option<&str> {
        self.log_configuration
            .as_ref()
            .and_then(|c| c.options.get(key))
            .map(String::as_str)
    }

    /// Stream name `<prefix>/<container>/<task id>` used by the `awslogs` driver.
    pub fn log_stream_name(&self, handle: &ExecutionHandle) -> Option<String> {
        let prefix = self.stream_prefix()?;
        Some(format!("{}/{}/{}", prefix, self.name, handle.task_id()))
    }
}

/// A resolved task template revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// `family:revision` reference.
    pub revision: String,
    pub containers: Vec<ContainerDefinition>,
}

/// Platform identifiers of a started execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionHandle {
    pub task_arn: String,
    pub cluster_arn: String,
}

impl ExecutionHandle {
    /// Final `/`-separated segment of the task ARN.
    pub fn task_id(&self) -> &str {
        self.task_arn.rsplit('/').next().unwrap_or(&self.task_arn)
    }
}

/// Parameters for starting one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub cluster: String,
    /// `family:revision` reference to launch.
    pub revision: String,
    pub launch_type: Option<String>,
    /// Opaque network attachment spec, passed through to the platform.
    pub network_configuration: serde_json::Value,
    /// Opaque parameter overrides, passed through to the platform.
    pub overrides: serde_json::Value,
}

/// Per-container state reported with an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    pub name: String,
    pub reason: Option<String>,
}

/// Current state of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub last_status: String,
    pub stop_code: Option<String>,
    pub stopping_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stopped_reason: Option<String>,
    pub containers: Vec<ContainerState>,
}

impl ExecutionStatus {
    /// A status that is still in progress.
    pub fn running(last_status: impl Into<String>) -> Self {
        Self {
            last_status: last_status.into(),
            stop_code: None,
            stopping_at: None,
            stopped_at: None,
            stopped_reason: None,
            containers: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.last_status == TERMINAL_STATUS
    }
}

/// Container execution platform.
#[async_trait]
pub trait ExecutionPlatform: Send + Sync {
    /// Most recent revision reference of a template family, if any exists.
    async fn latest_revision(&self, family: &str) -> Result<Option<String>, PlatformError>;

    /// Full template for a revision reference.
    async fn describe_template(&self, revision: &str) -> Result<TaskTemplate, PlatformError>;

    /// Start one execution.
    async fn start_execution(
        &self,
        request: &LaunchRequest,
    ) -> Result<ExecutionHandle, PlatformError>;

    /// Current status of an execution.
    async fn describe_execution(
        &self,
        handle: &ExecutionHandle,
    ) -> Result<ExecutionStatus, PlatformError>;
}

/// Log store holding container output.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// The most recent `limit` lines of a stream, oldest first.
    async fn recent_lines(
        &self,
        group: &str,
        stream: &str,
        limit: u32,
    ) -> Result<Vec<String>, PlatformError>;
}
