//! ECS task API client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_ecs::primitives::DateTime as SmithyDateTime;
use aws_sdk_ecs::types::{LaunchType, SortOrder, Task};
use aws_sdk_ecs::Client;
use chrono::{DateTime, Utc};
use cronfleet_protocols::{
    ContainerDefinition, ContainerState, ExecutionHandle, ExecutionPlatform, ExecutionStatus,
    LaunchRequest, LogConfiguration, PlatformError, TaskTemplate,
};
use tracing::debug;

use crate::params::{network_configuration, task_override};
use crate::sdk::platform_error;

/// ECS-backed [`ExecutionPlatform`].
#[derive(Debug, Clone)]
pub struct EcsPlatform {
    client: Client,
}

impl EcsPlatform {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutionPlatform for EcsPlatform {
    async fn latest_revision(&self, family: &str) -> Result<Option<String>, PlatformError> {
        let output = self
            .client
            .list_task_definitions()
            .family_prefix(family)
            .sort(SortOrder::Desc)
            .max_results(1)
            .send()
            .await
            .map_err(|e| platform_error("ListTaskDefinitions", e))?;

        Ok(output
            .task_definition_arns()
            .first()
            .map(|arn| revision_from_arn(arn).to_string()))
    }

    async fn describe_template(&self, revision: &str) -> Result<TaskTemplate, PlatformError> {
        let output = self
            .client
            .describe_task_definition()
            .task_definition(revision)
            .send()
            .await
            .map_err(|e| platform_error("DescribeTaskDefinition", e))?;

        let definition = output.task_definition().ok_or_else(|| {
            PlatformError::InvalidResponse(format!("no task definition for {}", revision))
        })?;

        let containers = definition
            .container_definitions()
            .iter()
            .map(|c| ContainerDefinition {
                name: c.name().unwrap_or_default().to_string(),
                log_configuration: c.log_configuration().map(|log| LogConfiguration {
                    driver: log.log_driver().as_str().to_string(),
                    options: log
                        .options()
                        .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_else(BTreeMap::new),
                }),
            })
            .collect();

        Ok(TaskTemplate {
            revision: revision.to_string(),
            containers,
        })
    }

    async fn start_execution(
        &self,
        request: &LaunchRequest,
    ) -> Result<ExecutionHandle, PlatformError> {
        let network = network_configuration(&request.network_configuration)?;
        let overrides = task_override(&request.overrides)?;

        let output = self
            .client
            .run_task()
            .cluster(&request.cluster)
            .task_definition(&request.revision)
            .set_launch_type(request.launch_type.as_deref().map(LaunchType::from))
            .set_network_configuration(network)
            .set_overrides(overrides)
            .send()
            .await
            .map_err(|e| platform_error("RunTask", e))?;

        if let Some(failure) = output.failures().first() {
            return Err(run_task_failure(
                failure.reason().unwrap_or("unknown reason"),
                failure.arn().unwrap_or(&request.revision),
            ));
        }

        let task = output.tasks().first().ok_or_else(|| {
            PlatformError::InvalidResponse("RunTask returned no task".to_string())
        })?;
        let handle = handle_of(task)?;
        debug!(task_arn = %handle.task_arn, cluster = %request.cluster, "Task started");
        Ok(handle)
    }

    async fn describe_execution(
        &self,
        handle: &ExecutionHandle,
    ) -> Result<ExecutionStatus, PlatformError> {
        let output = self
            .client
            .describe_tasks()
            .cluster(&handle.cluster_arn)
            .tasks(&handle.task_arn)
            .send()
            .await
            .map_err(|e| platform_error("DescribeTasks", e))?;

        let Some(task) = output.tasks().first() else {
            let reason = output
                .failures()
                .first()
                .and_then(|f| f.reason())
                .unwrap_or("task not returned");
            return Err(PlatformError::NotFound(format!(
                "{}: {}",
                handle.task_arn, reason
            )));
        };

        Ok(status_of(task))
    }
}

/// `family:revision` part of a task definition ARN.
fn revision_from_arn(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

/// Only capacity shortfalls (`RESOURCE:CPU`, `RESOURCE:MEMORY`, ...) can
/// clear up on their own.
fn run_task_failure(reason: &str, arn: &str) -> PlatformError {
    let message = format!("{} ({})", reason, arn);
    if reason.starts_with("RESOURCE:") {
        PlatformError::Rejected(message)
    } else {
        PlatformError::Unplaceable(message)
    }
}

fn handle_of(task: &Task) -> Result<ExecutionHandle, PlatformError> {
    match (task.task_arn(), task.cluster_arn()) {
        (Some(task_arn), Some(cluster_arn)) => Ok(ExecutionHandle {
            task_arn: task_arn.to_string(),
            cluster_arn: cluster_arn.to_string(),
        }),
        _ => Err(PlatformError::InvalidResponse(
            "task without task or cluster ARN".to_string(),
        )),
    }
}

fn status_of(task: &Task) -> ExecutionStatus {
    ExecutionStatus {
        last_status: task.last_status().unwrap_or_default().to_string(),
        stop_code: task.stop_code().map(|c| c.as_str().to_string()),
        stopping_at: task.stopping_at().and_then(to_chrono),
        stopped_at: task.stopped_at().and_then(to_chrono),
        stopped_reason: task.stopped_reason().map(str::to_string),
        containers: task
            .containers()
            .iter()
            .map(|c| ContainerState {
                name: c.name().unwrap_or_default().to_string(),
                reason: c.reason().map(str::to_string),
            })
            .collect(),
    }
}

fn to_chrono(at: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.secs(), at.subsec_nanos())
}
