//! Worker loop: claims work items and starts executions.
//!
//! Items are claimed with `RPOPLPUSH`, so each one reaches exactly one
//! worker. The template is described before the execution is started;
//! once an execution runs, the only step left is pushing its watch record.
//! An item that fails transiently before that point goes back to the
//! producer end and the worker moves on to the next one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use cronfleet_config::{ErrorPolicy, JobDefinition, JobSet};
use cronfleet_protocols::{DueInstant, ExecutionPlatform, ExecutionRecord, TaskTemplate};
use cronfleet_queue::Queues;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::DispatchError;
use crate::polling::{timed, PollingLoop};
use crate::report::TickReport;

pub struct Worker {
    jobs: Arc<JobSet>,
    queues: Queues,
    platform: Arc<dyn ExecutionPlatform>,
    policy: ErrorPolicy,
    call_timeout: Duration,
}

impl Worker {
    pub fn new(
        jobs: Arc<JobSet>,
        queues: Queues,
        platform: Arc<dyn ExecutionPlatform>,
        policy: ErrorPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            queues,
            platform,
            policy,
            call_timeout,
        }
    }

    /// Claim and dispatch the items waiting at tick start.
    ///
    /// Items returned to the queue go behind the rest, so the bound keeps a
    /// failing item from being claimed twice in one tick.
    async fn drain(&self, cancel: &CancellationToken) -> Result<TickReport, DispatchError> {
        let mut report = TickReport::default();

        let pending = timed(
            self.call_timeout,
            "LLEN work queue",
            self.queues.work_len(),
        )
        .await;
        let pending = match pending {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Failed to read work queue length");
                report.settle(self.policy, e)?;
                return Ok(report);
            }
        };

        for _ in 0..pending {
            if cancel.is_cancelled() {
                break;
            }
            let claimed = timed(
                self.call_timeout,
                "RPOPLPUSH work item",
                self.queues.claim_due(),
            )
            .await;
            let item = match claimed {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    error!(class = %e.class(), error = %e, "Failed to claim work item");
                    let transient = e.is_transient();
                    report.settle(self.policy, e)?;
                    if transient {
                        break;
                    }
                    continue;
                }
            };

            match self.dispatch(&item).await {
                Ok(()) => report.processed += 1,
                Err(Failure::BeforeStart(e)) if e.is_transient() => {
                    warn!(
                        job_id = %item.job_id,
                        instance_id = %item.instance_id,
                        error = %e,
                        "Dispatch failed, returning item to the queue"
                    );
                    self.requeue(&item, &mut report).await;
                    report.settle(self.policy, e)?;
                }
                Err(Failure::BeforeStart(e)) => {
                    error!(
                        job_id = %item.job_id,
                        instance_id = %item.instance_id,
                        class = %e.class(),
                        error = %e,
                        "Dispatch failed, dropping item"
                    );
                    report.settle(self.policy, e)?;
                }
                Err(Failure::AfterStart(e)) => {
                    error!(
                        job_id = %item.job_id,
                        instance_id = %item.instance_id,
                        error = %e,
                        "Execution started but its watch record was not stored"
                    );
                    report.settle(self.policy, e)?;
                }
            }
        }

        Ok(report)
    }

    async fn dispatch(&self, item: &DueInstant) -> Result<(), Failure> {
        let (job, template) = self.prepare(item).await.map_err(Failure::BeforeStart)?;

        let request = job.launch_request(&template.revision);
        let handle = timed(
            self.call_timeout,
            "RunTask",
            self.platform.start_execution(&request),
        )
        .await
        .map_err(Failure::BeforeStart)?;
        info!(
            job_id = %item.job_id,
            instance_id = %item.instance_id,
            execution_id = %handle.task_id(),
            revision = %template.revision,
            "Execution started"
        );

        let record = ExecutionRecord {
            job_id: item.job_id.clone(),
            instance_id: item.instance_id.clone(),
            template,
            handle,
        };
        timed(
            self.call_timeout,
            "RPUSH watch record",
            self.queues.push_watch(&record),
        )
        .await
        .map_err(Failure::AfterStart)
    }

    /// Everything that can fail without side effects on the platform.
    async fn prepare(
        &self,
        item: &DueInstant,
    ) -> Result<(Arc<JobDefinition>, TaskTemplate), DispatchError> {
        timed(
            self.call_timeout,
            "SET process marker",
            self.queues.mark_process(&item.instance_id, Utc::now()),
        )
        .await?;

        let job = self
            .jobs
            .get(&item.job_id)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownJob(item.job_id.clone()))?;

        let revision = timed(
            self.call_timeout,
            "ListTaskDefinitions",
            self.platform.latest_revision(&job.task_definition),
        )
        .await?
        .ok_or_else(|| DispatchError::NoRevision(job.task_definition.clone()))?;

        let template = timed(
            self.call_timeout,
            "DescribeTaskDefinition",
            self.platform.describe_template(&revision),
        )
        .await?;

        Ok((job, template))
    }

    async fn requeue(&self, item: &DueInstant, report: &mut TickReport) {
        let requeued = timed(
            self.call_timeout,
            "LPUSH work item",
            self.queues.requeue_due(item),
        )
        .await;
        match requeued {
            Ok(()) => report.requeued += 1,
            Err(e) => error!(
                job_id = %item.job_id,
                instance_id = %item.instance_id,
                error = %e,
                "Failed to return item to the queue, it stays on the backup list"
            ),
        }
    }
}

/// Where in the dispatch sequence an item failed.
enum Failure {
    BeforeStart(DispatchError),
    AfterStart(DispatchError),
}

#[async_trait]
impl PollingLoop for Worker {
    fn name(&self) -> &'static str {
        "worker"
    }

    async fn tick(&self, cancel: &CancellationToken) -> Result<TickReport, DispatchError> {
        self.drain(cancel).await
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
