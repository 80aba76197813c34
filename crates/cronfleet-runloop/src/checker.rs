//! Checker loop: polls started executions until they stop.
//!
//! Each tick pops at most as many records as the watch queue held when the
//! tick began. A record that is still running goes back to the tail and is
//! looked at again on the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cronfleet_config::ErrorPolicy;
use cronfleet_protocols::notification::UNSUPPORTED_LOG_DRIVER;
use cronfleet_protocols::{
    ExecutionPlatform, ExecutionRecord, ExecutionStatus, LogSource, NotificationPayload, Notifier,
    NotifyError,
};
use cronfleet_queue::Queues;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::polling::{timed, PollingLoop};
use crate::report::TickReport;

/// Log text for an `awslogs` container missing its group or stream prefix.
const INCOMPLETE_LOG_CONFIGURATION: &str = "log configuration incomplete";

pub struct Checker {
    queues: Queues,
    platform: Arc<dyn ExecutionPlatform>,
    logs: Arc<dyn LogSource>,
    sinks: Vec<Arc<dyn Notifier>>,
    policy: ErrorPolicy,
    call_timeout: Duration,
    log_lines: u32,
}

enum Observation {
    Running(String),
    Finished(NotificationPayload),
}

impl Checker {
    pub fn new(
        queues: Queues,
        platform: Arc<dyn ExecutionPlatform>,
        logs: Arc<dyn LogSource>,
        sinks: Vec<Arc<dyn Notifier>>,
        policy: ErrorPolicy,
        call_timeout: Duration,
        log_lines: u32,
    ) -> Self {
        Self {
            queues,
            platform,
            logs,
            sinks,
            policy,
            call_timeout,
            log_lines,
        }
    }

    async fn drain(&self, cancel: &CancellationToken) -> Result<TickReport, DispatchError> {
        let mut report = TickReport::default();

        let pending = timed(
            self.call_timeout,
            "LLEN watch queue",
            self.queues.watch_len(),
        )
        .await;
        let pending = match pending {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Failed to read watch queue length");
                report.settle(self.policy, e)?;
                return Ok(report);
            }
        };

        for _ in 0..pending {
            if cancel.is_cancelled() {
                break;
            }
            let popped = timed(
                self.call_timeout,
                "LPOP watch record",
                self.queues.pop_watch(),
            )
            .await;
            let record = match popped {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    error!(class = %e.class(), error = %e, "Failed to take watch record");
                    let transient = e.is_transient();
                    report.settle(self.policy, e)?;
                    if transient {
                        break;
                    }
                    continue;
                }
            };

            match self.observe(&record).await {
                Ok(Observation::Running(status)) => {
                    debug!(
                        job_id = %record.job_id,
                        execution_id = %record.handle.task_id(),
                        status = %status,
                        "Execution still running"
                    );
                    if self.put_back(&record).await {
                        report.requeued += 1;
                    }
                }
                Ok(Observation::Finished(payload)) => {
                    info!(
                        job_id = %payload.job_id,
                        execution_id = %payload.execution_id,
                        stop_code = payload.stop_code.as_deref().unwrap_or(""),
                        stopped_reason = payload.stopped_reason.as_deref().unwrap_or(""),
                        "Execution finished"
                    );
                    report.processed += 1;
                    self.deliver(&payload, &mut report).await?;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        job_id = %record.job_id,
                        execution_id = %record.handle.task_id(),
                        error = %e,
                        "Status check failed, will retry"
                    );
                    if self.put_back(&record).await {
                        report.requeued += 1;
                    }
                    report.settle(self.policy, e)?;
                }
                Err(e) => {
                    error!(
                        job_id = %record.job_id,
                        execution_id = %record.handle.task_id(),
                        class = %e.class(),
                        error = %e,
                        "Status check failed, dropping record"
                    );
                    report.settle(self.policy, e)?;
                }
            }
        }

        Ok(report)
    }

    async fn observe(&self, record: &ExecutionRecord) -> Result<Observation, DispatchError> {
        let status = timed(
            self.call_timeout,
            "DescribeTasks",
            self.platform.describe_execution(&record.handle),
        )
        .await?;

        if !status.is_terminal() {
            return Ok(Observation::Running(status.last_status));
        }
        self.build_payload(record, status).await.map(Observation::Finished)
    }

    async fn build_payload(
        &self,
        record: &ExecutionRecord,
        status: ExecutionStatus,
    ) -> Result<NotificationPayload, DispatchError> {
        let mut payload = NotificationPayload {
            job_id: record.job_id.clone(),
            execution_id: record.handle.task_id().to_string(),
            status: status.last_status,
            stop_code: status.stop_code,
            stopping_at: status.stopping_at,
            stopped_at: status.stopped_at,
            stopped_reason: status.stopped_reason,
            containers: Default::default(),
        };

        for container in status.containers {
            if let Some(reason) = container.reason {
                payload.container_mut(&container.name).short_message = Some(reason);
            }
        }

        for container in &record.template.containers {
            let log = if !container.uses_awslogs() {
                UNSUPPORTED_LOG_DRIVER.to_string()
            } else {
                match (container.log_group(), container.log_stream_name(&record.handle)) {
                    (Some(group), Some(stream)) => self.fetch_log(group, &stream).await?,
                    _ => INCOMPLETE_LOG_CONFIGURATION.to_string(),
                }
            };
            payload.container_mut(&container.name).log = log;
        }

        Ok(payload)
    }

    /// Recent lines of one stream, newline-terminated.
    ///
    /// Only transient failures are returned; any other failure becomes the
    /// log text so the notification still goes out.
    async fn fetch_log(&self, group: &str, stream: &str) -> Result<String, DispatchError> {
        let fetched = timed(
            self.call_timeout,
            "GetLogEvents",
            self.logs.recent_lines(group, stream, self.log_lines),
        )
        .await;
        match fetched {
            Ok(lines) => Ok(lines.iter().map(|line| format!("{}\n", line)).collect()),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                warn!(log_group = group, log_stream = stream, error = %e, "Log retrieval failed");
                Ok(format!("log unavailable: {}", e))
            }
        }
    }

    /// Send a payload to every sink. One failing sink does not stop the others.
    async fn deliver(
        &self,
        payload: &NotificationPayload,
        report: &mut TickReport,
    ) -> Result<(), DispatchError> {
        let mut first_failure = None;

        for sink in &self.sinks {
            let source = match tokio::time::timeout(self.call_timeout, sink.notify(payload)).await
            {
                Ok(Ok(())) => {
                    debug!(sink = sink.name(), job_id = %payload.job_id, "Notification sent");
                    continue;
                }
                Ok(Err(e)) => e,
                Err(_) => {
                    NotifyError::Request(format!("timed out after {:?}", self.call_timeout))
                }
            };
            let failure = DispatchError::Sink {
                sink: sink.name().to_string(),
                source,
            };
            warn!(
                job_id = %payload.job_id,
                execution_id = %payload.execution_id,
                error = %failure,
                "Notification failed"
            );
            report.record(&failure);
            first_failure.get_or_insert(failure);
        }

        match (first_failure, self.policy) {
            (Some(failure), ErrorPolicy::FailFast) => Err(failure),
            _ => Ok(()),
        }
    }

    async fn put_back(&self, record: &ExecutionRecord) -> bool {
        let pushed = timed(
            self.call_timeout,
            "RPUSH watch record",
            self.queues.push_watch(record),
        )
        .await;
        match pushed {
            Ok(()) => true,
            Err(e) => {
                error!(
                    job_id = %record.job_id,
                    execution_id = %record.handle.task_id(),
                    error = %e,
                    "Failed to return record to the watch queue, execution is no longer watched"
                );
                false
            }
        }
    }
}

#[async_trait]
impl PollingLoop for Checker {
    fn name(&self) -> &'static str {
        "checker"
    }

    async fn tick(&self, cancel: &CancellationToken) -> Result<TickReport, DispatchError> {
        self.drain(cancel).await
    }
}

#[cfg(test)]
#[path = "checker_tests.rs"]
mod tests;
