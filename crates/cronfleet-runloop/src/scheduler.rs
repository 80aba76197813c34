//! Scheduler loop: turns due cron occurrences into work items.
//!
//! Each tick, every job's watermark is swapped for the current minute with
//! one atomic `GETSET`. Only the process that observes a given previous
//! watermark enqueues the occurrences after it, so any number of schedulers
//! can share one store without duplicating work.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use cronfleet_config::{ErrorPolicy, JobDefinition, JobSet};
use cronfleet_protocols::DueInstant;
use cronfleet_queue::Queues;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::polling::{timed, PollingLoop};
use crate::report::TickReport;

pub struct Scheduler {
    jobs: Arc<JobSet>,
    queues: Queues,
    policy: ErrorPolicy,
    call_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        jobs: Arc<JobSet>,
        queues: Queues,
        policy: ErrorPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            queues,
            policy,
            call_timeout,
        }
    }

    /// Run one scheduling pass as of `now`.
    pub async fn tick_at(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<TickReport, DispatchError> {
        let now = truncate_to_minute(now);
        let mut report = TickReport::default();

        for job in self.jobs.iter() {
            if cancel.is_cancelled() {
                break;
            }
            match self.schedule_job(job, now).await {
                Ok(enqueued) => report.processed += enqueued,
                Err(e) => {
                    error!(job_id = %job.id, class = %e.class(), error = %e, "Scheduling failed");
                    report.settle(self.policy, e)?;
                }
            }
        }

        Ok(report)
    }

    async fn schedule_job(
        &self,
        job: &JobDefinition,
        now: DateTime<Utc>,
    ) -> Result<usize, DispatchError> {
        let previous = timed(
            self.call_timeout,
            "GETSET watermark",
            self.queues.advance_watermark(&job.id, now),
        )
        .await?;

        let Some(previous) = previous else {
            info!(job_id = %job.id, watermark = %now, "Initialized schedule watermark");
            return Ok(0);
        };
        if previous > now {
            warn!(
                job_id = %job.id,
                previous = %previous,
                now = %now,
                "Watermark is ahead of the local clock"
            );
        }

        let due = job.schedule.due_instants(previous, now);
        for instant in &due {
            let item = DueInstant::new(job.id.clone(), *instant);
            timed(
                self.call_timeout,
                "LPUSH work item",
                self.queues.enqueue_due(&item),
            )
            .await?;
            info!(
                job_id = %job.id,
                instance_id = %item.instance_id,
                due = %instant,
                "Enqueued due instant"
            );
        }
        if due.is_empty() {
            debug!(job_id = %job.id, "Nothing due");
        }

        Ok(due.len())
    }
}

#[async_trait]
impl PollingLoop for Scheduler {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    async fn tick(&self, cancel: &CancellationToken) -> Result<TickReport, DispatchError> {
        self.tick_at(Utc::now(), cancel).await
    }
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(instant)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
