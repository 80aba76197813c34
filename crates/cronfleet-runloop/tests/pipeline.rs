//! End-to-end runs of scheduler, worker and checker over one in-memory store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cronfleet_config::{ErrorPolicy, JobDefinition, JobSet};
use cronfleet_protocols::{
    ContainerDefinition, ExecutionHandle, ExecutionPlatform, ExecutionStatus, LaunchRequest,
    LogSource, NotificationPayload, Notifier, NotifyError, PlatformError, TaskTemplate,
};
use cronfleet_queue::{KeySpace, MemoryStore, Queues};
use cronfleet_runloop::{
    CancellationToken, Checker, DispatchError, LoopSettings, PollingLoop, Scheduler, Supervisor,
    Worker,
};
use parking_lot::Mutex;

const TIMEOUT: Duration = Duration::from_secs(5);

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn jobs() -> Arc<JobSet> {
    let report = JobDefinition::from_yaml(
        "report",
        "Cron: \"* * * * *\"\nCluster: batch\nTaskDefinition: report\n",
    )
    .unwrap();
    let nightly = JobDefinition::from_yaml(
        "nightly",
        "Cron: \"0 0 * * *\"\nCluster: batch\nTaskDefinition: nightly\n",
    )
    .unwrap();
    Arc::new(JobSet::new(vec![report, nightly]).unwrap())
}

/// Every task runs for one status poll, then stops.
#[derive(Default)]
struct OnePollPlatform {
    launched: Mutex<Vec<LaunchRequest>>,
    polls: Mutex<HashMap<String, usize>>,
}

#[async_trait]
impl ExecutionPlatform for OnePollPlatform {
    async fn latest_revision(&self, family: &str) -> Result<Option<String>, PlatformError> {
        Ok(Some(format!("{}:1", family)))
    }

    async fn describe_template(&self, revision: &str) -> Result<TaskTemplate, PlatformError> {
        Ok(TaskTemplate {
            revision: revision.to_string(),
            containers: vec![ContainerDefinition::new("main").with_awslogs("/jobs", "jobs")],
        })
    }

    async fn start_execution(
        &self,
        request: &LaunchRequest,
    ) -> Result<ExecutionHandle, PlatformError> {
        let mut launched = self.launched.lock();
        launched.push(request.clone());
        Ok(ExecutionHandle {
            task_arn: format!("arn:aws:ecs:eu-west-1:1:task/batch/t{}", launched.len()),
            cluster_arn: "arn:aws:ecs:eu-west-1:1:cluster/batch".to_string(),
        })
    }

    async fn describe_execution(
        &self,
        handle: &ExecutionHandle,
    ) -> Result<ExecutionStatus, PlatformError> {
        let mut polls = self.polls.lock();
        let count = polls.entry(handle.task_arn.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return Ok(ExecutionStatus::running("RUNNING"));
        }
        let mut status = ExecutionStatus::running("STOPPED");
        status.stop_code = Some("EssentialContainerExited".to_string());
        Ok(status)
    }
}

struct StaticLogs;

#[async_trait]
impl LogSource for StaticLogs {
    async fn recent_lines(
        &self,
        _group: &str,
        stream: &str,
        _limit: u32,
    ) -> Result<Vec<String>, PlatformError> {
        Ok(vec![format!("hello from {}", stream)])
    }
}

#[derive(Default)]
struct Inbox {
    payloads: Mutex<Vec<NotificationPayload>>,
}

#[async_trait]
impl Notifier for Inbox {
    fn name(&self) -> &str {
        "inbox"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        self.payloads.lock().push(payload.clone());
        Ok(())
    }
}

struct Pipeline {
    queues: Queues,
    platform: Arc<OnePollPlatform>,
    inbox: Arc<Inbox>,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            queues: Queues::new(Arc::new(MemoryStore::new()), KeySpace::new("e2e")),
            platform: Arc::new(OnePollPlatform::default()),
            inbox: Arc::new(Inbox::default()),
        }
    }

    fn scheduler(&self) -> Scheduler {
        Scheduler::new(jobs(), self.queues.clone(), ErrorPolicy::Isolate, TIMEOUT)
    }

    fn worker(&self, policy: ErrorPolicy) -> Worker {
        Worker::new(
            jobs(),
            self.queues.clone(),
            self.platform.clone(),
            policy,
            TIMEOUT,
        )
    }

    fn checker(&self) -> Checker {
        let inbox: Arc<dyn Notifier> = self.inbox.clone();
        Checker::new(
            self.queues.clone(),
            self.platform.clone(),
            Arc::new(StaticLogs),
            vec![inbox],
            ErrorPolicy::Isolate,
            TIMEOUT,
            50,
        )
    }
}

#[tokio::test]
async fn test_due_instants_flow_to_notifications() {
    let pipeline = Pipeline::new();
    let cancel = CancellationToken::new();
    let scheduler = pipeline.scheduler();
    let worker = pipeline.worker(ErrorPolicy::Isolate);
    let checker = pipeline.checker();

    scheduler
        .tick_at(at("2020-01-02T23:58:00Z"), &cancel)
        .await
        .unwrap();
    let report = scheduler
        .tick_at(at("2020-01-03T00:01:00Z"), &cancel)
        .await
        .unwrap();
    // report: 23:59, 00:00, 00:01; nightly: 00:00
    assert_eq!(report.processed, 4);

    assert_eq!(worker.tick(&cancel).await.unwrap().processed, 4);
    assert_eq!(pipeline.platform.launched.lock().len(), 4);

    let first = checker.tick(&cancel).await.unwrap();
    assert_eq!(first.requeued, 4);
    assert!(pipeline.inbox.payloads.lock().is_empty());

    let second = checker.tick(&cancel).await.unwrap();
    assert_eq!(second.processed, 4);

    let payloads = pipeline.inbox.payloads.lock().clone();
    assert_eq!(payloads.len(), 4);
    let executions: HashSet<_> = payloads.iter().map(|p| p.execution_id.clone()).collect();
    assert_eq!(executions.len(), 4);
    assert_eq!(payloads.iter().filter(|p| p.job_id == "nightly").count(), 1);
    assert_eq!(
        payloads[0].containers["main"].log,
        format!("hello from jobs/main/{}\n", payloads[0].execution_id)
    );
    assert_eq!(pipeline.queues.watch_len().await.unwrap(), 0);
    assert_eq!(pipeline.queues.work_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_supervised_loops_drain_queues() {
    let pipeline = Pipeline::new();
    for minute in 0..5 {
        let item = cronfleet_protocols::DueInstant::new(
            "report",
            at(&format!("2020-01-02T10:0{}:00Z", minute)),
        );
        pipeline.queues.enqueue_due(&item).await.unwrap();
    }

    let cancel = CancellationToken::new();
    let settings = LoopSettings::new(Duration::from_millis(10), Duration::from_millis(50));
    let supervisor = Supervisor::new(cancel.clone())
        .add(Arc::new(pipeline.worker(ErrorPolicy::Isolate)), settings)
        .add(Arc::new(pipeline.checker()), settings);
    let handle = tokio::spawn(supervisor.run());

    tokio::time::timeout(Duration::from_secs(5), async {
        while pipeline.inbox.payloads.lock().len() < 5 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("all executions notified");

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(pipeline.inbox.payloads.lock().len(), 5);
}

/// A work item naming an unknown job.
///
/// With `ErrorPolicy::Isolate` the item is dropped and the next one is
/// launched in the same tick. With `ErrorPolicy::FailFast` the tick stops at
/// the first failure and the loop ends, matching a process that exits on any
/// error; the remaining item waits for the next process start.
#[tokio::test]
async fn test_error_policies_differ_on_unknown_job() {
    for policy in [ErrorPolicy::Isolate, ErrorPolicy::FailFast] {
        let pipeline = Pipeline::new();
        let stale = cronfleet_protocols::DueInstant::new("retired", at("2020-01-02T10:00:00Z"));
        let live = cronfleet_protocols::DueInstant::new("report", at("2020-01-02T10:01:00Z"));
        pipeline.queues.enqueue_due(&stale).await.unwrap();
        pipeline.queues.enqueue_due(&live).await.unwrap();

        let result = pipeline.worker(policy).tick(&CancellationToken::new()).await;
        match policy {
            ErrorPolicy::Isolate => {
                let report = result.unwrap();
                assert_eq!(report.configuration, 1);
                assert_eq!(report.processed, 1);
                assert_eq!(pipeline.queues.work_len().await.unwrap(), 0);
            }
            ErrorPolicy::FailFast => {
                assert!(matches!(result, Err(DispatchError::UnknownJob(id)) if id == "retired"));
                assert!(pipeline.platform.launched.lock().is_empty());
                assert_eq!(pipeline.queues.work_len().await.unwrap(), 1);
            }
        }
    }
}
