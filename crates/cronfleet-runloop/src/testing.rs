//! In-process fakes shared by the loop tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cronfleet_config::{JobDefinition, JobSet};
use cronfleet_protocols::{
    ContainerDefinition, ContainerState, ExecutionHandle, ExecutionPlatform, ExecutionStatus,
    LaunchRequest, LogConfiguration, LogSource, NotificationPayload, Notifier, NotifyError,
    PlatformError, TaskTemplate,
};
use cronfleet_queue::{KeySpace, MemoryStore, Queues};
use parking_lot::Mutex;

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn job(id: &str, cron: &str) -> JobDefinition {
    let yaml = format!(
        "Cron: \"{}\"\nCluster: batch\nTaskDefinition: {}\nLaunchType: FARGATE\n",
        cron, id
    );
    JobDefinition::from_yaml(id, &yaml).unwrap()
}

pub fn job_set(jobs: Vec<JobDefinition>) -> Arc<JobSet> {
    Arc::new(JobSet::new(jobs).unwrap())
}

pub fn memory_queues() -> (Arc<MemoryStore>, Queues) {
    let store = Arc::new(MemoryStore::new());
    let queues = Queues::new(store.clone(), KeySpace::new("test"));
    (store, queues)
}

#[derive(Default)]
struct PlatformState {
    revisions: HashMap<String, String>,
    started: Vec<LaunchRequest>,
    describe_calls: HashMap<String, usize>,
    running_polls: usize,
    start_failures: VecDeque<PlatformError>,
    full_families: Vec<String>,
    describe_failures: VecDeque<PlatformError>,
}

/// Execution platform that keeps every task in memory.
///
/// Each task reports `RUNNING` for the first `running_polls` describes and
/// `STOPPED` afterwards.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(self, family: &str, revision: u32) -> Self {
        self.state
            .lock()
            .revisions
            .insert(family.to_string(), format!("{}:{}", family, revision));
        self
    }

    pub fn with_running_polls(self, polls: usize) -> Self {
        self.state.lock().running_polls = polls;
        self
    }

    pub fn fail_next_start(&self, err: PlatformError) {
        self.state.lock().start_failures.push_back(err);
    }

    /// Reject every launch of `family` for lack of capacity.
    pub fn reject_starts(&self, family: &str) {
        self.state.lock().full_families.push(family.to_string());
    }

    pub fn fail_next_describe(&self, err: PlatformError) {
        self.state.lock().describe_failures.push_back(err);
    }

    pub fn started(&self) -> Vec<LaunchRequest> {
        self.state.lock().started.clone()
    }

    pub fn describe_calls(&self, task_arn: &str) -> usize {
        self.state
            .lock()
            .describe_calls
            .get(task_arn)
            .copied()
            .unwrap_or(0)
    }
}

pub fn template(revision: &str) -> TaskTemplate {
    let family = revision.split(':').next().unwrap_or(revision);
    let mut sidecar = ContainerDefinition::new("sidecar");
    sidecar.log_configuration = Some(LogConfiguration {
        driver: "fluentd".to_string(),
        options: Default::default(),
    });
    TaskTemplate {
        revision: revision.to_string(),
        containers: vec![
            ContainerDefinition::new("app").with_awslogs(&format!("/ecs/{}", family), family),
            sidecar,
        ],
    }
}

#[async_trait]
impl ExecutionPlatform for FakePlatform {
    async fn latest_revision(&self, family: &str) -> Result<Option<String>, PlatformError> {
        Ok(self.state.lock().revisions.get(family).cloned())
    }

    async fn describe_template(&self, revision: &str) -> Result<TaskTemplate, PlatformError> {
        Ok(template(revision))
    }

    async fn start_execution(
        &self,
        request: &LaunchRequest,
    ) -> Result<ExecutionHandle, PlatformError> {
        let mut state = self.state.lock();
        if let Some(err) = state.start_failures.pop_front() {
            return Err(err);
        }
        let family = request.revision.split(':').next().unwrap_or_default();
        if state.full_families.iter().any(|f| f == family) {
            return Err(PlatformError::Rejected(format!(
                "RESOURCE:MEMORY ({})",
                request.revision
            )));
        }
        state.started.push(request.clone());
        let n = state.started.len();
        Ok(ExecutionHandle {
            task_arn: format!(
                "arn:aws:ecs:us-east-1:123456789012:task/{}/task{:04}",
                request.cluster, n
            ),
            cluster_arn: format!(
                "arn:aws:ecs:us-east-1:123456789012:cluster/{}",
                request.cluster
            ),
        })
    }

    async fn describe_execution(
        &self,
        handle: &ExecutionHandle,
    ) -> Result<ExecutionStatus, PlatformError> {
        let mut state = self.state.lock();
        if let Some(err) = state.describe_failures.pop_front() {
            return Err(err);
        }
        let running_polls = state.running_polls;
        let calls = state
            .describe_calls
            .entry(handle.task_arn.clone())
            .or_insert(0);
        *calls += 1;
        if *calls <= running_polls {
            return Ok(ExecutionStatus::running("RUNNING"));
        }
        Ok(ExecutionStatus {
            last_status: "STOPPED".to_string(),
            stop_code: Some("EssentialContainerExited".to_string()),
            stopping_at: Some(at("2020-01-02T10:05:00Z")),
            stopped_at: Some(at("2020-01-02T10:05:30Z")),
            stopped_reason: Some("Essential container in task exited".to_string()),
            containers: vec![
                ContainerState {
                    name: "app".to_string(),
                    reason: Some("OutOfMemoryError: Container killed".to_string()),
                },
                ContainerState {
                    name: "sidecar".to_string(),
                    reason: None,
                },
            ],
        })
    }
}

/// Log source returning two fixed lines per stream.
#[derive(Default)]
pub struct FakeLogs {
    requests: Mutex<Vec<(String, String, u32)>>,
    failures: Mutex<VecDeque<PlatformError>>,
}

impl FakeLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, err: PlatformError) {
        self.failures.lock().push_back(err);
    }

    pub fn requests(&self) -> Vec<(String, String, u32)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LogSource for FakeLogs {
    async fn recent_lines(
        &self,
        group: &str,
        stream: &str,
        limit: u32,
    ) -> Result<Vec<String>, PlatformError> {
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        self.requests
            .lock()
            .push((group.to_string(), stream.to_string(), limit));
        Ok(vec!["starting".to_string(), "done".to_string()])
    }
}

/// Notifier that keeps every payload.
pub struct RecordingNotifier {
    name: String,
    payloads: Mutex<Vec<NotificationPayload>>,
}

impl RecordingNotifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<NotificationPayload> {
        self.payloads.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        self.payloads.lock().push(payload.clone());
        Ok(())
    }
}

/// Notifier that always fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    fn name(&self) -> &str {
        "broken"
    }

    async fn notify(&self, _payload: &NotificationPayload) -> Result<(), NotifyError> {
        Err(NotifyError::Request("connection refused".to_string()))
    }
}
