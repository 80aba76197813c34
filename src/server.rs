//! Process wiring: configuration, store, platform, sinks and loops.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use cronfleet_config::{ConfigLoader, ConfigValidator, JobSet, ServiceConfig};
use cronfleet_ecs::check_launch_params;
use cronfleet_protocols::{ExecutionPlatform, LogSource};
use cronfleet_queue::{connect, KeySpace, Queues};
use cronfleet_runloop::{
    CancellationToken, Checker, LoopSettings, Scheduler, Supervisor, Worker,
};

use crate::cli::LoopKind;
use crate::signal;

/// Load and validate the service configuration, logging any warnings.
pub(crate) fn load_config(path: &Path) -> Result<ServiceConfig> {
    let config = ConfigLoader::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    for warning in ConfigValidator::validate(&config).warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    Ok(config)
}

pub(crate) fn load_jobs(dir: &Path) -> Result<Arc<JobSet>> {
    let jobs = JobSet::load_dir(dir)
        .with_context(|| format!("failed to load jobs from {}", dir.display()))?;
    Ok(Arc::new(jobs))
}

/// Refuse to start when a job's launch parameters cannot be converted.
fn check_jobs(jobs: &JobSet) -> Result<()> {
    let mut bad_jobs = 0;
    for job in jobs.iter() {
        if let Err(e) = check_launch_params(&job.network_configuration, &job.overrides) {
            error!(job_id = %job.id, error = %e, "Invalid launch parameters");
            bad_jobs += 1;
        }
    }
    if bad_jobs > 0 {
        bail!("{} job(s) have invalid launch parameters", bad_jobs);
    }
    Ok(())
}

/// Run the selected loops until a shutdown signal or a fatal loop error.
pub(crate) async fn run(config_path: &Path, dag_dir: &Path, loops: &[LoopKind]) -> Result<()> {
    if loops.is_empty() {
        bail!("no loops selected");
    }
    info!("Starting cronfleet v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(config_path)?;
    let jobs = load_jobs(dag_dir)?;
    check_jobs(&jobs)?;
    info!(jobs = jobs.len(), dag_dir = %dag_dir.display(), "Jobs loaded");

    let store = connect(&config.redis.url)
        .await
        .context("failed to connect to the coordination store")?;
    let queues = Queues::new(store, KeySpace::new(config.redis.key_prefix.as_str()));

    let settings = &config.loops;
    let policy = settings.error_policy;
    let timeout = settings.call_timeout();

    let cancel = CancellationToken::new();
    signal::install(cancel.clone()).context("failed to install signal handlers")?;

    let mut supervisor = Supervisor::new(cancel);

    if loops.contains(&LoopKind::Scheduler) {
        let scheduler = Scheduler::new(jobs.clone(), queues.clone(), policy, timeout);
        supervisor = supervisor.add(Arc::new(scheduler), LoopSettings::scheduler(settings));
    }

    if loops.contains(&LoopKind::Worker) || loops.contains(&LoopKind::Checker) {
        let (ecs, cloudwatch) = cronfleet_ecs::from_env().await;
        let platform: Arc<dyn ExecutionPlatform> = Arc::new(ecs);
        let logs: Arc<dyn LogSource> = Arc::new(cloudwatch);

        if loops.contains(&LoopKind::Worker) {
            let worker = Worker::new(
                jobs.clone(),
                queues.clone(),
                platform.clone(),
                policy,
                timeout,
            );
            supervisor = supervisor.add(Arc::new(worker), LoopSettings::worker(settings));
        }

        if loops.contains(&LoopKind::Checker) {
            let sinks = cronfleet_notify::build_sinks(&config.notification, timeout)
                .context("failed to build notification sinks")?;
            info!(sinks = sinks.len(), "Notification sinks ready");
            let checker = Checker::new(
                queues.clone(),
                platform,
                logs,
                sinks,
                policy,
                timeout,
                settings.log_lines,
            );
            supervisor = supervisor.add(Arc::new(checker), LoopSettings::checker(settings));
        }
    }

    info!(
        loops = ?loops,
        error_policy = ?policy,
        key_prefix = %config.redis.key_prefix,
        "cronfleet running"
    );
    supervisor.run().await?;
    info!("cronfleet stopped");
    Ok(())
}
