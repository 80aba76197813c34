//! Tick-driven loop execution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cronfleet_config::LoopsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::error::{DispatchError, LoopError};
use crate::report::TickReport;

/// A loop body run once per tick.
#[async_trait]
pub trait PollingLoop: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Run one tick. Implementations check `cancel` between items.
    ///
    /// An `Err` stops the loop for good.
    async fn tick(&self, cancel: &CancellationToken) -> Result<TickReport, DispatchError>;
}

/// Timing of one loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl LoopSettings {
    pub fn new(interval: Duration, max_backoff: Duration) -> Self {
        Self {
            interval,
            max_backoff,
        }
    }

    pub fn scheduler(config: &LoopsConfig) -> Self {
        Self::new(config.scheduler_interval(), config.max_backoff())
    }

    pub fn worker(config: &LoopsConfig) -> Self {
        Self::new(config.worker_interval(), config.max_backoff())
    }

    pub fn checker(config: &LoopsConfig) -> Self {
        Self::new(config.checker_interval(), config.max_backoff())
    }
}

/// Run `body` tick after tick until `cancel` fires or a tick fails.
pub async fn drive(
    body: Arc<dyn PollingLoop>,
    settings: LoopSettings,
    cancel: CancellationToken,
) -> Result<(), LoopError> {
    let name = body.name();
    let mut backoff = Backoff::new(settings.interval, settings.max_backoff);
    info!(
        loop_name = name,
        interval_ms = settings.interval.as_millis() as u64,
        "Loop started"
    );

    while !cancel.is_cancelled() {
        let report = body
            .tick(&cancel)
            .await
            .map_err(|source| LoopError::Failed { name, source })?;

        if report.is_failing() {
            backoff.record_failure();
            warn!(
                loop_name = name,
                failures = backoff.failures(),
                delay_ms = backoff.delay().as_millis() as u64,
                "Tick hit transient errors, backing off"
            );
        } else {
            backoff.reset();
        }
        if !report.is_idle() {
            debug!(loop_name = name, ?report, "Tick finished");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff.delay()) => {}
        }
    }

    info!(loop_name = name, "Loop stopped");
    Ok(())
}

/// Bound an external call by `after`.
pub(crate) async fn timed<T, E, F>(
    after: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, DispatchError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<DispatchError>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(DispatchError::Timeout { operation, after }),
    }
}
