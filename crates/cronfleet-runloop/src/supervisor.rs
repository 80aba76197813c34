//! Runs the loops side by side and keeps them alive.
//!
//! A loop task that panics is started again, up to a limit. A loop that
//! returns an error cancels every other loop and the error is reported.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::LoopError;
use crate::polling::{drive, LoopSettings, PollingLoop};

/// Default number of panics tolerated per loop.
pub const DEFAULT_MAX_RESTARTS: u32 = 5;

pub struct Supervisor {
    loops: Vec<(Arc<dyn PollingLoop>, LoopSettings)>,
    cancel: CancellationToken,
    max_restarts: u32,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            loops: Vec::new(),
            cancel,
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn add(mut self, body: Arc<dyn PollingLoop>, settings: LoopSettings) -> Self {
        self.loops.push((body, settings));
        self
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Run every loop until cancellation or the first loop failure.
    pub async fn run(self) -> Result<(), LoopError> {
        info!(loops = self.loops.len(), "Supervisor started");

        let cancel = self.cancel.clone();
        let max_restarts = self.max_restarts;
        let results = join_all(
            self.loops
                .into_iter()
                .map(|(body, settings)| supervise(body, settings, cancel.clone(), max_restarts)),
        )
        .await;

        info!("Supervisor stopped");
        results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
    }
}

async fn supervise(
    body: Arc<dyn PollingLoop>,
    settings: LoopSettings,
    cancel: CancellationToken,
    max_restarts: u32,
) -> Result<(), LoopError> {
    let name = body.name();
    let mut restarts = 0;

    loop {
        let task = tokio::spawn(drive(body.clone(), settings, cancel.clone()));
        match task.await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => {
                error!(loop_name = name, error = %e, "Loop failed, shutting down");
                cancel.cancel();
                return Err(e);
            }
            Err(join) if join.is_panic() => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                restarts += 1;
                if restarts > max_restarts {
                    error!(loop_name = name, restarts, "Loop keeps panicking, shutting down");
                    cancel.cancel();
                    return Err(LoopError::Panicked { name, restarts });
                }
                warn!(loop_name = name, restarts, "Loop panicked, restarting");
            }
            Err(_) => return Ok(()),
        }
    }
}
