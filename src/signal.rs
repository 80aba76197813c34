//! Shutdown signal handling.

use tracing::info;

use cronfleet_runloop::CancellationToken;

/// Cancel `cancel` on the first SIGTERM or SIGINT.
#[cfg(unix)]
pub(crate) fn install(cancel: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = cancel.cancelled() => return,
        }
        info!("Shutting down, finishing current items");
        cancel.cancel();
    });

    Ok(())
}

/// Non-Unix fallback: Ctrl+C only.
#[cfg(not(unix))]
pub(crate) fn install(cancel: CancellationToken) -> std::io::Result<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("Received Ctrl+C");
                    cancel.cancel();
                }
            }
            _ = cancel.cancelled() => {}
        }
    });
    Ok(())
}
