//! Sink that writes payloads to the service log.

use async_trait::async_trait;
use cronfleet_protocols::{NotificationPayload, Notifier, NotifyError};
use tracing::info;

/// Emits one structured event per finished execution, plus one per container.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        info!(
            job_id = %payload.job_id,
            execution_id = %payload.execution_id,
            status = %payload.status,
            stop_code = payload.stop_code.as_deref().unwrap_or(""),
            stopped_reason = payload.stopped_reason.as_deref().unwrap_or(""),
            containers = payload.containers.len(),
            "Job finished"
        );
        for (name, container) in &payload.containers {
            info!(
                job_id = %payload.job_id,
                execution_id = %payload.execution_id,
                container = %name,
                short_message = container.short_message.as_deref().unwrap_or(""),
                log = %container.log,
                "Container output"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_log_notifier_accepts_payload() {
        let mut payload = NotificationPayload {
            job_id: "report".to_string(),
            execution_id: "0f3a9c".to_string(),
            status: "STOPPED".to_string(),
            stop_code: None,
            stopping_at: None,
            stopped_at: None,
            stopped_reason: None,
            containers: BTreeMap::new(),
        };
        payload.container_mut("app").log = "done\n".to_string();

        let notifier = LogNotifier;
        assert_eq!(notifier.name(), "log");
        notifier.notify(&payload).await.unwrap();
    }
}
