//! Notification payload and sink protocol.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Placeholder log text for containers whose driver cannot be read back.
pub const UNSUPPORTED_LOG_DRIVER: &str = "log driver not supported";

/// Output collected for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLog {
    /// Failure reason reported by the platform, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_message: Option<String>,
    /// Recent log lines, newline-terminated.
    #[serde(default)]
    pub log: String,
}

/// Summary of one finished execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub job_id: String,
    pub execution_id: String,
    pub status: String,
    pub stop_code: Option<String>,
    pub stopping_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stopped_reason: Option<String>,
    /// Keyed by container name.
    pub containers: BTreeMap<String, ContainerLog>,
}

impl NotificationPayload {
    /// Entry for a container, created empty on first use.
    pub fn container_mut(&mut self, name: &str) -> &mut ContainerLog {
        self.containers.entry(name.to_string()).or_default()
    }
}

/// A destination for finished-execution payloads.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NotificationPayload {
        NotificationPayload {
            job_id: "report".to_string(),
            execution_id: "0f3a9c".to_string(),
            status: "STOPPED".to_string(),
            stop_code: Some("EssentialContainerExited".to_string()),
            stopping_at: None,
            stopped_at: None,
            stopped_reason: Some("Essential container in task exited".to_string()),
            containers: BTreeMap::new(),
        }
    }

    #[test]
    fn test_container_mut_merges_entries() {
        let mut p = payload();
        p.container_mut("app").short_message = Some("OutOfMemoryError".to_string());
        p.container_mut("app").log = "line\n".to_string();
        p.container_mut("sidecar").log = UNSUPPORTED_LOG_DRIVER.to_string();

        assert_eq!(p.containers.len(), 2);
        assert_eq!(
            p.containers["app"].short_message.as_deref(),
            Some("OutOfMemoryError")
        );
        assert_eq!(p.containers["app"].log, "line\n");
    }

    #[test]
    fn test_payload_json_shape() {
        let mut p = payload();
        p.container_mut("app").log = "done\n".to_string();
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["job_id"], "report");
        assert_eq!(value["status"], "STOPPED");
        assert_eq!(value["containers"]["app"]["log"], "done\n");
        assert!(value["containers"]["app"].get("short_message").is_none());
    }
}
