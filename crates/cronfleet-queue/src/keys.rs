//! Key layout.

/// Builds every key under a shared prefix `P`.
///
/// | key | contents |
/// |-----|----------|
/// | `P:lasttime:<job>` | scheduling watermark |
/// | `P:queue` | pending work items |
/// | `P:queue-backup` | claimed work items |
/// | `P:running` | executions being watched |
/// | `P:process:<instance>` | claim time of a work item |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn last_time(&self, job_id: &str) -> String {
        format!("{}:lasttime:{}", self.prefix, job_id)
    }

    pub fn queue(&self) -> String {
        format!("{}:queue", self.prefix)
    }

    pub fn queue_backup(&self) -> String {
        format!("{}:queue-backup", self.prefix)
    }

    pub fn running(&self) -> String {
        format!("{}:running", self.prefix)
    }

    pub fn process(&self, instance_id: &str) -> String {
        format!("{}:process:{}", self.prefix, instance_id)
    }
}
