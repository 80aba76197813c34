//! Typed operations over the coordination store.
//!
//! The work queue is FIFO: the scheduler pushes onto the head with `LPUSH`
//! and workers claim from the tail with `RPOPLPUSH`, which also copies the
//! claimed item onto the backup list. The watch queue is `RPUSH` / `LPOP`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use cronfleet_protocols::{DueInstant, ExecutionRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::keys::KeySpace;
use crate::store::CoordinationStore;

/// Queue and watermark access for the three loops.
#[derive(Clone)]
pub struct Queues {
    store: Arc<dyn CoordinationStore>,
    keys: KeySpace,
}

impl Queues {
    pub fn new(store: Arc<dyn CoordinationStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn CoordinationStore> {
        &self.store
    }

    /// Atomically replace a job's watermark with `now` and return the
    /// previous one. `None` means the job had never been scheduled.
    pub async fn advance_watermark(
        &self,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let key = self.keys.last_time(job_id);
        let previous = self.store.getset(&key, &format_instant(now)).await?;
        previous.map(|value| parse_instant(&key, &value)).transpose()
    }

    /// Current watermark of a job, without changing it.
    pub async fn watermark(&self, job_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let key = self.keys.last_time(job_id);
        let value = self.store.get(&key).await?;
        value.map(|value| parse_instant(&key, &value)).transpose()
    }

    /// Add a work item at the producer end of the work queue.
    pub async fn enqueue_due(&self, item: &DueInstant) -> Result<(), StoreError> {
        let key = self.keys.queue();
        self.store.lpush(&key, &encode(&key, item)?).await
    }

    /// Claim the oldest work item.
    ///
    /// An item that cannot be decoded is still removed from the queue; it
    /// stays on the backup list and the error is returned.
    pub async fn claim_due(&self) -> Result<Option<DueInstant>, StoreError> {
        let queue = self.keys.queue();
        let backup = self.keys.queue_backup();
        let Some(raw) = self.store.rpoplpush(&queue, &backup).await? else {
            return Ok(None);
        };
        decode(&queue, &raw).map(Some)
    }

    /// Put a claimed item back at the producer end and drop its backup copy.
    ///
    /// The item queues behind everything already waiting, so one failing
    /// item cannot hold up the others.
    pub async fn requeue_due(&self, item: &DueInstant) -> Result<(), StoreError> {
        let key = self.keys.queue();
        let raw = encode(&key, item)?;
        self.store.lpush(&key, &raw).await?;
        self.store.lrem(&self.keys.queue_backup(), 1, &raw).await?;
        Ok(())
    }

    /// Record when an instance was claimed.
    pub async fn mark_process(
        &self,
        instance_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let key = self.keys.process(instance_id);
        self.store.set(&key, &format_instant(at)).await
    }

    pub async fn work_len(&self) -> Result<usize, StoreError> {
        self.store.llen(&self.keys.queue()).await
    }

    pub async fn backup_len(&self) -> Result<usize, StoreError> {
        self.store.llen(&self.keys.queue_backup()).await
    }

    /// Append a record to the tail of the watch queue.
    pub async fn push_watch(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let key = self.keys.running();
        self.store.rpush(&key, &encode(&key, record)?).await
    }

    /// Take the record at the head of the watch queue.
    pub async fn pop_watch(&self) -> Result<Option<ExecutionRecord>, StoreError> {
        let key = self.keys.running();
        let Some(raw) = self.store.lpop(&key).await? else {
            return Ok(None);
        };
        decode(&key, &raw).map(Some)
    }

    pub async fn watch_len(&self) -> Result<usize, StoreError> {
        self.store.llen(&self.keys.running()).await
    }
}

/// RFC 3339 with whole seconds and a `Z` suffix.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_instant(key: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn encode<T: Serialize>(key: &str, item: &T) -> Result<String, StoreError> {
    serde_json::to_string(item).map_err(|source| StoreError::Codec {
        key: key.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Codec {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
