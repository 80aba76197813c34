//! Coordination store trait and the in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::error::StoreError;
use crate::redis_store::RedisStore;

/// Key/value and list primitives with Redis semantics.
///
/// `getset` and `rpoplpush` must be atomic: every loop relies on them to
/// make sure exactly one caller observes a given previous value or item.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Replace a value and return the previous one.
    async fn getset(&self, key: &str, value: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Push onto the head of a list.
    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Push onto the tail of a list.
    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Pop from the head of a list.
    async fn lpop(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Pop from the tail of `source` and push onto the head of `destination`.
    async fn rpoplpush(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn llen(&self, key: &str) -> Result<usize, StoreError>;

    /// Remove up to `count` entries equal to `value`, scanning from the head.
    /// Returns how many were removed.
    async fn lrem(&self, key: &str, count: usize, value: &str) -> Result<usize, StoreError>;
}

/// Open the store named by a URL.
///
/// `memory` selects a process-local [`MemoryStore`]; anything else is handed
/// to the Redis client.
pub async fn connect(url: &str) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    if url == "memory" {
        info!("Using in-memory coordination store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = RedisStore::connect(url).await?;
    Ok(Arc::new(store))
}

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-memory store for tests and single-process runs.
///
/// Every operation runs under one lock, so the atomicity guarantees of the
/// trait hold between tasks of the same process.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Snapshot of a list, head first.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn getset(&self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state.lock();
        Ok(state.values.insert(key.to_string(), value.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.lock();
        Ok(state.values.get(key).cloned())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state.lock();
        Ok(state.lists.get_mut(key).and_then(|list| list.pop_front()))
    }

    async fn rpoplpush(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<String>, StoreError> {
        let mut state = self.state.lock();
        let Some(item) = state.lists.get_mut(source).and_then(|list| list.pop_back()) else {
            return Ok(None);
        };
        state
            .lists
            .entry(destination.to_string())
            .or_default()
            .push_front(item.clone());
        Ok(Some(item))
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        let state = self.state.lock();
        Ok(state.lists.get(key).map_or(0, VecDeque::len))
    }

    async fn lrem(&self, key: &str, count: usize, value: &str) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(0);
        };
        let mut removed = 0;
        list.retain(|entry| {
            if removed < count && entry == value {
                removed += 1;
                return false;
            }
            true
        });
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
