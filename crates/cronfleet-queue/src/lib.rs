//! # cronfleet Queue
//!
//! Shared coordination state for every cronfleet process.
//!
//! ## Features
//!
//! - Key layout under one configurable prefix
//! - Store trait over the Redis primitives the loops rely on
//!   (`GETSET`, `RPOPLPUSH`, list pushes and pops)
//! - Redis and in-memory store implementations
//! - Typed queue operations for watermarks, work items and watch items

pub mod error;
pub mod keys;
pub mod queues;
pub mod redis_store;
pub mod store;

pub use error::StoreError;
pub use keys::KeySpace;
pub use queues::Queues;
pub use redis_store::RedisStore;
pub use store::{connect, CoordinationStore, MemoryStore};
