//! # cronfleet RunLoop
//!
//! The three cooperating loops and the machinery that drives them.
//!
//! ```text
//!  Scheduler ──LPUSH──▶ P:queue ──RPOPLPUSH──▶ Worker ──RPUSH──▶ P:running
//!                                                                   │
//!                        Sinks ◀── payload ── Checker ◀──LPOP───────┘
//! ```
//!
//! ## Key Components
//!
//! - [`Scheduler`]: enqueues one work item per due cron occurrence
//! - [`Worker`]: claims work items and starts executions
//! - [`Checker`]: polls executions to completion and notifies
//! - [`PollingLoop`] and [`drive`]: fixed-interval ticking with backoff
//! - [`Supervisor`]: runs the loops, restarts panicked ones
//!
//! Failures are classified (see [`DispatchError::class`]) and handled per
//! the configured [`ErrorPolicy`](cronfleet_config::ErrorPolicy).

pub mod backoff;
pub mod checker;
pub mod error;
pub mod polling;
pub mod report;
pub mod scheduler;
pub mod supervisor;
pub mod worker;

#[cfg(test)]
mod testing;

pub use backoff::Backoff;
pub use checker::Checker;
pub use error::{DispatchError, LoopError};
pub use polling::{drive, LoopSettings, PollingLoop};
pub use report::TickReport;
pub use scheduler::Scheduler;
pub use supervisor::Supervisor;
pub use worker::Worker;

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
