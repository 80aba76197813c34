//! # cronfleet Protocols
//!
//! Types and traits shared by every cronfleet crate.
//!
//! ## Core Traits
//!
//! - [`ExecutionPlatform`] - Starts and describes container executions
//! - [`LogSource`] - Reads the tail of a container log stream
//! - [`Notifier`] - Delivers a completion payload
//!
//! ## Queue Items
//!
//! - [`DueInstant`] - One scheduled firing of a job, produced by the scheduler
//! - [`ExecutionRecord`] - A started execution, watched by the checker

pub mod error;
pub mod notification;
pub mod platform;
pub mod schedule;
pub mod work;

pub use error::{ErrorClass, NotifyError, PlatformError};
pub use notification::{ContainerLog, NotificationPayload, Notifier};
pub use platform::{
    ContainerDefinition, ContainerState, ExecutionHandle, ExecutionPlatform, ExecutionStatus,
    LaunchRequest, LogConfiguration, LogSource, TaskTemplate,
};
pub use schedule::{JobSchedule, ScheduleError};
pub use work::{DueInstant, ExecutionRecord};
