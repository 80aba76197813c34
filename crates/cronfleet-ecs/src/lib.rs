//! # cronfleet ECS
//!
//! AWS-backed implementations of the platform protocols:
//!
//! - [`EcsPlatform`] - resolves task definitions, runs and describes tasks
//! - [`CloudWatchLogs`] - reads the tail of an `awslogs` stream

mod ecs;
mod logs;
mod params;
mod sdk;

pub use ecs::EcsPlatform;
pub use logs::CloudWatchLogs;
pub use params::{check_launch_params, network_configuration, task_override};

use aws_config::BehaviorVersion;

/// Build both clients from the default credential and region chain.
pub async fn from_env() -> (EcsPlatform, CloudWatchLogs) {
    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    (
        EcsPlatform::new(aws_sdk_ecs::Client::new(&config)),
        CloudWatchLogs::new(aws_sdk_cloudwatchlogs::Client::new(&config)),
    )
}
