//! # cronfleet notify
//!
//! Destinations for finished-execution payloads. The driver set is closed:
//! [`Sink`] has one variant per driver and is built from configuration once,
//! at startup.

mod format;
mod log;
mod sink;
mod slack;
mod webhook;

pub use format::summary;
pub use log::LogNotifier;
pub use sink::{build_sinks, Sink};
pub use slack::{SlackNotifier, DEFAULT_SLACK_API_URL};
pub use webhook::WebhookNotifier;

use std::time::Duration;

use cronfleet_protocols::NotifyError;
use reqwest::Client;

fn http_client(timeout: Duration) -> Result<Client, NotifyError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NotifyError::Config(format!("failed to create HTTP client: {}", e)))
}
