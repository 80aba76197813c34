//! Driver selection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cronfleet_config::{NotificationConfig, NotificationDriver};
use cronfleet_protocols::{NotificationPayload, Notifier, NotifyError};

use crate::log::LogNotifier;
use crate::slack::SlackNotifier;
use crate::webhook::WebhookNotifier;

/// One configured notification destination.
pub enum Sink {
    Slack(SlackNotifier),
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl Sink {
    /// Build the sink named by `config.driver`.
    pub fn from_config(config: &NotificationConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let driver = config
            .driver()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        match driver {
            NotificationDriver::Slack => {
                let slack = config.slack.as_ref().ok_or_else(|| {
                    NotifyError::Config("slack driver requires a Slack block".to_string())
                })?;
                Ok(Sink::Slack(SlackNotifier::new(slack, timeout)?))
            }
            NotificationDriver::Webhook => {
                let webhook = config.webhook.as_ref().ok_or_else(|| {
                    NotifyError::Config("webhook driver requires a Webhook block".to_string())
                })?;
                Ok(Sink::Webhook(WebhookNotifier::new(webhook, timeout)?))
            }
            NotificationDriver::Log => Ok(Sink::Log(LogNotifier)),
        }
    }
}

#[async_trait]
impl Notifier for Sink {
    fn name(&self) -> &str {
        match self {
            Sink::Slack(n) => n.name(),
            Sink::Webhook(n) => n.name(),
            Sink::Log(n) => n.name(),
        }
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        match self {
            Sink::Slack(n) => n.notify(payload).await,
            Sink::Webhook(n) => n.notify(payload).await,
            Sink::Log(n) => n.notify(payload).await,
        }
    }
}

/// Build every configured sink, in configuration order.
pub fn build_sinks(
    configs: &[NotificationConfig],
    timeout: Duration,
) -> Result<Vec<Arc<dyn Notifier>>, NotifyError> {
    configs
        .iter()
        .map(|config| {
            let sink = Sink::from_config(config, timeout)?;
            Ok(Arc::new(sink) as Arc<dyn Notifier>)
        })
        .collect()
}
