//! Slack `chat.postMessage` sink.

use std::time::Duration;

use async_trait::async_trait;
use cronfleet_config::SlackConfig;
use cronfleet_protocols::{NotificationPayload, Notifier, NotifyError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::format::summary;

/// Slack Web API base URL.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: String,
}

/// Every Web API response carries `ok`; failures add `error`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts a text summary of each payload to one channel.
pub struct SlackNotifier {
    client: Client,
    token: String,
    channel: String,
    api_url: String,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig, timeout: Duration) -> Result<Self, NotifyError> {
        if config.token.is_empty() || config.channel.is_empty() {
            return Err(NotifyError::Config(
                "slack sink requires a token and a channel".to_string(),
            ));
        }
        let api_url = config
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_SLACK_API_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: crate::http_client(timeout)?,
            token: config.token.clone(),
            channel: config.channel.clone(),
            api_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat.postMessage", self.api_url)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let message = PostMessage {
            channel: &self.channel,
            text: summary(payload),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                sink: self.name().to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Request(format!("invalid Slack response: {}", e)))?;
        if !body.ok {
            return Err(NotifyError::Rejected {
                sink: self.name().to_string(),
                message: body.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        debug!(
            job_id = %payload.job_id,
            channel = %self.channel,
            "Slack notification posted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "slack_tests.rs"]
mod tests;
