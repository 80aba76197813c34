//! CloudWatch Logs reader.

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Client;
use cronfleet_protocols::{LogSource, PlatformError};

use crate::sdk::platform_error;

/// CloudWatch Logs-backed [`LogSource`].
#[derive(Debug, Clone)]
pub struct CloudWatchLogs {
    client: Client,
}

impl CloudWatchLogs {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSource for CloudWatchLogs {
    async fn recent_lines(
        &self,
        group: &str,
        stream: &str,
        limit: u32,
    ) -> Result<Vec<String>, PlatformError> {
        // Without a start time and with start_from_head unset, the newest
        // `limit` events are returned, oldest first.
        let output = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .start_from_head(false)
            .send()
            .await
            .map_err(|e| platform_error(&format!("GetLogEvents {}", stream), e))?;

        Ok(output
            .events()
            .iter()
            .filter_map(|event| event.message().map(str::to_string))
            .collect())
    }
}
