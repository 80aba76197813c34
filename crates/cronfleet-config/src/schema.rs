//! Service configuration schema.
//!
//! Keys are PascalCase to match the job definition files.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub notification: Vec<NotificationConfig>,

    #[serde(default)]
    pub loops: LoopsConfig,
}

/// Coordination store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedisConfig {
    /// `redis://` URL, or `memory` for a process-local store.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Prefix `P` of every key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "cronfleet".to_string()
}

/// Supported notification drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationDriver {
    Slack,
    Webhook,
    Log,
}

impl NotificationDriver {
    /// Parse a driver name, ignoring case.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(Self::Slack),
            "webhook" => Ok(Self::Webhook),
            "log" => Ok(Self::Log),
            _ => Err(ConfigError::UnknownDriver(name.to_string())),
        }
    }
}

impl fmt::Display for NotificationDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slack => write!(f, "slack"),
            Self::Webhook => write!(f, "webhook"),
            Self::Log => write!(f, "log"),
        }
    }
}

/// One notification sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationConfig {
    pub driver: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

impl NotificationConfig {
    pub fn driver(&self) -> Result<NotificationDriver, ConfigError> {
        NotificationDriver::parse(&self.driver)
    }
}

/// Slack `chat.postMessage` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,

    /// Override of the Web API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Generic JSON webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookConfig {
    pub url: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// What a loop does with a failed unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Log, skip or retry the unit, keep the loop running.
    #[default]
    #[serde(alias = "isolate")]
    Isolate,
    /// Stop the loop on the first failure and shut the process down.
    #[serde(alias = "fail_fast", alias = "failfast")]
    FailFast,
}

/// Loop timing and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoopsConfig {
    #[serde(default = "default_interval_ms")]
    pub scheduler_interval_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub worker_interval_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub checker_interval_ms: u64,

    /// Upper bound of every store, platform and sink call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Cap of the backoff applied while ticks keep failing.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Log lines fetched per container.
    #[serde(default = "default_log_lines")]
    pub log_lines: u32,

    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

impl Default for LoopsConfig {
    fn default() -> Self {
        Self {
            scheduler_interval_ms: default_interval_ms(),
            worker_interval_ms: default_interval_ms(),
            checker_interval_ms: default_interval_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            log_lines: default_log_lines(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl LoopsConfig {
    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms)
    }

    pub fn worker_interval(&self) -> Duration {
        Duration::from_millis(self.worker_interval_ms)
    }

    pub fn checker_interval(&self) -> Duration {
        Duration::from_millis(self.checker_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_log_lines() -> u32 {
    50
}
