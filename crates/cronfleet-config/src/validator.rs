//! Configuration validation.

use std::fmt;

use crate::schema::{NotificationDriver, ServiceConfig};

/// Upper bound of one log retrieval call.
const MAX_LOG_LINES: u32 = 10_000;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the service configuration.
    pub fn validate(config: &ServiceConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_redis(config, &mut result);
        Self::validate_notification(config, &mut result);
        Self::validate_loops(config, &mut result);

        result
    }

    fn validate_redis(config: &ServiceConfig, result: &mut ValidationResult) {
        let url = config.redis.url.as_str();
        if url != "memory" && !url.starts_with("redis://") && !url.starts_with("rediss://") {
            result.add_error(ValidationError::new(
                "Redis.Url",
                "Url must start with redis:// or rediss://, or be 'memory'",
            ));
        }
        if url == "memory" {
            result.add_warning(ValidationWarning::new(
                "Redis.Url",
                "in-memory store is not shared between processes",
            ));
        }

        if config.redis.key_prefix.is_empty() {
            result.add_error(ValidationError::new(
                "Redis.KeyPrefix",
                "KeyPrefix cannot be empty",
            ));
        }
    }

    fn validate_notification(config: &ServiceConfig, result: &mut ValidationResult) {
        if config.notification.is_empty() {
            result.add_warning(ValidationWarning::new(
                "Notification",
                "no notification sinks configured, finished jobs are only logged",
            ));
        }

        for (index, sink) in config.notification.iter().enumerate() {
            let path = format!("Notification[{}]", index);
            let driver = match sink.driver() {
                Ok(driver) => driver,
                Err(_) => {
                    result.add_error(ValidationError::new(
                        format!("{}.Driver", path),
                        format!(
                            "unknown driver '{}', valid values: slack, webhook, log",
                            sink.driver
                        ),
                    ));
                    continue;
                }
            };

            match driver {
                NotificationDriver::Slack => match &sink.slack {
                    None => result.add_error(ValidationError::new(
                        format!("{}.Slack", path),
                        "slack driver requires a Slack block",
                    )),
                    Some(slack) => {
                        if slack.token.is_empty() {
                            result.add_error(ValidationError::new(
                                format!("{}.Slack.Token", path),
                                "Token cannot be empty",
                            ));
                        }
                        if slack.channel.is_empty() {
                            result.add_error(ValidationError::new(
                                format!("{}.Slack.Channel", path),
                                "Channel cannot be empty",
                            ));
                        }
                    }
                },
                NotificationDriver::Webhook => match &sink.webhook {
                    None => result.add_error(ValidationError::new(
                        format!("{}.Webhook", path),
                        "webhook driver requires a Webhook block",
                    )),
                    Some(webhook) => {
                        if !webhook.url.starts_with("http://")
                            && !webhook.url.starts_with("https://")
                        {
                            result.add_error(ValidationError::new(
                                format!("{}.Webhook.Url", path),
                                "Url must start with http:// or https://",
                            ));
                        }
                    }
                },
                NotificationDriver::Log => {}
            }
        }
    }

    fn validate_loops(config: &ServiceConfig, result: &mut ValidationResult) {
        let loops = &config.loops;
        for (field, value) in [
            ("Loops.SchedulerIntervalMs", loops.scheduler_interval_ms),
            ("Loops.WorkerIntervalMs", loops.worker_interval_ms),
            ("Loops.CheckerIntervalMs", loops.checker_interval_ms),
            ("Loops.CallTimeoutSecs", loops.call_timeout_secs),
        ] {
            if value == 0 {
                result.add_error(ValidationError::new(field, "must be greater than 0"));
            }
        }

        if loops.scheduler_interval_ms > 60_000 {
            result.add_warning(ValidationWarning::new(
                "Loops.SchedulerIntervalMs",
                "scheduler ticks less than once a minute, due jobs start late",
            ));
        }

        let shortest_interval = loops.worker_interval_ms.min(loops.checker_interval_ms);
        if loops.max_backoff_secs.saturating_mul(1000) < shortest_interval {
            result.add_warning(ValidationWarning::new(
                "Loops.MaxBackoffSecs",
                "backoff cap is below the loop interval and has no effect",
            ));
        }

        if loops.log_lines == 0 || loops.log_lines > MAX_LOG_LINES {
            result.add_error(ValidationError::new(
                "Loops.LogLines",
                format!("must be between 1 and {}", MAX_LOG_LINES),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
