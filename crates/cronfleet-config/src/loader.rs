//! Configuration loader.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::ServiceConfig;
use crate::validator::ConfigValidator;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate the service configuration from a YAML file.
    pub fn load(path: &Path) -> Result<ServiceConfig, ConfigError> {
        Self::check(Self::read(path)?)
    }

    /// Parse the service configuration without validating it.
    pub fn read(path: &Path) -> Result<ServiceConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = Self::read_expanded(path)?;
        if content.trim().is_empty() {
            return Ok(ServiceConfig::default());
        }
        serde_yml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Load and validate the service configuration from a string.
    pub fn load_str(content: &str) -> Result<ServiceConfig, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: ServiceConfig = if expanded.trim().is_empty() {
            ServiceConfig::default()
        } else {
            serde_yml::from_str(&expanded)?
        };
        Self::check(config)
    }

    /// Read a file and expand `${VAR}` references.
    pub fn read_expanded(path: &Path) -> Result<String, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::expand_env_vars(&content)
    }

    fn check(config: ServiceConfig) -> Result<ServiceConfig, ConfigError> {
        let result = ConfigValidator::validate(&config);
        if !result.is_valid() {
            let messages: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
            return Err(ConfigError::Invalid(messages.join("; ")));
        }
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ErrorPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.redis.key_prefix, "cronfleet");
        assert_eq!(config.loops.worker_interval_ms, 1000);
    }

    #[test]
    fn test_load_full_config() {
        let content = r##"
Redis:
  Url: redis://cache:6379/2
  KeyPrefix: lunch
Notification:
  - Driver: slack
    Slack:
      Token: xoxb-test
      Channel: "#batch"
  - Driver: Webhook
    Webhook:
      Url: https://hooks.example.com/batch
      Headers:
        X-Api-Key: secret
  - Driver: log
Loops:
  CheckerIntervalMs: 5000
  LogLines: 20
  ErrorPolicy: FailFast
"##;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.redis.url, "redis://cache:6379/2");
        assert_eq!(config.redis.key_prefix, "lunch");
        assert_eq!(config.notification.len(), 3);
        let slack = config.notification[0].slack.as_ref().unwrap();
        assert_eq!(slack.channel, "#batch");
        assert!(slack.api_url.is_none());
        let webhook = config.notification[1].webhook.as_ref().unwrap();
        assert_eq!(webhook.headers["X-Api-Key"], "secret");
        assert_eq!(config.loops.checker_interval_ms, 5000);
        assert_eq!(config.loops.scheduler_interval_ms, 1000);
        assert_eq!(config.loops.log_lines, 20);
        assert_eq!(config.loops.error_policy, ErrorPolicy::FailFast);
    }

    #[test]
    fn test_unknown_driver_rejected() {
        let content = "Notification:\n  - Driver: carrier-pigeon\n";
        let err = ConfigLoader::load_str(content).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_slack_without_settings_rejected() {
        let content = "Notification:\n  - Driver: slack\n";
        assert!(matches!(
            ConfigLoader::load_str(content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Redis:").unwrap();
        writeln!(file, "  KeyPrefix: from-file").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.redis.key_prefix, "from-file");
    }

    #[test]
    fn test_read_skips_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Redis:").unwrap();
        writeln!(file, "  KeyPrefix: \"\"").unwrap();

        let config = ConfigLoader::read(file.path()).unwrap();
        assert!(config.redis.key_prefix.is_empty());
        assert!(matches!(
            ConfigLoader::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.yml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let result = ConfigLoader::load_str("Redis: [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("CRONFLEET_TEST_CONFIG_VAR", "test_value");
        }
        let content = "Token: \"${CRONFLEET_TEST_CONFIG_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
        unsafe {
            std::env::remove_var("CRONFLEET_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "Token: \"${CRONFLEET_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "Token: \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }
}
