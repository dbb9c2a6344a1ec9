//! Configuration consumed by the execution pipeline and the decoder.
//!
//! Nothing here is global: an [`HttpConfig`] is loaded or built once and the
//! pieces the core needs are handed out as immutable values.

mod defaults;

pub use defaults::DefaultValuePolicy;

use crate::decode::ToleranceDecoder;
use crate::errors::ConfigError;
use crate::pipeline::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Number of activations per logical request. `0` disables retry.
    #[serde(default)]
    pub retry_count: u32,
    /// Constant delay between activations in milliseconds.
    #[serde(default = "default_retry_delay_millis")]
    pub retry_delay_millis: u64,
    /// Fallback values for tolerant decoding. `None` disables substitution.
    #[serde(default)]
    pub def_values: Option<DefaultValuePolicy>,
    /// Upper bound for a single activation in milliseconds.
    #[serde(default)]
    pub attempt_timeout_millis: Option<u64>,
    /// Transport timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_retry_delay_millis() -> u64 {
    1000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry_count: 0,
            retry_delay_millis: default_retry_delay_millis(),
            def_values: None,
            attempt_timeout_millis: None,
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HttpConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Sets the retry attempt count and delay.
    #[must_use]
    pub fn with_retry(mut self, count: u32, delay_millis: u64) -> Self {
        self.retry_count = count;
        self.retry_delay_millis = delay_millis;
        self
    }

    /// Sets the default values.
    #[must_use]
    pub fn with_def_values(mut self, policy: DefaultValuePolicy) -> Self {
        self.def_values = Some(policy);
        self
    }

    /// Sets the per-activation timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_millis = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the transport timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Checks the configuration for values the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt_timeout_millis == Some(0) {
            return Err(ConfigError::Invalid(
                "attempt_timeout_millis must be positive when provided".to_string(),
            ));
        }
        self.timeouts.validate()
    }

    /// Returns the retry policy, or `None` when retry is disabled.
    #[must_use]
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        (self.retry_count > 0)
            .then(|| RetryPolicy::constant(self.retry_count, self.retry_delay_millis))
    }

    /// Returns the shared default values, if configured.
    #[must_use]
    pub fn default_values(&self) -> Option<Arc<DefaultValuePolicy>> {
        self.def_values.clone().map(Arc::new)
    }

    /// Builds a decoder bound to the configured default values.
    #[must_use]
    pub fn decoder(&self) -> ToleranceDecoder {
        ToleranceDecoder::new(self.default_values())
    }

    /// Returns the per-activation timeout.
    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_millis.map(Duration::from_millis)
    }
}

/// Connection and request timeouts handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_seconds")]
    pub connect_seconds: u64,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_seconds")]
    pub request_seconds: u64,
}

fn default_connect_seconds() -> u64 {
    10
}

fn default_request_seconds() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect_seconds(),
            request_seconds: default_request_seconds(),
        }
    }
}

impl TimeoutConfig {
    /// Timeouts for uploads and downloads: short connect, ten minute transfer.
    #[must_use]
    pub fn io_transfer() -> Self {
        Self {
            connect_seconds: 10,
            request_seconds: 10 * 60,
        }
    }

    /// Connect timeout as a Duration.
    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_seconds)
    }

    /// Request timeout as a Duration.
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_seconds == 0 || self.request_seconds == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `smoothhttp=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.retry_count, 0);
        assert_eq!(config.retry_delay_millis, 1000);
        assert!(config.def_values.is_none());
        assert_eq!(config.timeouts, TimeoutConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_retry_count_disables_policy() {
        let config = HttpConfig::new();
        assert!(config.retry_policy().is_none());

        let policy = config.with_retry(3, 100).retry_policy().unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_from_json_str() {
        let config = HttpConfig::from_json_str(
            r#"{
                "retry_count": 2,
                "def_values": {"def_int32": 99},
                "timeouts": {"connect_seconds": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(config.retry_count, 2);
        assert_eq!(config.retry_delay_millis, 1000);
        assert_eq!(config.def_values.unwrap().def_int32, 99);
        assert_eq!(config.timeouts.connect_seconds, 5);
        assert_eq!(config.timeouts.request_seconds, 30);
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let result = HttpConfig::from_json_str(r#"{"timeouts": {"request_seconds": 0}}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = HttpConfig::from_json_str(r#"{"attempt_timeout_millis": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"retry_count": 4, "retry_delay_millis": 250}}"#).unwrap();

        let config = HttpConfig::from_file(file.path()).unwrap();
        assert_eq!(config.retry_count, 4);
        assert_eq!(config.retry_delay_millis, 250);
    }

    #[test]
    fn test_from_missing_file() {
        let result = HttpConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_io_transfer_preset() {
        let timeouts = TimeoutConfig::io_transfer();
        assert_eq!(timeouts.connect(), Duration::from_secs(10));
        assert_eq!(timeouts.request(), Duration::from_secs(600));
    }
}
