//! Pipeline configuration with validation.

use std::time::Duration;

use thiserror::Error;

/// Buffer capacity used when nothing else is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;
/// Default flush period.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);
/// Default source poll timeout.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
/// Default bus topic.
pub const DEFAULT_TOPIC: &str = "logs";
/// Default Kafka consumer group.
pub const DEFAULT_GROUP_ID: &str = "log-events-group";

/// Ingestion pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Topic subscribed on the event source
    pub topic: String,
    /// Maximum number of events held between flushes
    pub buffer_capacity: usize,
    /// Period of the flush scheduler
    pub flush_interval: Duration,
    /// Upper bound on a single source poll
    pub poll_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }

        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ZeroPollTimeout);
        }

        Ok(())
    }
}

/// Kafka broker connection settings.
///
/// With credentials the client connects over `SASL_SSL` using the `PLAIN`
/// mechanism; without them it connects in plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    /// `bootstrap.servers` list
    pub brokers: String,
    pub group_id: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: DEFAULT_GROUP_ID.to_string(),
            api_key: None,
            api_secret: None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brokers.trim().is_empty() {
            return Err(ConfigError::EmptyBrokers);
        }

        if self.group_id.trim().is_empty() {
            return Err(ConfigError::EmptyGroupId);
        }

        if self.api_key.is_some() != self.api_secret.is_some() {
            return Err(ConfigError::IncompleteCredentials);
        }

        Ok(())
    }

    /// Whether SASL credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("brokers", &self.brokers)
            .field("group_id", &self.group_id)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,
    #[error("flush interval must be greater than zero")]
    ZeroInterval,
    #[error("poll timeout must be greater than zero")]
    ZeroPollTimeout,
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("kafka broker list must not be empty")]
    EmptyBrokers,
    #[error("kafka consumer group must not be empty")]
    EmptyGroupId,
    #[error("kafka api key and secret must be set together")]
    IncompleteCredentials,
}
