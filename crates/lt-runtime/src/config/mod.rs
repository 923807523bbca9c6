//! Service configuration.
//!
//! Defaults match the deployed logger service; every value can be overridden
//! from the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | `6016` |
//! | `LT_BIND_HOST` | `0.0.0.0` |
//! | `LOG_TOPIC` / `KAFKA_TOPIC` | `logs` |
//! | `LT_BUFFER_CAPACITY` | `100` |
//! | `LT_FLUSH_INTERVAL_MS` | `3000` |
//! | `LT_POLL_TIMEOUT_MS` | `100` |
//! | `LT_SHUTDOWN_GRACE_MS` | `500` |
//! | `LT_WS_QUEUE_CAPACITY` | `256` |
//! | `LT_WS_PING_INTERVAL_SECS` | `30` |
//! | `LT_WS_IDLE_TIMEOUT_SECS` | `90` |
//! | `KAFKA_BROKER_URL` | unset (in-process bus) |
//! | `KAFKA_GROUP_ID` | `log-events-group` |
//! | `KAFKA_API_KEY`, `KAFKA_API_SECRET` | unset (plaintext) |
//! | `LOKI_ENDPOINT` | unset |
//! | `FRONTEND_URL`, `FRONTEND_SELLER_URL`, `FRONTEND_ADMIN_URL` | `http://localhost:3000`, `:3001`, `:3002` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use lt_01_ingestion::{ConfigError as PipelineConfigError, KafkaConfig, PipelineConfig};
use lt_02_live_hub::{HubConfig, PumpConfig};
use thiserror::Error;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 6016;

const FRONTEND_VARS: [(&str, &str); 3] = [
    ("FRONTEND_URL", "http://localhost:3000"),
    ("FRONTEND_SELLER_URL", "http://localhost:3001"),
    ("FRONTEND_ADMIN_URL", "http://localhost:3002"),
];

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub pipeline: PipelineConfig,
    pub hub: HubConfig,
    pub pump: PumpConfig,
    /// Kafka cluster to consume from; when unset the in-process bus is used
    pub kafka: Option<KafkaConfig>,
    /// Base URL of a Loki server; when unset events are logged locally
    pub loki_endpoint: Option<String>,
    /// Value of the `service` label on pushed streams
    pub service_name: String,
    pub cors: CorsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            pipeline: PipelineConfig::default(),
            hub: HubConfig::default(),
            pump: PumpConfig::default(),
            kafka: None,
            loki_endpoint: None,
            service_name: "logtail".to_string(),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: FRONTEND_VARS.iter().map(|(_, url)| url.to_string()).collect(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
            allow_credentials: true,
            max_age: 12 * 60 * 60,
        }
    }
}

impl ServiceConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` as the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(host) = var("LT_BIND_HOST") {
            config.host = parse("LT_BIND_HOST", &host)?;
        }
        if let Some(topic) = var("LOG_TOPIC").or_else(|| var("KAFKA_TOPIC")) {
            config.pipeline.topic = topic;
        }
        if let Some(capacity) = var("LT_BUFFER_CAPACITY") {
            config.pipeline.buffer_capacity = parse("LT_BUFFER_CAPACITY", &capacity)?;
        }
        if let Some(ms) = var("LT_FLUSH_INTERVAL_MS") {
            config.pipeline.flush_interval = Duration::from_millis(parse("LT_FLUSH_INTERVAL_MS", &ms)?);
        }
        if let Some(ms) = var("LT_POLL_TIMEOUT_MS") {
            config.pipeline.poll_timeout = Duration::from_millis(parse("LT_POLL_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = var("LT_SHUTDOWN_GRACE_MS") {
            config.pump.close_grace = Duration::from_millis(parse("LT_SHUTDOWN_GRACE_MS", &ms)?);
        }
        if let Some(capacity) = var("LT_WS_QUEUE_CAPACITY") {
            config.hub.queue_capacity = parse("LT_WS_QUEUE_CAPACITY", &capacity)?;
        }
        if let Some(secs) = var("LT_WS_PING_INTERVAL_SECS") {
            config.pump.ping_interval = Duration::from_secs(parse("LT_WS_PING_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = var("LT_WS_IDLE_TIMEOUT_SECS") {
            config.pump.idle_timeout = Duration::from_secs(parse("LT_WS_IDLE_TIMEOUT_SECS", &secs)?);
        }

        config.kafka = var("KAFKA_BROKER_URL").map(|brokers| {
            let mut kafka = KafkaConfig::new(brokers);
            if let Some(group) = var("KAFKA_GROUP_ID") {
                kafka.group_id = group;
            }
            kafka.api_key = var("KAFKA_API_KEY");
            kafka.api_secret = var("KAFKA_API_SECRET");
            kafka
        });

        config.loki_endpoint = var("LOKI_ENDPOINT");
        if let Some(name) = var("OTEL_SERVICE_NAME") {
            config.service_name = name;
        }

        // Unset variables keep their default origin; blank ones drop it.
        config.cors.allowed_origins = FRONTEND_VARS
            .iter()
            .filter_map(|(key, default)| match lookup(key) {
                Some(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
                None => Some(default.to_string()),
            })
            .collect();

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        if let Some(kafka) = &self.kafka {
            kafka.validate()?;
        }

        if self.hub.queue_capacity == 0 {
            return Err(ConfigError::Invalid("LT_WS_QUEUE_CAPACITY cannot be 0".into()));
        }
        if self.pump.ping_interval.is_zero() {
            return Err(ConfigError::Invalid("LT_WS_PING_INTERVAL_SECS cannot be 0".into()));
        }
        if self.pump.idle_timeout <= self.pump.ping_interval {
            return Err(ConfigError::Invalid(
                "LT_WS_IDLE_TIMEOUT_SECS must exceed the ping interval".into(),
            ));
        }
        if let Some(endpoint) = &self.loki_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "LOKI_ENDPOINT must be an http(s) URL, got {endpoint}"
                )));
            }
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 6016);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:6016");
        assert_eq!(config.pipeline.topic, "logs");
        assert_eq!(config.pipeline.buffer_capacity, 100);
        assert_eq!(config.pipeline.flush_interval, Duration::from_secs(3));
        assert_eq!(config.hub.queue_capacity, 256);
        assert_eq!(config.pump.close_grace, Duration::from_millis(500));
        assert!(config.loki_endpoint.is_none());
        assert_eq!(config.cors.allowed_origins.len(), 3);
        assert_eq!(config.cors.max_age, 43_200);
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("KAFKA_TOPIC", "app-logs"),
            ("LT_BUFFER_CAPACITY", "5"),
            ("LT_FLUSH_INTERVAL_MS", "250"),
            ("LT_WS_QUEUE_CAPACITY", "16"),
            ("LOKI_ENDPOINT", "http://loki:3100"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.pipeline.topic, "app-logs");
        assert_eq!(config.pipeline.buffer_capacity, 5);
        assert_eq!(config.pipeline.flush_interval, Duration::from_millis(250));
        assert_eq!(config.hub.queue_capacity, 16);
        assert_eq!(config.loki_endpoint.as_deref(), Some("http://loki:3100"));
    }

    #[test]
    fn test_log_topic_wins_over_kafka_topic() {
        let config = load(&[("LOG_TOPIC", "a"), ("KAFKA_TOPIC", "b")]).unwrap();
        assert_eq!(config.pipeline.topic, "a");
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let err = load(&[("PORT", "http")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "PORT",
                value: "http".into()
            }
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = load(&[("LT_BUFFER_CAPACITY", "0")]).unwrap_err();
        assert_eq!(err, ConfigError::Pipeline(PipelineConfigError::ZeroCapacity));
    }

    #[test]
    fn test_idle_timeout_must_exceed_ping() {
        let err = load(&[("LT_WS_IDLE_TIMEOUT_SECS", "30")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_blank_frontend_url_dropped() {
        let config = load(&[
            ("FRONTEND_URL", "https://shop.example.com"),
            ("FRONTEND_SELLER_URL", ""),
        ])
        .unwrap();

        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://shop.example.com", "http://localhost:3002"]
        );
    }

    #[test]
    fn test_loki_endpoint_must_be_http() {
        let err = load(&[("LOKI_ENDPOINT", "loki:3100")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_kafka_unset_by_default() {
        assert!(load(&[]).unwrap().kafka.is_none());
    }

    #[test]
    fn test_kafka_from_env() {
        let config = load(&[
            ("KAFKA_BROKER_URL", "pkc.confluent.cloud:9092"),
            ("KAFKA_GROUP_ID", "tail-group"),
            ("KAFKA_API_KEY", "key"),
            ("KAFKA_API_SECRET", "secret"),
        ])
        .unwrap();

        let kafka = config.kafka.unwrap();
        assert_eq!(kafka.brokers, "pkc.confluent.cloud:9092");
        assert_eq!(kafka.group_id, "tail-group");
        assert!(kafka.has_credentials());
    }

    #[test]
    fn test_kafka_key_without_secret_rejected() {
        let err = load(&[("KAFKA_BROKER_URL", "broker:9092"), ("KAFKA_API_KEY", "key")])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Pipeline(PipelineConfigError::IncompleteCredentials)
        );
    }
}
