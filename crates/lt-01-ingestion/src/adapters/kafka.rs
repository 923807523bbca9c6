//! Kafka-backed event source.
//!
//! Wraps an `rdkafka` [`StreamConsumer`]. The consumer joins its group at
//! the latest offset, so a restarted service tails new events only.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::Message;
use tracing::{debug, info};

use crate::domain::{KafkaConfig, RawEvent, SourceError};
use crate::ports::EventSource;

/// Event source reading one topic from a Kafka cluster.
pub struct KafkaEventSource {
    consumer: StreamConsumer,
    topic: Option<String>,
}

impl KafkaEventSource {
    /// Create the consumer. No connection is made until the first poll.
    pub fn new(config: &KafkaConfig) -> Result<Self, SourceError> {
        let consumer: StreamConsumer = client_config(config).create().map_err(transport)?;
        info!(brokers = %config.brokers, group = %config.group_id, "Kafka consumer created");

        Ok(Self {
            consumer,
            topic: None,
        })
    }
}

/// librdkafka settings for `config`.
pub(crate) fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.group_id)
        .set("auto.offset.reset", "latest")
        .set("enable.partition.eof", "false");

    if let (Some(key), Some(secret)) = (&config.api_key, &config.api_secret) {
        client
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", "PLAIN")
            .set("sasl.username", key)
            .set("sasl.password", secret);
    }

    client
}

fn transport(e: KafkaError) -> SourceError {
    SourceError::Transport(e.to_string())
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError> {
        if topic.is_empty() {
            return Err(SourceError::Transport("empty topic name".into()));
        }
        self.consumer.subscribe(&[topic]).map_err(transport)?;
        self.topic = Some(topic.to_string());
        info!(topic, "Kafka consumer subscribed to topic");
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawEvent>, SourceError> {
        if self.topic.is_none() {
            return Err(SourceError::NotSubscribed);
        }

        let message = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_elapsed) => return Ok(None),
            Ok(result) => result.map_err(transport)?,
        };

        // Tombstones carry no log line.
        let Some(payload) = message.payload() else {
            debug!(
                partition = message.partition(),
                offset = message.offset(),
                "Skipping message without payload"
            );
            return Ok(None);
        };

        Ok(Some(RawEvent::new(Bytes::copy_from_slice(payload))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_without_credentials() {
        let config = KafkaConfig::new("localhost:9092");
        let client = client_config(&config);

        assert_eq!(client.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(client.get("group.id"), Some("log-events-group"));
        assert_eq!(client.get("auto.offset.reset"), Some("latest"));
        assert_eq!(client.get("security.protocol"), None);
    }

    #[test]
    fn test_client_config_with_sasl_credentials() {
        let mut config = KafkaConfig::new("pkc.confluent.cloud:9092");
        config.group_id = "tail".into();
        config.api_key = Some("key".into());
        config.api_secret = Some("secret".into());
        let client = client_config(&config);

        assert_eq!(client.get("group.id"), Some("tail"));
        assert_eq!(client.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(client.get("sasl.mechanisms"), Some("PLAIN"));
        assert_eq!(client.get("sasl.username"), Some("key"));
        assert_eq!(client.get("sasl.password"), Some("secret"));
    }

    #[tokio::test]
    async fn test_poll_before_subscribe() {
        let mut source = KafkaEventSource::new(&KafkaConfig::new("localhost:9092")).unwrap();
        assert_eq!(
            source.poll(Duration::from_millis(10)).await.unwrap_err(),
            SourceError::NotSubscribed
        );
    }

    #[tokio::test]
    async fn test_empty_topic_rejected() {
        let mut source = KafkaEventSource::new(&KafkaConfig::new("localhost:9092")).unwrap();
        assert!(matches!(
            source.subscribe("").await,
            Err(SourceError::Transport(_))
        ));
    }
}
