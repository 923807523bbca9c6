//! Ingestion error types.

use thiserror::Error;

use super::config::ConfigError;

/// Errors reported by an event source.
///
/// Everything except [`SourceError::NotSubscribed`] is treated as transient
/// by the ingestion loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Poll was called before a successful subscribe.
    #[error("event source is not subscribed to a topic")]
    NotSubscribed,

    /// The consumer fell behind and the bus discarded events.
    #[error("consumer lagged behind, {0} events skipped")]
    Lagged(u64),

    /// The bus side of the subscription is gone.
    #[error("event source disconnected")]
    Disconnected,

    /// Any other client or broker error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors reported by a log sink. Never fatal to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Http(String),

    #[error("sink rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to encode event for sink: {0}")]
    Encode(String),
}

/// Fatal errors from starting the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("failed to subscribe to event source: {0}")]
    Subscribe(#[source] SourceError),

    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SourceError::Lagged(5).to_string(),
            "consumer lagged behind, 5 events skipped"
        );
        assert_eq!(
            SinkError::Rejected {
                status: 400,
                body: "bad labels".into()
            }
            .to_string(),
            "sink rejected event with status 400: bad labels"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let err: PipelineError = ConfigError::ZeroCapacity.into();
        assert!(matches!(err, PipelineError::Config(ConfigError::ZeroCapacity)));
    }
}
