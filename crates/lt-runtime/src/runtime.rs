//! Service runtime: owns every long-running activity and their shutdown order.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
#[cfg(feature = "kafka")]
use lt_01_ingestion::KafkaEventSource;
use lt_01_ingestion::{
    EventSource, InMemoryLogBus, KafkaConfig, LogSink, LokiLogSink, Pipeline, PipelineHandle,
    PipelineReport, TracingLogSink,
};
use lt_02_live_hub::{BroadcastHub, ConnectionPump, HubHandle};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::HubBroadcastAdapter;
use crate::config::ServiceConfig;
use crate::http::{build_router, AppState};

/// The running service.
///
/// ## Startup
///
/// 1. Spawn the live hub
/// 2. Bind the HTTP listener
/// 3. Subscribe the pipeline to its source (Kafka when `KAFKA_BROKER_URL` is
///    set, otherwise the in-process bus) and start ingestion and flushing
/// 4. Serve HTTP
///
/// ## Shutdown
///
/// 1. Refuse new viewers
/// 2. Stop ingestion and run the final flush to the viewers already connected
/// 3. Close every viewer connection
/// 4. Give pumps the close grace period
/// 5. Stop the HTTP server
pub struct LogTailRuntime {
    config: ServiceConfig,
    bus: Option<Arc<InMemoryLogBus>>,
    hub: HubHandle,
    pipeline: PipelineHandle,
    local_addr: SocketAddr,
    server: JoinHandle<std::io::Result<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl LogTailRuntime {
    pub async fn start(config: ServiceConfig) -> Result<Self> {
        config.validate().context("Invalid service configuration")?;

        let hub = BroadcastHub::spawn(config.hub.clone());
        let (source, bus) = create_source(&config)?;

        let listener = TcpListener::bind(config.listen_addr())
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;
        let local_addr = listener.local_addr().context("Listener has no local address")?;

        let sink = create_sink(&config)?;
        let live = Arc::new(HubBroadcastAdapter::new(hub.clone()));
        let pipeline = Pipeline::start(config.pipeline.clone(), source, sink, live)
            .await
            .context("Failed to start ingestion pipeline")?;

        let state = AppState {
            hub: hub.clone(),
            pump: ConnectionPump::new(hub.clone(), config.pump.clone()),
            bus: bus.clone(),
            topic: Arc::from(config.pipeline.topic.as_str()),
        };
        let router = build_router(state, &config.cors);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        info!(addr = %local_addr, topic = %config.pipeline.topic, "Log service listening");

        Ok(Self {
            config,
            bus,
            hub,
            pipeline,
            local_addr,
            server,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// The in-process bus, when it is the pipeline's source.
    pub fn bus(&self) -> Option<&Arc<InMemoryLogBus>> {
        self.bus.as_ref()
    }

    pub fn topic(&self) -> &str {
        &self.config.pipeline.topic
    }

    pub async fn shutdown(self) -> PipelineReport {
        info!("Initiating graceful shutdown...");
        self.hub.stop_accepting();

        let report = self.pipeline.shutdown().await;
        info!(
            ingested = report.ingestion.ingested,
            evicted = report.ingestion.evicted,
            batches = report.flush.batches,
            flushed = report.flush.events,
            "Pipeline drained"
        );

        let closed = self.hub.shutdown().await;
        info!(closed, "Viewer connections closed");
        tokio::time::sleep(self.config.pump.close_grace).await;

        if self.shutdown_tx.send(true).is_err() {
            warn!("HTTP server already stopped");
        }
        match tokio::time::timeout(self.config.pump.close_grace * 4, self.server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error"),
            Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
            Err(_) => warn!("HTTP server did not stop in time"),
        }

        info!("Shutdown complete");
        report
    }
}

fn create_source(
    config: &ServiceConfig,
) -> Result<(Box<dyn EventSource>, Option<Arc<InMemoryLogBus>>)> {
    let Some(kafka) = &config.kafka else {
        let bus = Arc::new(InMemoryLogBus::new());
        let source: Box<dyn EventSource> = Box::new(bus.consumer());
        info!("No Kafka broker configured, consuming from the in-process bus");
        return Ok((source, Some(bus)));
    };

    Ok((kafka_source(kafka)?, None))
}

#[cfg(feature = "kafka")]
fn kafka_source(kafka: &KafkaConfig) -> Result<Box<dyn EventSource>> {
    let source = KafkaEventSource::new(kafka).context("Failed to create Kafka consumer")?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "kafka"))]
fn kafka_source(kafka: &KafkaConfig) -> Result<Box<dyn EventSource>> {
    anyhow::bail!(
        "KAFKA_BROKER_URL is set to {} but this build has no Kafka support (enable the `kafka` feature)",
        kafka.brokers
    )
}

fn create_sink(config: &ServiceConfig) -> Result<Arc<dyn LogSink>> {
    match &config.loki_endpoint {
        Some(endpoint) => {
            let sink = LokiLogSink::new(endpoint, config.service_name.clone())
                .context("Failed to create Loki sink")?;
            info!(url = sink.push_url(), "Forwarding logs to Loki");
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(TracingLogSink::new())),
    }
}
