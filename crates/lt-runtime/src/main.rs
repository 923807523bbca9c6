//! LogTail service entry point.

use anyhow::{Context, Result};
use lt_runtime::{LogTailRuntime, ServiceConfig};
use lt_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .await
        .context("Failed to initialize telemetry")?;

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;
    let runtime = LogTailRuntime::start(config).await?;

    info!("Log service is running. Press Ctrl+C to stop.");
    wait_for_signal().await?;

    runtime.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")
}
