//! SensorHub gateway daemon
//!
//! Reads telemetry lines from a serial device and serves the latest reading
//! of each sensor as a CoAP resource.
//!
//! ```text
//! SENSORHUB_SERIAL_PORT=/dev/ttyUSB0 SENSORHUB_BAUD_RATE=115200 RUST_LOG=debug sensorhub
//! coap-client -m get coap://<host>/humidity
//! ```
//!
//! A serial fault stops ingestion but not the server, which keeps answering
//! with last-known values until the process receives SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use log::{error, info};
use sensorhub_connectors::serial::SerialPortSource;
use sensorhub_connectors::{IngestError, IngestStats, IngestionLoop, ResourceServer, ResourceTable};
use sensorhub_core::ReadingStore;
use tokio::sync::watch;
use tokio::task::JoinError;

use sensorhub_gateway::{GatewayConfig, ShutdownSignal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    run(config).await
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let store = ReadingStore::shared();

    let source = SerialPortSource::open(&config.serial).context("Serial device unavailable")?;
    let server = ResourceServer::bind(config.bind, ResourceTable::sensors(&store))
        .await
        .with_context(|| format!("Failed to bind CoAP server on {}", config.bind))?;

    let mut signals = ShutdownSignal::new().context("Failed to install signal handlers")?;
    let (shutdown, signal) = watch::channel(false);

    let mut ingestion = tokio::spawn(
        IngestionLoop::new(source, Arc::clone(&store))
            .poll_interval(config.poll_interval)
            .run(signal.clone()),
    );
    let mut serving = tokio::spawn(server.run(signal));
    let mut ingesting = true;
    let mut server_done = false;

    let outcome = loop {
        tokio::select! {
            received = signals.recv() => {
                break match received {
                    Ok(name) => {
                        info!("{} received, shutting down", name);
                        Ok(())
                    }
                    Err(err) => Err(anyhow::Error::new(err).context("Failed to listen for signals")),
                };
            }
            joined = &mut ingestion, if ingesting => {
                ingesting = false;
                report_ingestion(joined);
            }
            joined = &mut serving => {
                server_done = true;
                break match joined {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(anyhow::Error::new(err).context("CoAP server failed")),
                    Err(err) => Err(anyhow::Error::new(err).context("CoAP server task panicked")),
                };
            }
        }
    };

    let _ = shutdown.send(true);

    if ingesting {
        report_ingestion(ingestion.await);
    }
    if !server_done {
        if let Err(err) = serving.await {
            error!("CoAP server task failed during shutdown: {}", err);
        }
    }

    info!("Gateway stopped");
    outcome
}

fn report_ingestion(joined: Result<Result<IngestStats, IngestError>, JoinError>) {
    match joined {
        Ok(Ok(stats)) => info!(
            "Serial ingestion stopped after {} lines ({} readings applied)",
            stats.lines_processed, stats.readings_applied
        ),
        Ok(Err(err)) => error!(
            "Serial ingestion stopped: {}; serving last-known values",
            err
        ),
        Err(err) => error!("Serial ingestion task failed: {}", err),
    }
}
