//! Protocol Connectors for the SensorHub Gateway
//!
//! ## Overview
//!
//! This crate holds the two I/O edges of the gateway. Both are independent
//! tasks that share nothing but the [`ReadingStore`](sensorhub_core::ReadingStore):
//!
//! ```text
//!  serial device                                        CoAP clients
//!       │                                                    ▲
//!       ▼                                                    │
//! ┌─────────────┐  set   ┌──────────────┐  get   ┌──────────────────┐
//! │  ingestion  │──────▶ │ ReadingStore │ ◀──────│  resource server │
//! │    loop     │        └──────────────┘        │  (task/request)  │
//! └─────────────┘                                └──────────────────┘
//! ```
//!
//! ### Serial ingestion
//!
//! **Characteristics:**
//! - Polling loop: checks for buffered input, sleeps ~100 ms when idle
//! - Line framing with a length cap; bad lines are logged and skipped
//! - A channel fault ends ingestion only; the server keeps serving
//!   last-known values
//! - No reconnect: a fresh process is the recovery path
//!
//! ### CoAP (Constrained Application Protocol)
//!
//! **Characteristics:**
//! - Header overhead: 4 bytes minimum
//! - Stateless (no connection overhead)
//! - Confirmable requests answered with piggybacked acknowledgements
//! - One resource per sensor: `/humidity`, `/temperature`, `/pressure`
//!
//! ## Shutdown
//!
//! Both long-running tasks take a [`Shutdown`] receiver. Sending `true` (or
//! dropping the sender) makes them return; the ingestion loop releases the
//! serial device on every exit path because it owns it.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use sensorhub_connectors::{ResourceServer, ResourceTable, IngestionLoop};
//! use sensorhub_connectors::serial::{SerialConfig, SerialPortSource};
//! use sensorhub_core::ReadingStore;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! let store = ReadingStore::shared();
//! let source = SerialPortSource::open(&SerialConfig::new("/dev/ttyV0"))?;
//! let server = ResourceServer::bind("0.0.0.0:5683".parse()?, ResourceTable::sensors(&store)).await?;
//!
//! let (shutdown, signal) = watch::channel(false);
//! tokio::spawn(IngestionLoop::new(source, Arc::clone(&store)).run(signal.clone()));
//! tokio::spawn(server.run(signal));
//! # drop(shutdown);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "coap")]
pub mod coap;

#[cfg(feature = "coap-transport")]
pub mod server;

#[cfg(feature = "std")]
pub mod serial;

#[cfg(feature = "std")]
pub mod ingest;

// Re-export common types
#[cfg(feature = "coap-transport")]
pub use server::{Resource, ResourceServer, ResourceTable, Response, SensorResource, ServerStats};

#[cfg(feature = "std")]
pub use ingest::{IngestError, IngestStats, IngestionLoop, LineAssembler, LineError};

#[cfg(feature = "std")]
pub use serial::SerialSource;

/// Receiving end of the shutdown signal shared by long-running tasks
#[cfg(feature = "std")]
pub type Shutdown = tokio::sync::watch::Receiver<bool>;

/// Resolve once shutdown has been requested or the sender is gone.
///
/// Cancel safe, so it can sit in a `select!` next to I/O.
#[cfg(feature = "std")]
pub async fn shutdown_requested(shutdown: &mut Shutdown) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Connection statistics for the CoAP client
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total requests that ran out of retransmissions
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Last error message
    pub last_error: Option<String>,
}
