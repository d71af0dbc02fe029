//! Serial Telemetry Sources
//!
//! ## Overview
//!
//! The ingestion loop polls rather than blocks: it asks how many bytes the
//! driver has buffered, reads exactly those, and sleeps when there are none.
//! [`SerialSource`] captures that two-step contract so the loop can run
//! against a real port or an in-memory script.
//!
//! | Source              | Backing                         | Feature  |
//! |---------------------|---------------------------------|----------|
//! | [`SerialPortSource`]| `tokio-serial` native port      | `serial` |
//! | your own            | anything implementing the trait | `std`    |
//!
//! ## Ownership
//!
//! A source is moved into the ingestion loop and dropped when the loop
//! returns, whatever the reason. Dropping a [`SerialPortSource`] closes the
//! device, so there is no separate close call to forget.

use std::io;

use async_trait::async_trait;

/// Byte source the ingestion loop polls
#[async_trait]
pub trait SerialSource: Send {
    /// Bytes already buffered and readable without waiting.
    ///
    /// An error here is a channel fault and ends ingestion.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes.
    ///
    /// `Ok(0)` means the channel has closed.
    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

#[cfg(feature = "serial")]
pub use self::port::*;

#[cfg(feature = "serial")]
mod port {
    use super::*;
    use log::info;
    use sensorhub_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT};
    use thiserror::Error;
    use tokio::io::AsyncReadExt;
    use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

    /// Serial device configuration
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SerialConfig {
        /// Device path, e.g. `/dev/ttyUSB0`
        pub path: String,
        /// Line speed in baud
        pub baud_rate: u32,
    }

    impl SerialConfig {
        /// Create new configuration for a device at the default baud rate
        pub fn new(path: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                baud_rate: DEFAULT_BAUD_RATE,
            }
        }

        /// Set baud rate
        pub fn baud_rate(mut self, baud_rate: u32) -> Self {
            self.baud_rate = baud_rate;
            self
        }
    }

    impl Default for SerialConfig {
        fn default() -> Self {
            Self::new(DEFAULT_SERIAL_PORT)
        }
    }

    /// Failure to open the serial device
    #[derive(Debug, Error)]
    #[error("Failed to open serial port {path} at {baud_rate} baud: {source}")]
    pub struct SerialOpenError {
        /// Device path
        pub path: String,
        /// Requested baud rate
        pub baud_rate: u32,
        /// Driver error
        #[source]
        pub source: tokio_serial::Error,
    }

    /// A native serial port driven by the tokio reactor
    pub struct SerialPortSource {
        port: SerialStream,
        path: String,
    }

    impl SerialPortSource {
        /// Open the configured device.
        ///
        /// Must be called from within a tokio runtime.
        pub fn open(config: &SerialConfig) -> Result<Self, SerialOpenError> {
            let port = tokio_serial::new(&config.path, config.baud_rate)
                .open_native_async()
                .map_err(|source| SerialOpenError {
                    path: config.path.clone(),
                    baud_rate: config.baud_rate,
                    source,
                })?;

            info!(
                "Connected to serial port {} at {} baud",
                config.path, config.baud_rate
            );

            Ok(Self {
                port,
                path: config.path.clone(),
            })
        }

        /// Device path this source was opened on
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    #[async_trait]
    impl SerialSource for SerialPortSource {
        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(self.port.bytes_to_read()? as usize)
        }

        async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.port.read(buf).await
        }
    }

    impl Drop for SerialPortSource {
        fn drop(&mut self) {
            info!("Closing serial port {}", self.path);
        }
    }

}
