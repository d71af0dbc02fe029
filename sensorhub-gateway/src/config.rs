//! Gateway configuration
//!
//! Only the serial link is read from the environment:
//!
//! | Variable                | Default      |
//! |-------------------------|--------------|
//! | `SENSORHUB_SERIAL_PORT` | `/dev/ttyV0` |
//! | `SENSORHUB_BAUD_RATE`   | `9600`       |
//!
//! The bind address and polling cadence keep their defaults unless set
//! through the builder.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use sensorhub_connectors::serial::SerialConfig;
use sensorhub_core::constants::{
    COAP_DEFAULT_PORT, DEFAULT_BAUD_RATE, DEFAULT_BIND_IP, DEFAULT_SERIAL_PORT, POLL_INTERVAL_MS,
};
use thiserror::Error;

/// Environment variable naming the serial device
pub const SERIAL_PORT_VAR: &str = "SENSORHUB_SERIAL_PORT";

/// Environment variable holding the baud rate
pub const BAUD_RATE_VAR: &str = "SENSORHUB_BAUD_RATE";

/// Invalid configuration value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Baud rate is not a positive integer
    #[error("{var} must be a positive integer baud rate, got {value:?}")]
    InvalidBaudRate { var: &'static str, value: String },

    /// Serial port is set but blank
    #[error("{var} must not be empty")]
    EmptySerialPort { var: &'static str },
}

/// Runtime settings for the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Serial device and line speed
    pub serial: SerialConfig,
    /// CoAP listen address
    pub bind: SocketAddr,
    /// Idle sleep of the ingestion loop
    pub poll_interval: Duration,
}

impl GatewayConfig {
    /// Create configuration for `serial_port` with every other value defaulted
    pub fn new(serial_port: impl Into<String>) -> Self {
        Self {
            serial: SerialConfig::new(serial_port),
            bind: SocketAddr::from((DEFAULT_BIND_IP, COAP_DEFAULT_PORT)),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }

    /// Set baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// Set CoAP listen address
    pub fn bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Set ingestion idle sleep
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(SERIAL_PORT_VAR) {
            Some(port) if port.trim().is_empty() => {
                return Err(ConfigError::EmptySerialPort {
                    var: SERIAL_PORT_VAR,
                })
            }
            Some(port) => port,
            None => DEFAULT_SERIAL_PORT.to_string(),
        };

        let baud_rate = match lookup(BAUD_RATE_VAR) {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(baud) if baud > 0 => baud,
                _ => {
                    return Err(ConfigError::InvalidBaudRate {
                        var: BAUD_RATE_VAR,
                        value,
                    })
                }
            },
            None => DEFAULT_BAUD_RATE,
        };

        Ok(Self::new(port).baud_rate(baud_rate))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_PORT)
    }
}
