//! Constants for SensorHub
//!
//! Centralised defaults for the serial link and the CoAP endpoint. Every
//! numeric value used by the gateway is defined here with its unit in the
//! name.
//!
//! ## Organization
//!
//! - **Serial**: device defaults, polling cadence, line limits
//! - **Network**: CoAP endpoint defaults and datagram limits

/// Serial device defaults and line framing limits.
pub mod serial;

/// CoAP endpoint defaults and datagram limits.
pub mod network;

pub use serial::{
    DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT, MAX_LINE_LEN, POLL_INTERVAL_MS, READ_CHUNK_SIZE,
};

pub use network::{COAP_DEFAULT_PORT, DEFAULT_BIND_IP, MAX_DATAGRAM_SIZE};
