//! SensorHub gateway wiring
//!
//! Configuration and signal handling for the `sensorhub` binary, kept in a
//! library target so they can be built and tested without opening a serial
//! device.

pub mod config;
pub mod signals;

pub use config::{ConfigError, GatewayConfig};
pub use signals::ShutdownSignal;
