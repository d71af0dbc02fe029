//! Core telemetry model for SensorHub
//!
//! Turns serial telemetry lines into typed readings and keeps the latest
//! reading per sensor for the CoAP resource server.
//!
//! Key constraints:
//! - A malformed entry never discards the rest of its line
//! - Readers never observe a half-updated reading
//! - Parsing allocates nothing
//!
//! ```
//! use sensorhub_core::{parser, ReadingStore, SensorName};
//!
//! let store = ReadingStore::new();
//! for (sensor, value) in parser::parse("humidity:42.5,temperature:20.1") {
//!     store.set(sensor, value);
//! }
//!
//! assert_eq!(store.get(SensorName::Humidity).value, 42.5);
//! assert_eq!(store.get(SensorName::Temperature).unit, "C");
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod errors;
pub mod parser;
pub mod sensors;

#[cfg(feature = "std")]
pub mod store;

// Public API
pub use errors::{ParseError, ParseResult};
pub use parser::{Readings, Sample};
pub use sensors::SensorName;

#[cfg(feature = "std")]
pub use store::{Reading, ReadingStore, SharedStore};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
