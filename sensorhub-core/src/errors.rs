//! Error Types for Rejected Telemetry Entries
//!
//! ## Design Philosophy
//!
//! A telemetry line is producer-controlled and unreliable: simulators are typed
//! by humans, serial reads get truncated, and firmware prints debug text on the
//! same wire. Rejecting an entry is therefore routine, not exceptional, and
//! the error type reflects that:
//!
//! 1. **Borrowed**: Variants borrow the offending slice of the line instead of
//!    copying it, so reporting a rejection never allocates.
//!
//! 2. **Copy Semantics**: Errors are handed to a callback per rejected entry and
//!    may be logged or counted without ownership juggling.
//!
//! 3. **Entry Scoped**: An error always describes exactly one entry. Nothing in
//!    this module can reject a whole line.
//!
//! ## Error Categories
//!
//! - `MissingSeparator`: entry has no `:` at all
//! - `UnknownSensor`: key does not name a known sensor
//! - `InvalidNumber`: value is not a floating-point literal
//! - `NonFinite`: value parsed but is NaN or infinite, which the JSON
//!   response body cannot carry
//!
//! ```rust
//! use sensorhub_core::{parser, ParseError};
//!
//! let mut rejected = 0;
//! let readings = parser::parse_with("pressure:abc,humidity:10.0", |err| {
//!     assert!(matches!(err, ParseError::InvalidNumber { .. }));
//!     rejected += 1;
//! });
//! assert_eq!(readings.len(), 1);
//! assert_eq!(rejected, 1);
//! ```

use thiserror_no_std::Error;

use crate::sensors::SensorName;

/// Result type for single-entry parsing
pub type ParseResult<'a, T> = Result<T, ParseError<'a>>;

/// Reason a telemetry entry was dropped
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ParseError<'a> {
    /// No `key:value` separator in the entry
    #[error("Entry '{entry}' has no ':' separator")]
    MissingSeparator {
        /// The trimmed entry text
        entry: &'a str,
    },

    /// Key does not name a known sensor
    #[error("Unknown sensor '{key}'")]
    UnknownSensor {
        /// The trimmed key as it appeared on the line
        key: &'a str,
    },

    /// Value is not a floating-point literal
    #[error("Value '{value}' for {sensor} is not a number")]
    InvalidNumber {
        /// Sensor the value was meant for
        sensor: SensorName,
        /// The trimmed value text
        value: &'a str,
    },

    /// Value parsed to NaN or infinity
    #[error("Value {value} for {sensor} is not finite")]
    NonFinite {
        /// Sensor the value was meant for
        sensor: SensorName,
        /// The parsed value
        value: f64,
    },
}

impl ParseError<'_> {
    /// Sensor the rejected entry targeted, if the key was recognised
    pub fn sensor(&self) -> Option<SensorName> {
        match self {
            Self::InvalidNumber { sensor, .. } | Self::NonFinite { sensor, .. } => Some(*sensor),
            Self::MissingSeparator { .. } | Self::UnknownSensor { .. } => None,
        }
    }
}
