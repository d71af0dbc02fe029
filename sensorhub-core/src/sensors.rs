//! Sensor Names and Their Fixed Units
//!
//! ## Overview
//!
//! SensorHub serves a closed set of sensors. The set is fixed at compile time:
//! there is no dynamic registration, and every other component (parser, store,
//! resource table) is sized from [`SensorName::COUNT`].
//!
//! | Sensor        | Wire name     | Unit  |
//! |---------------|---------------|-------|
//! | Humidity      | `humidity`    | `%`   |
//! | Temperature   | `temperature` | `C`   |
//! | Pressure      | `pressure`    | `hPa` |
//!
//! The wire name is used both as the telemetry key on the serial line and as
//! the resource path segment on the CoAP side, so a name that parses is always
//! a name that can be served.
//!
//! ```rust
//! use sensorhub_core::SensorName;
//!
//! let sensor = SensorName::from_key("Temperature").unwrap();
//! assert_eq!(sensor, SensorName::Temperature);
//! assert_eq!(sensor.unit(), "C");
//! ```

use core::fmt;

/// Sensors known to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SensorName {
    /// Relative humidity in percent
    Humidity = 0,
    /// Air temperature in degrees Celsius
    Temperature = 1,
    /// Barometric pressure in hectopascal
    Pressure = 2,
}

impl SensorName {
    /// Number of known sensors
    pub const COUNT: usize = 3;

    /// Every sensor, in index order
    pub const ALL: [SensorName; Self::COUNT] = [
        SensorName::Humidity,
        SensorName::Temperature,
        SensorName::Pressure,
    ];

    /// Name used on the serial line and as the resource path
    pub const fn name(&self) -> &'static str {
        match self {
            SensorName::Humidity => "humidity",
            SensorName::Temperature => "temperature",
            SensorName::Pressure => "pressure",
        }
    }

    /// Unit reported alongside every value of this sensor
    pub const fn unit(&self) -> &'static str {
        match self {
            SensorName::Humidity => "%",
            SensorName::Temperature => "C",
            SensorName::Pressure => "hPa",
        }
    }

    /// Dense index into per-sensor tables
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Match a telemetry key, ignoring ASCII case.
    ///
    /// The key is expected to be trimmed already.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|sensor| sensor.name().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for SensorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
