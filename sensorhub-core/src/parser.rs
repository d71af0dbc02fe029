//! Telemetry Line Parser
//!
//! ## Line Grammar
//!
//! The serial source emits one record per line:
//!
//! ```text
//! key1:value1,key2:value2,...
//! ```
//!
//! Whitespace around keys and values is tolerated and keys are matched without
//! regard to ASCII case, so the simulator's `Humidity: 7.12, Temperature: 6.03`
//! parses the same as `humidity:7.12,temperature:6.03`.
//!
//! ## Entry Isolation
//!
//! Every comma-separated entry stands on its own. A bad entry is dropped and
//! reported; the rest of the line is still applied:
//!
//! ```text
//! "pressure:abc,humidity:10.0"
//!  └────┬─────┘ └─────┬─────┘
//!   rejected      (Humidity, 10.0)
//! ```
//!
//! Blank entries (an empty line, a trailing comma) are skipped without a
//! report since they carry nothing to reject.
//!
//! ## Duplicates
//!
//! A key repeated within one line keeps only its last value. The result holds
//! at most one sample per sensor, which bounds it to [`SensorName::COUNT`]
//! entries and lets it live on the stack.
//!
//! ```rust
//! use sensorhub_core::{parser, SensorName};
//!
//! let readings = parser::parse("humidity:1.0, temperature:20.1, humidity:2.0");
//! assert_eq!(readings.get(SensorName::Humidity), Some(2.0));
//! assert_eq!(readings.get(SensorName::Temperature), Some(20.1));
//! ```

use crate::{
    errors::{ParseError, ParseResult},
    sensors::SensorName,
};

/// Separator between entries on a line
pub const ENTRY_SEPARATOR: char = ',';

/// Separator between key and value within an entry
pub const KEY_VALUE_SEPARATOR: char = ':';

/// One parsed `(sensor, value)` pair
pub type Sample = (SensorName, f64);

/// Samples parsed from a single line, in the order encountered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    samples: heapless::Vec<Sample, { SensorName::COUNT }>,
}

impl Readings {
    /// Create an empty set of readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample, replacing any earlier sample for the same sensor.
    ///
    /// The replacement moves to the end so iteration order follows the
    /// position of the last occurrence on the line.
    pub fn insert(&mut self, sensor: SensorName, value: f64) {
        if let Some(pos) = self.samples.iter().position(|(s, _)| *s == sensor) {
            self.samples.remove(pos);
        }
        // One slot per sensor, so this never overflows
        let _ = self.samples.push((sensor, value));
    }

    /// Value parsed for `sensor`, if the line carried one
    pub fn get(&self, sensor: SensorName) -> Option<f64> {
        self.samples
            .iter()
            .find(|(s, _)| *s == sensor)
            .map(|(_, value)| *value)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the line yielded nothing usable
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate samples in line order
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        self.samples.iter().copied()
    }
}

impl IntoIterator for Readings {
    type Item = Sample;
    type IntoIter = <heapless::Vec<Sample, { SensorName::COUNT }> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

/// Parse a single `key:value` entry.
///
/// The entry is split on its first `:`; key and value are trimmed.
pub fn parse_entry(entry: &str) -> ParseResult<'_, Sample> {
    let (key, value) = entry
        .split_once(KEY_VALUE_SEPARATOR)
        .ok_or(ParseError::MissingSeparator { entry: entry.trim() })?;

    let key = key.trim();
    let value = value.trim();

    let sensor = SensorName::from_key(key).ok_or(ParseError::UnknownSensor { key })?;

    let parsed: f64 = value
        .parse()
        .map_err(|_| ParseError::InvalidNumber { sensor, value })?;

    if !parsed.is_finite() {
        return Err(ParseError::NonFinite {
            sensor,
            value: parsed,
        });
    }

    Ok((sensor, parsed))
}

/// Parse a line, handing every rejected entry to `on_reject`.
pub fn parse_with<'a, F>(line: &'a str, mut on_reject: F) -> Readings
where
    F: FnMut(ParseError<'a>),
{
    let mut readings = Readings::new();

    for entry in line.split(ENTRY_SEPARATOR) {
        if entry.trim().is_empty() {
            continue;
        }

        match parse_entry(entry) {
            Ok((sensor, value)) => readings.insert(sensor, value),
            Err(err) => on_reject(err),
        }
    }

    readings
}

/// Parse a line, silently dropping malformed entries
pub fn parse(line: &str) -> Readings {
    parse_with(line, |_| {})
}
