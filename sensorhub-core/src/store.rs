//! Latest-Value Reading Store
//!
//! ## Overview
//!
//! The store keeps exactly one [`Reading`] per [`SensorName`]. Entries are
//! created up front with value `0.0` and the sensor's fixed unit, so there is
//! no "missing" state and `get` cannot fail.
//!
//! ## Concurrency Model
//!
//! ```text
//!   ingestion task ──set──▶ ┌──────────────┐ ◀──get── request task
//!                           │ [RwLock; 3]  │ ◀──get── request task
//!                           └──────────────┘ ◀──get── request task
//! ```
//!
//! - One lock per reading: updates to humidity never wait on a reader of
//!   pressure, and no ordering is promised across sensors.
//! - A `set` replaces the whole `Reading` under the write lock, so a reader
//!   sees either the previous or the new reading, never a mixture.
//! - `Reading` is `Copy`; `get` returns a snapshot and holds the read lock only
//!   for the copy.
//!
//! A panicking writer cannot leave a half-written `Reading` behind (the write
//! is a single assignment of a `Copy` value), so poisoned locks are recovered
//! instead of propagated.
//!
//! ```rust
//! use sensorhub_core::{ReadingStore, SensorName};
//!
//! let store = ReadingStore::new();
//! store.set(SensorName::Humidity, 42.5);
//!
//! let reading = store.get(SensorName::Humidity);
//! assert_eq!(reading.value, 42.5);
//! assert_eq!(reading.unit, "%");
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use crate::sensors::SensorName;

/// Current state of one sensor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Reading {
    /// Last value written by ingestion
    pub value: f64,
    /// Fixed unit of the sensor
    pub unit: &'static str,
}

impl Reading {
    /// Initial reading for a sensor
    pub const fn initial(sensor: SensorName) -> Self {
        Self {
            value: 0.0,
            unit: sensor.unit(),
        }
    }
}

/// Store handle shared between the ingestion and server tasks
pub type SharedStore = Arc<ReadingStore>;

/// Concurrency-safe map from sensor to its latest reading
#[derive(Debug)]
pub struct ReadingStore {
    entries: [RwLock<Reading>; SensorName::COUNT],
}

impl ReadingStore {
    /// Create a store with every sensor at its initial reading
    pub fn new() -> Self {
        Self {
            entries: SensorName::ALL.map(|sensor| RwLock::new(Reading::initial(sensor))),
        }
    }

    /// Create a store ready to be shared across tasks
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    /// Current reading for `sensor`
    pub fn get(&self, sensor: SensorName) -> Reading {
        *self.entries[sensor.index()]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the value of `sensor`, keeping its unit
    pub fn set(&self, sensor: SensorName, value: f64) {
        let mut entry = self.entries[sensor.index()]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let unit = entry.unit;
        *entry = Reading { value, unit };
    }

    /// Every reading, each taken atomically on its own
    pub fn snapshot(&self) -> [(SensorName, Reading); SensorName::COUNT] {
        SensorName::ALL.map(|sensor| (sensor, self.get(sensor)))
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}
