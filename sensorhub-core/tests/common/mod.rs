//! Shared helpers for SensorHub core integration tests
//!
//! Provides proptest strategies that build telemetry lines the way real
//! producers write them: mixed key case, uneven whitespace, and the odd
//! junk entry.

#![allow(dead_code)]

use proptest::prelude::*;
use sensorhub_core::SensorName;

/// Any known sensor
pub fn sensor() -> impl Strategy<Value = SensorName> {
    prop::sample::select(SensorName::ALL.to_vec())
}

/// Finite values in the range real sensors report
pub fn value() -> impl Strategy<Value = f64> {
    -10_000.0f64..10_000.0
}

/// Padding producers put around keys and values
pub fn padding() -> impl Strategy<Value = String> {
    "[ \t]{0,3}"
}

/// A sensor key in random ASCII case
pub fn key_for(sensor: SensorName) -> impl Strategy<Value = String> {
    let name = sensor.name();
    prop::collection::vec(any::<bool>(), name.len()).prop_map(move |upper| {
        name.chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

/// A well-formed entry together with the sample it encodes
pub fn entry() -> impl Strategy<Value = (String, SensorName, f64)> {
    (sensor(), value()).prop_flat_map(|(sensor, value)| {
        (key_for(sensor), padding(), padding()).prop_map(move |(key, pre, post)| {
            (format!("{pre}{key}{post}:{pre}{value}{post}"), sensor, value)
        })
    })
}

/// An entry no parser should accept
pub fn junk_entry() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",                               // no separator
        "(voc|co2|lux):[0-9]{1,3}",                 // unknown sensor
        "(humidity|pressure):[a-z]{1,5}",           // not a number
        Just("temperature:NaN".to_string()),        // not finite
    ]
}

/// Replay a sequence of samples with last-wins semantics
pub fn expected_last(samples: &[(SensorName, f64)], sensor: SensorName) -> Option<f64> {
    samples
        .iter()
        .rev()
        .find(|(s, _)| *s == sensor)
        .map(|(_, v)| *v)
}
