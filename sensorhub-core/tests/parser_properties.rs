//! Property tests for the telemetry parser
//!
//! The parser is the only component that sees producer-controlled text, so
//! these properties target what must hold for every line: it never panics,
//! one bad entry never hides a good one, and the last duplicate wins.

mod common;

use proptest::prelude::*;
use sensorhub_core::{parser, SensorName};

use common::{entry, expected_last, junk_entry};

proptest! {
    #[test]
    fn never_panics_on_arbitrary_text(line in ".{0,200}") {
        let readings = parser::parse(&line);
        prop_assert!(readings.len() <= SensorName::COUNT);
    }

    #[test]
    fn well_formed_lines_round_trip(entries in prop::collection::vec(entry(), 1..8)) {
        let line = entries
            .iter()
            .map(|(text, _, _)| text.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let samples: Vec<(SensorName, f64)> =
            entries.iter().map(|(_, s, v)| (*s, *v)).collect();

        let mut rejected = 0;
        let readings = parser::parse_with(&line, |_| rejected += 1);

        prop_assert_eq!(rejected, 0);
        for sensor in SensorName::ALL {
            prop_assert_eq!(readings.get(sensor), expected_last(&samples, sensor));
        }
    }

    #[test]
    fn junk_never_hides_good_entries(
        good in entry(),
        junk in prop::collection::vec(junk_entry(), 1..4),
        junk_first in any::<bool>(),
    ) {
        let (text, sensor, value) = good;
        let mut parts = junk.clone();
        if junk_first {
            parts.push(text);
        } else {
            parts.insert(0, text);
        }
        let line = parts.join(",");

        let mut rejected = 0;
        let readings = parser::parse_with(&line, |_| rejected += 1);

        prop_assert_eq!(readings.len(), 1);
        prop_assert_eq!(readings.get(sensor), Some(value));
        prop_assert_eq!(rejected, junk.len());
    }
}
