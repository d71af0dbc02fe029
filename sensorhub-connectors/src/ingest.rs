//! Serial Ingestion Loop
//!
//! ## Overview
//!
//! The ingestion loop is the only writer of the reading store. It owns its
//! [`SerialSource`] and runs until shutdown or a channel fault:
//!
//! ```text
//!          ┌──────────────────────────────────────────┐
//!          ▼                                          │
//!   bytes_available() ── 0 ──▶ sleep(poll_interval) ──┤
//!          │                                          │
//!          n                                          │
//!          ▼                                          │
//!   read_available() ──▶ LineAssembler ──▶ parser ──▶ store.set
//!          │
//!       error / 0 bytes
//!          ▼
//!     Err(IngestError)    (source dropped, port closed)
//! ```
//!
//! ## Failure Semantics
//!
//! | Condition                       | Effect                             |
//! |---------------------------------|------------------------------------|
//! | malformed entry                 | entry dropped, logged, line kept   |
//! | invalid UTF-8 / overlong line   | line dropped, logged               |
//! | device error or disconnect      | loop returns `Err`, store keeps    |
//! |                                 | last-known values                  |
//! | shutdown requested              | loop returns `Ok(stats)`           |
//!
//! There is no reconnect. The source is dropped on every return path, and
//! also when the task running the loop is aborted.

use std::io;
use std::time::Duration;

use log::{debug, warn};
use sensorhub_core::{
    constants::{MAX_LINE_LEN, POLL_INTERVAL_MS, READ_CHUNK_SIZE},
    parser, ReadingStore, SharedStore,
};
use thiserror::Error;

use crate::serial::SerialSource;
use crate::{shutdown_requested, Shutdown};

/// Fault that ended ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    /// The device reported an I/O error
    #[error("Serial channel fault: {0}")]
    Channel(#[from] io::Error),

    /// The device stopped delivering bytes
    #[error("Serial channel closed")]
    Disconnected,
}

/// Reason a whole line was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineError {
    /// Line exceeded the length cap before its newline arrived
    #[error("Line longer than {max} bytes discarded")]
    Overflow {
        /// Length cap in bytes
        max: usize,
    },

    /// Line bytes are not valid UTF-8
    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
}

/// Ingestion counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    /// Bytes read from the source
    pub bytes_read: usize,
    /// Complete lines handed to the parser
    pub lines_processed: usize,
    /// Samples written to the store
    pub readings_applied: usize,
    /// Entries the parser dropped
    pub entries_rejected: usize,
    /// Lines dropped before parsing
    pub lines_discarded: usize,
}

/// Splits a byte stream into newline-terminated text lines
///
/// Bytes accumulate until `\n`. A line that grows past the cap is discarded
/// up to its newline and reported once as [`LineError::Overflow`].
#[derive(Debug)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    max_len: usize,
    discarding: bool,
}

impl LineAssembler {
    /// Create assembler with a line length cap in bytes
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_len.min(READ_CHUNK_SIZE)),
            max_len,
            discarding: false,
        }
    }

    /// Bytes held for an incomplete line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed bytes, emitting every line they complete.
    ///
    /// Emitted lines are trimmed of surrounding whitespace, including `\r`.
    pub fn push<F>(&mut self, bytes: &[u8], mut emit: F)
    where
        F: FnMut(Result<&str, LineError>),
    {
        for &byte in bytes {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                    emit(Err(LineError::Overflow { max: self.max_len }));
                } else {
                    match std::str::from_utf8(&self.buffer) {
                        Ok(text) => emit(Ok(text.trim())),
                        Err(_) => emit(Err(LineError::InvalidUtf8)),
                    }
                }
                self.buffer.clear();
            } else if self.discarding {
                continue;
            } else if self.buffer.len() >= self.max_len {
                self.discarding = true;
                self.buffer.clear();
            } else {
                self.buffer.push(byte);
            }
        }
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(MAX_LINE_LEN)
    }
}

/// Parse one line and write every accepted sample to the store.
///
/// Returns `(applied, rejected)`.
pub fn apply_line(store: &ReadingStore, line: &str) -> (usize, usize) {
    let mut rejected = 0;
    let readings = parser::parse_with(line, |err| {
        warn!("Failed to parse telemetry entry: {}", err);
        rejected += 1;
    });

    let applied = readings.len();
    for (sensor, value) in readings {
        store.set(sensor, value);
    }

    (applied, rejected)
}

/// Polls a serial source and feeds the reading store
pub struct IngestionLoop<S> {
    source: S,
    store: SharedStore,
    poll_interval: Duration,
    assembler: LineAssembler,
    stats: IngestStats,
}

impl<S: SerialSource> IngestionLoop<S> {
    /// Create loop over `source` writing into `store`
    pub fn new(source: S, store: SharedStore) -> Self {
        Self {
            source,
            store,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            assembler: LineAssembler::default(),
            stats: IngestStats::default(),
        }
    }

    /// Set the idle sleep between availability checks
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the line length cap
    pub fn max_line_len(mut self, max_len: usize) -> Self {
        self.assembler = LineAssembler::new(max_len);
        self
    }

    /// Run until shutdown (`Ok`) or a channel fault (`Err`).
    ///
    /// Consumes the loop; the source is dropped before this returns.
    pub async fn run(mut self, mut shutdown: Shutdown) -> Result<IngestStats, IngestError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let available = self.source.bytes_available()?;

            if available == 0 {
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => return Ok(self.stats),
                    _ = tokio::time::sleep(self.poll_interval) => continue,
                }
            }

            let want = available.min(chunk.len());
            let read = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => return Ok(self.stats),
                read = self.source.read_available(&mut chunk[..want]) => read?,
            };

            if read == 0 {
                return Err(IngestError::Disconnected);
            }

            self.stats.bytes_read += read;
            self.feed(&chunk[..read]);
        }
    }

    /// Counters so far
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    fn feed(&mut self, bytes: &[u8]) {
        let store = &self.store;
        let stats = &mut self.stats;

        self.assembler.push(bytes, |line| match line {
            Ok(text) => {
                debug!("Received serial data: {}", text);
                let (applied, rejected) = apply_line(store, text);
                stats.lines_processed += 1;
                stats.readings_applied += applied;
                stats.entries_rejected += rejected;
            }
            Err(err) => {
                warn!("Dropped serial line: {}", err);
                stats.lines_discarded += 1;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorhub_core::SensorName;

    fn collect(assembler: &mut LineAssembler, bytes: &[u8]) -> Vec<Result<String, LineError>> {
        let mut lines = Vec::new();
        assembler.push(bytes, |line| lines.push(line.map(str::to_owned)));
        lines
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut assembler = LineAssembler::default();
        assert!(collect(&mut assembler, b"humidity:4").is_empty());
        assert_eq!(assembler.pending(), 10);

        let lines = collect(&mut assembler, b"2.5\r\ntemperature:1\n");
        assert_eq!(
            lines,
            vec![Ok("humidity:42.5".to_string()), Ok("temperature:1".to_string())]
        );
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn overlong_line_discarded_once() {
        let mut assembler = LineAssembler::new(12);
        let lines = collect(&mut assembler, b"0123456789abcdef\npressure:1\n");
        assert_eq!(
            lines,
            vec![Err(LineError::Overflow { max: 12 }), Ok("pressure:1".to_string())]
        );
    }

    #[test]
    fn line_exactly_at_cap_kept() {
        // "pressure:1" is 10 bytes
        let mut assembler = LineAssembler::new(10);
        let lines = collect(&mut assembler, b"pressure:1\npressure:10\n");
        assert_eq!(
            lines,
            vec![Ok("pressure:1".to_string()), Err(LineError::Overflow { max: 10 })]
        );
    }

    #[test]
    fn invalid_utf8_line_reported() {
        let mut assembler = LineAssembler::default();
        let lines = collect(&mut assembler, b"humidity:\xff\xfe\nhumidity:3\n");
        assert_eq!(
            lines,
            vec![Err(LineError::InvalidUtf8), Ok("humidity:3".to_string())]
        );
    }

    #[test]
    fn blank_lines_emitted_empty() {
        let mut assembler = LineAssembler::default();
        let lines = collect(&mut assembler, b"\n  \r\n");
        assert_eq!(lines, vec![Ok(String::new()), Ok(String::new())]);
    }

    #[test]
    fn apply_line_counts() {
        let store = ReadingStore::new();
        let (applied, rejected) = apply_line(&store, "pressure:abc,humidity:10.0");

        assert_eq!((applied, rejected), (1, 1));
        assert_eq!(store.get(SensorName::Humidity).value, 10.0);
        assert_eq!(store.get(SensorName::Pressure).value, 0.0);
    }
}
