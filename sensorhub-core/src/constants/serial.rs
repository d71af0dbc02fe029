//! Serial Link Defaults
//!
//! The gateway talks to a UART or a pseudo-terminal pair. During development
//! the usual setup is a `socat` PTY pair with the simulator on one end:
//!
//! ```text
//! socat PTY,link=/dev/ttyV0,mode=777 PTY,link=/dev/ttyV1,mode=777
//! ```

/// Device path used when none is configured.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyV0";

/// Baud rate used when none is configured.
///
/// 9600 baud is the Arduino `Serial.begin` default and fast enough for a
/// line of three readings per second.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Sleep between checks of an idle serial port (ms).
///
/// Bounds CPU usage while keeping a reading at most one interval stale.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Longest accepted telemetry line in bytes, excluding the newline.
///
/// A three-sensor line is under 100 bytes; anything past this is a missing
/// newline or line noise and is discarded up to the next newline.
pub const MAX_LINE_LEN: usize = 1024;

/// Bytes requested from the port per read.
pub const READ_CHUNK_SIZE: usize = 256;
