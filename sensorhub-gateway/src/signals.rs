//! Process termination signals
//!
//! Interactive runs stop on Ctrl-C (SIGINT); service managers stop the
//! gateway with SIGTERM. Both lead to the same orderly shutdown.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Listener for the signals that request shutdown
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    /// Install the handlers.
    ///
    /// Must be called from within a tokio runtime. SIGTERM is captured from
    /// this point on, so it no longer kills the process outright.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next shutdown request and name the signal that sent it.
    ///
    /// Cancel safe.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => interrupted.map(|()| "SIGINT"),
            _ = self.terminate.recv() => Ok("SIGTERM"),
        }
    }

    /// Wait for the next shutdown request and name the signal that sent it.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await.map(|()| "Ctrl-C")
    }
}
