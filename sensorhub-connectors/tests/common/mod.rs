//! Shared fixtures for connector integration tests
//!
//! Provides:
//! - A scripted serial source that replays byte chunks, idles and faults
//! - A loopback resource server with its shutdown handle
//! - Polling helpers for state that changes asynchronously

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sensorhub_connectors::coap::{CoapClient, CoapConfig, CoapError};
use sensorhub_connectors::{ResourceServer, ResourceTable, SerialSource};
use sensorhub_core::SharedStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One step of a scripted serial session
#[derive(Debug, Clone)]
pub enum Step {
    /// Bytes that become available at once
    Data(Vec<u8>),
    /// One empty availability check
    Idle,
    /// The next availability check fails
    Fault(io::ErrorKind),
    /// The next read returns zero bytes
    Closed,
}

/// Serial source replaying a script, idle once the script runs out
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    pending: Vec<u8>,
    closing: bool,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            pending: Vec::new(),
            closing: false,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Script made of text chunks only
    pub fn lines(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| Step::Data(c.as_bytes().to_vec())))
    }

    /// Flag set when the source is dropped
    pub fn released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

#[async_trait]
impl SerialSource for ScriptedSource {
    fn bytes_available(&mut self) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.steps.pop_front() {
                Some(Step::Data(bytes)) => self.pending = bytes,
                Some(Step::Fault(kind)) => return Err(io::Error::new(kind, "scripted fault")),
                Some(Step::Closed) => {
                    self.closing = true;
                    return Ok(1);
                }
                Some(Step::Idle) | None => {}
            }
        }
        Ok(self.pending.len())
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closing {
            return Ok(0);
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Resource server on an ephemeral loopback port
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: ResourceServer,
    pub shutdown: watch::Sender<bool>,
    pub task: JoinHandle<Result<(), CoapError>>,
}

impl TestServer {
    pub async fn start(store: &SharedStore) -> Self {
        let server = ResourceServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            ResourceTable::sensors(store),
        )
        .await
        .expect("bind loopback server");
        let addr = server.local_addr().unwrap();
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(server.clone().run(signal));

        Self {
            addr,
            server,
            shutdown,
            task,
        }
    }

    /// Confirmable client with short timeouts
    pub async fn client(&self) -> CoapClient {
        CoapClient::new(CoapConfig::new(self.addr).ack_timeout(500).max_retransmit(3))
            .await
            .expect("bind client socket")
    }

    pub async fn stop(self) {
        self.shutdown.send(true).unwrap();
        self.task.await.unwrap().unwrap();
    }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
