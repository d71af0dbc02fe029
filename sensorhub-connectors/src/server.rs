//! CoAP Resource Server
//!
//! ## Overview
//!
//! Answers GET requests for one resource per sensor from the reading store.
//! Requests are independent: no session, no observe registrations, nothing
//! kept between datagrams.
//!
//! ## Routing
//!
//! Resources are values implementing [`Resource`], held in a [`ResourceTable`]
//! keyed by Uri-Path:
//!
//! | Request                    | Response                                   |
//! |----------------------------|--------------------------------------------|
//! | `GET /<sensor>`            | 2.05 `{"<sensor>":{"value":..,"unit":".."}}` |
//! | other method, `/<sensor>`  | 4.05, empty payload                        |
//! | any method, unknown path   | 4.04 `Resource not found`                  |
//! | empty CON (ping)           | RST                                        |
//! | ACK / RST / undecodable    | dropped                                    |
//!
//! ## Concurrency
//!
//! The receive loop hands every datagram to its own task, so a slow send never
//! holds up the next request. Handlers only call `ReadingStore::get`, which
//! copies one reading under its read lock; a response therefore shows either
//! the value before or after a concurrent update, never a mix.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use sensorhub_core::{constants::MAX_DATAGRAM_SIZE, Reading, SensorName, SharedStore};
use tokio::net::UdpSocket;

use crate::coap::{CoapError, CoapMessage, Code, ContentFormat, MessageType};
use crate::{shutdown_requested, Shutdown};

/// Payload of every 4.04 response
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// Protocol-independent response produced by a resource
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Response code
    pub code: Code,
    /// Content-Format of the payload, if any
    pub content_format: Option<ContentFormat>,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl Response {
    /// 2.05 Content with a JSON payload
    pub fn json(payload: Vec<u8>) -> Self {
        Self {
            code: Code::Content,
            content_format: Some(ContentFormat::ApplicationJSON),
            payload,
        }
    }

    /// 4.04 Not Found
    pub fn not_found() -> Self {
        Self {
            code: Code::NotFound,
            content_format: Some(ContentFormat::TextPlain),
            payload: NOT_FOUND_MESSAGE.as_bytes().to_vec(),
        }
    }

    /// 4.05 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self {
            code: Code::MethodNotAllowed,
            content_format: None,
            payload: Vec::new(),
        }
    }

    /// 5.00 Internal Server Error
    pub fn internal_error() -> Self {
        Self {
            code: Code::InternalServerError,
            content_format: None,
            payload: Vec::new(),
        }
    }
}

/// An addressable resource answering GET
pub trait Resource: Send + Sync {
    /// Build the response to a GET on this resource
    fn get(&self) -> Response;
}

/// Serves the current reading of one sensor
pub struct SensorResource {
    sensor: SensorName,
    store: SharedStore,
}

impl SensorResource {
    /// Create resource for `sensor` backed by `store`
    pub fn new(sensor: SensorName, store: SharedStore) -> Self {
        Self { sensor, store }
    }
}

/// JSON body `{"<sensor>":{"value":..,"unit":".."}}`
///
/// The reading is serialized directly so its fields keep declaration order.
pub fn reading_body(sensor: SensorName, reading: &Reading) -> serde_json::Result<Vec<u8>> {
    let mut body = BTreeMap::new();
    body.insert(sensor.name(), reading);
    serde_json::to_vec(&body)
}

impl Resource for SensorResource {
    fn get(&self) -> Response {
        let reading = self.store.get(self.sensor);

        match reading_body(self.sensor, &reading) {
            Ok(payload) => Response::json(payload),
            Err(err) => {
                warn!("Failed to encode {} reading: {}", self.sensor, err);
                Response::internal_error()
            }
        }
    }
}

/// Lookup table from Uri-Path to resource
#[derive(Default)]
pub struct ResourceTable {
    resources: HashMap<String, Box<dyn Resource>>,
}

impl ResourceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with one [`SensorResource`] per known sensor
    pub fn sensors(store: &SharedStore) -> Self {
        let mut table = Self::new();
        for sensor in SensorName::ALL {
            table.insert(sensor.name(), SensorResource::new(sensor, Arc::clone(store)));
        }
        table
    }

    /// Register `resource` under `path` (leading `/` optional)
    pub fn insert(&mut self, path: &str, resource: impl Resource + 'static) {
        self.resources
            .insert(path.trim_start_matches('/').to_string(), Box::new(resource));
    }

    /// Registered paths, unordered
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Answer a request for `path` made with `method`.
    ///
    /// `method` is `None` for request codes without a [`Code`] variant.
    pub fn route(&self, method: Option<Code>, path: &str) -> Response {
        match self.resources.get(path.trim_start_matches('/')) {
            None => Response::not_found(),
            Some(resource) if method == Some(Code::Get) => resource.get(),
            Some(_) => Response::method_not_allowed(),
        }
    }
}

/// Counters kept by the server
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServerStats {
    /// Requests answered with a success code
    pub requests_served: u64,
    /// Requests answered with 4.04
    pub not_found: u64,
    /// Requests answered with another error code
    pub errors: u64,
    /// Datagrams dropped without a reply
    pub dropped: u64,
}

struct Inner {
    socket: UdpSocket,
    table: ResourceTable,
    message_id: AtomicU16,
    stats: Mutex<ServerStats>,
}

impl Inner {
    /// Build the reply to one datagram, or `None` to stay silent
    fn reply_to(&self, datagram: &[u8]) -> Option<CoapMessage> {
        let request = match CoapMessage::parse(datagram) {
            Ok(request) => request,
            Err(err) => {
                debug!("Dropping undecodable datagram: {}", err);
                self.record(|stats| stats.dropped += 1);
                return None;
            }
        };

        match request.get_type() {
            MessageType::Acknowledgment | MessageType::Reset => {
                debug!("Dropping unsolicited {:?}", request.get_type());
                self.record(|stats| stats.dropped += 1);
                return None;
            }
            MessageType::Confirmable if request.is_empty() => {
                let mut reset = CoapMessage::new();
                reset.set_type(MessageType::Reset);
                reset.set_code(Code::Empty);
                reset.set_message_id(request.get_message_id());
                return Some(reset);
            }
            _ => {}
        }

        if !request.is_request() {
            debug!("Dropping non-request message {}", request.get_message_id());
            self.record(|stats| stats.dropped += 1);
            return None;
        }

        let path = request.uri_path();
        let response = self.table.route(request.get_code(), &path);
        debug!(
            "Responding to {:?} on /{}: {:?} {}",
            request.get_code(),
            path,
            response.code,
            String::from_utf8_lossy(&response.payload)
        );

        self.record(|stats| match response.code {
            code if code.is_success() => stats.requests_served += 1,
            Code::NotFound => stats.not_found += 1,
            _ => stats.errors += 1,
        });

        Some(self.encode(&request, response))
    }

    /// Wrap `response` in a message matching `request`
    fn encode(&self, request: &CoapMessage, response: Response) -> CoapMessage {
        let mut reply = CoapMessage::new();

        if request.get_type() == MessageType::Confirmable {
            reply.set_type(MessageType::Acknowledgment);
            reply.set_message_id(request.get_message_id());
        } else {
            reply.set_type(MessageType::NonConfirmable);
            reply.set_message_id(self.message_id.fetch_add(1, Ordering::Relaxed));
        }

        reply.set_token(request.get_token().to_vec());
        reply.set_code(response.code);
        if let Some(format) = response.content_format {
            reply.set_content_format(format);
        }
        reply.set_payload(response.payload);
        reply
    }

    async fn answer(&self, datagram: Vec<u8>, peer: SocketAddr) {
        let Some(reply) = self.reply_to(&datagram) else {
            return;
        };

        let sent = match reply.to_bytes() {
            Ok(bytes) => self.socket.send_to(&bytes, peer).await.map(|_| ()),
            Err(err) => {
                warn!("Failed to encode reply for {}: {}", peer, err);
                return;
            }
        };

        if let Err(err) = sent {
            warn!("Failed to send reply to {}: {}", peer, err);
        }
    }

    fn record(&self, update: impl FnOnce(&mut ServerStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// CoAP server over UDP
#[derive(Clone)]
pub struct ResourceServer {
    inner: Arc<Inner>,
}

impl ResourceServer {
    /// Bind a UDP socket at `addr` serving `table`
    pub async fn bind(addr: SocketAddr, table: ResourceTable) -> Result<Self, CoapError> {
        let socket = UdpSocket::bind(addr).await.map_err(CoapError::Network)?;

        // Simple pseudo-random message ID based on current time
        let message_id = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            & 0xFFFF) as u16;

        Ok(Self {
            inner: Arc::new(Inner {
                socket,
                table,
                message_id: AtomicU16::new(message_id),
                stats: Mutex::new(ServerStats::default()),
            }),
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, CoapError> {
        self.inner.socket.local_addr().map_err(CoapError::Network)
    }

    /// Counters so far
    pub fn stats(&self) -> ServerStats {
        self.inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive and answer datagrams until shutdown.
    ///
    /// Receive errors are logged and the loop keeps going; on some platforms
    /// an ICMP error from an earlier reply surfaces on the next receive.
    pub async fn run(self, mut shutdown: Shutdown) -> Result<(), CoapError> {
        if let Ok(addr) = self.local_addr() {
            info!("CoAP server is running on {}", addr);
        }

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let received = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                received = self.inner.socket.recv_from(&mut buffer) => received,
            };

            match received {
                Ok((len, peer)) => {
                    let datagram = buffer[..len].to_vec();
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move { inner.answer(datagram, peer).await });
                }
                Err(err) => warn!("Failed to receive datagram: {}", err),
            }
        }

        info!("CoAP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorhub_core::ReadingStore;

    struct Fixed;

    impl Resource for Fixed {
        fn get(&self) -> Response {
            Response::json(b"{}".to_vec())
        }
    }

    #[test]
    fn initial_pressure_body() {
        let store = ReadingStore::shared();
        let table = ResourceTable::sensors(&store);

        let response = table.route(Some(Code::Get), "pressure");
        assert_eq!(response.code, Code::Content);
        assert_eq!(response.content_format, Some(ContentFormat::ApplicationJSON));
        assert_eq!(
            String::from_utf8(response.payload).unwrap(),
            r#"{"pressure":{"value":0.0,"unit":"hPa"}}"#
        );
    }

    #[test]
    fn body_keeps_value_before_unit() {
        let reading = Reading {
            value: -3.5,
            unit: "C",
        };
        let body = reading_body(SensorName::Temperature, &reading).unwrap();
        assert_eq!(body, br#"{"temperature":{"value":-3.5,"unit":"C"}}"#);
    }

    #[tokio::test]
    async fn reply_carries_json_body_and_format_on_the_wire() {
        let store = ReadingStore::shared();
        store.set(SensorName::Humidity, 42.5);
        let server = ResourceServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            ResourceTable::sensors(&store),
        )
        .await
        .unwrap();

        let mut request = CoapMessage::new();
        request.set_type(MessageType::Confirmable);
        request.set_code(Code::Get);
        request.set_message_id(900);
        request.set_token(vec![7]);
        request.add_uri_path("humidity");

        let reply = server.inner.reply_to(&request.to_bytes().unwrap()).unwrap();
        let wire = CoapMessage::parse(&reply.to_bytes().unwrap()).unwrap();

        assert_eq!(wire.get_type(), MessageType::Acknowledgment);
        assert_eq!(wire.get_message_id(), 900);
        assert_eq!(wire.get_code(), Some(Code::Content));
        assert_eq!(wire.content_format(), Some(50));
        assert_eq!(wire.get_payload(), br#"{"humidity":{"value":42.5,"unit":"%"}}"#);

        let mut missing = CoapMessage::new();
        missing.set_type(MessageType::Confirmable);
        missing.set_code(Code::Get);
        missing.set_message_id(901);
        missing.add_uri_path("wind");
        let reply = server.inner.reply_to(&missing.to_bytes().unwrap()).unwrap();
        let wire = CoapMessage::parse(&reply.to_bytes().unwrap()).unwrap();

        assert_eq!(wire.get_code(), Some(Code::NotFound));
        assert_eq!(wire.content_format(), Some(0));
        assert_eq!(wire.get_payload(), b"Resource not found");
    }

    #[test]
    fn body_tracks_store() {
        let store = ReadingStore::shared();
        let table = ResourceTable::sensors(&store);
        store.set(SensorName::Humidity, 42.5);

        let response = table.route(Some(Code::Get), "/humidity");
        let body: serde_json::Value = serde_json::from_slice(&response.payload).unwrap();
        assert_eq!(body["humidity"]["value"], 42.5);
        assert_eq!(body["humidity"]["unit"], "%");
    }

    #[test]
    fn unknown_path_not_found() {
        let store = ReadingStore::shared();
        let table = ResourceTable::sensors(&store);

        for path in ["", "voc", "humidity/extra", "Humidity"] {
            let response = table.route(Some(Code::Get), path);
            assert_eq!(response, Response::not_found(), "path {:?}", path);
            assert_eq!(response.payload, b"Resource not found");
        }
    }

    #[test]
    fn non_get_on_known_path() {
        let store = ReadingStore::shared();
        let table = ResourceTable::sensors(&store);

        assert_eq!(table.route(Some(Code::Put), "temperature").code, Code::MethodNotAllowed);
        assert_eq!(table.route(None, "temperature").code, Code::MethodNotAllowed);
        assert_eq!(table.route(Some(Code::Post), "missing").code, Code::NotFound);
    }

    #[test]
    fn custom_resources_can_be_registered() {
        let mut table = ResourceTable::new();
        table.insert("/status", Fixed);

        assert_eq!(table.paths().collect::<Vec<_>>(), vec!["status"]);
        assert_eq!(table.route(Some(Code::Get), "status").payload, b"{}");
    }

    #[test]
    fn repeated_gets_identical() {
        let store = ReadingStore::shared();
        store.set(SensorName::Temperature, 20.1);
        let table = ResourceTable::sensors(&store);

        let first = table.route(Some(Code::Get), "temperature");
        for _ in 0..10 {
            assert_eq!(table.route(Some(Code::Get), "temperature"), first);
        }
    }
}
