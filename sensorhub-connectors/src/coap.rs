//! CoAP Messages for SensorHub - Constrained Application Protocol Framing
//!
//! ## Overview
//!
//! This module wraps the `coap-lite` packet type with the small surface the
//! gateway needs on both sides of the wire:
//!
//! - **Server side**: decode an inbound request, read its method, Uri-Path and
//!   token, and build a matching response
//! - **Client side**: build a GET, send it over UDP, retransmit with backoff and
//!   match the reply
//!
//! ## Message Exchange
//!
//! ```text
//! Confirmable request                 Non-confirmable request
//!
//! client ── CON GET /humidity ──▶     client ── NON GET /humidity ──▶
//!        ◀── ACK 2.05 (same MID) ──          ◀── NON 2.05 (new MID) ──
//!            token echoed                        token echoed
//! ```
//!
//! Responses to confirmable requests are piggybacked on the acknowledgement,
//! so every exchange is a single round trip.
//!
//! ## Example Usage
//!
//! ```rust
//! use sensorhub_connectors::coap::{CoapMessage, MessageType, Code};
//!
//! let mut message = CoapMessage::new();
//! message.set_type(MessageType::Confirmable);
//! message.set_code(Code::Get);
//! message.set_message_id(1234);
//! message.add_uri_path("temperature");
//!
//! let bytes = message.to_bytes()?;
//! let decoded = CoapMessage::parse(&bytes)?;
//! assert_eq!(decoded.uri_path(), "temperature");
//! # Ok::<(), sensorhub_connectors::coap::CoapError>(())
//! ```

use coap_lite::{CoapOption, MessageClass, MessageType as CoapMessageType, Packet, RequestType, ResponseType};
use thiserror::Error;

/// Re-export commonly used types
pub use coap_lite::ContentFormat;

/// Uri-Path option number (RFC 7252 §5.10)
const OPTION_URI_PATH: u16 = 11;

/// CoAP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Confirmable message (requires ACK)
    Confirmable,
    /// Non-confirmable message (fire and forget)
    NonConfirmable,
    /// Acknowledgment
    Acknowledgment,
    /// Reset
    Reset,
}

impl From<MessageType> for CoapMessageType {
    fn from(mt: MessageType) -> Self {
        match mt {
            MessageType::Confirmable => CoapMessageType::Confirmable,
            MessageType::NonConfirmable => CoapMessageType::NonConfirmable,
            MessageType::Acknowledgment => CoapMessageType::Acknowledgement,
            MessageType::Reset => CoapMessageType::Reset,
        }
    }
}

impl From<CoapMessageType> for MessageType {
    fn from(mt: CoapMessageType) -> Self {
        match mt {
            CoapMessageType::Confirmable => MessageType::Confirmable,
            CoapMessageType::NonConfirmable => MessageType::NonConfirmable,
            CoapMessageType::Acknowledgement => MessageType::Acknowledgment,
            CoapMessageType::Reset => MessageType::Reset,
        }
    }
}

/// CoAP method and response codes used by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    // Methods (0.xx)
    Empty,
    Get,
    Post,
    Put,
    Delete,

    // Success (2.xx)
    Content, // 2.05

    // Client Error (4.xx)
    BadRequest,       // 4.00
    NotFound,         // 4.04
    MethodNotAllowed, // 4.05

    // Server Error (5.xx)
    InternalServerError, // 5.00
}

impl Code {
    fn to_message_class(self) -> MessageClass {
        match self {
            Code::Empty => MessageClass::Empty,
            Code::Get => MessageClass::Request(RequestType::Get),
            Code::Post => MessageClass::Request(RequestType::Post),
            Code::Put => MessageClass::Request(RequestType::Put),
            Code::Delete => MessageClass::Request(RequestType::Delete),

            Code::Content => MessageClass::Response(ResponseType::Content),

            Code::BadRequest => MessageClass::Response(ResponseType::BadRequest),
            Code::NotFound => MessageClass::Response(ResponseType::NotFound),
            Code::MethodNotAllowed => MessageClass::Response(ResponseType::MethodNotAllowed),

            Code::InternalServerError => MessageClass::Response(ResponseType::InternalServerError),
        }
    }

    fn from_message_class(class: &MessageClass) -> Option<Self> {
        let code = match class {
            MessageClass::Empty => Code::Empty,
            MessageClass::Request(RequestType::Get) => Code::Get,
            MessageClass::Request(RequestType::Post) => Code::Post,
            MessageClass::Request(RequestType::Put) => Code::Put,
            MessageClass::Request(RequestType::Delete) => Code::Delete,

            MessageClass::Response(ResponseType::Content) => Code::Content,

            MessageClass::Response(ResponseType::BadRequest) => Code::BadRequest,
            MessageClass::Response(ResponseType::NotFound) => Code::NotFound,
            MessageClass::Response(ResponseType::MethodNotAllowed) => Code::MethodNotAllowed,

            MessageClass::Response(ResponseType::InternalServerError) => Code::InternalServerError,
            _ => return None,
        };
        Some(code)
    }

    /// True for success (2.xx) codes
    pub fn is_success(self) -> bool {
        matches!(self, Code::Content)
    }
}

/// CoAP errors
#[derive(Debug, Error)]
pub enum CoapError {
    /// Invalid message format
    #[error("Invalid CoAP message format")]
    InvalidMessage,
    /// Network error
    #[error("Network error: {0}")]
    Network(#[source] std::io::Error),
    /// Maximum retransmissions exceeded
    #[error("Maximum retransmissions exceeded")]
    MaxRetransmissions,
}

/// CoAP message wrapper
///
/// The underlying coap-lite crate handles the actual packet formatting.
#[derive(Debug, Clone)]
pub struct CoapMessage {
    packet: Packet,
}

impl CoapMessage {
    /// Create a new CoAP message
    pub fn new() -> Self {
        Self {
            packet: Packet::new(),
        }
    }

    /// Set message type
    pub fn set_type(&mut self, msg_type: MessageType) {
        self.packet.header.set_type(msg_type.into());
    }

    /// Set message code
    pub fn set_code(&mut self, code: Code) {
        self.packet.header.code = code.to_message_class();
    }

    /// Set message ID
    pub fn set_message_id(&mut self, id: u16) {
        self.packet.header.message_id = id;
    }

    /// Set token for request/response matching
    pub fn set_token(&mut self, token: Vec<u8>) {
        self.packet.set_token(token);
    }

    /// Add an option
    pub fn add_option(&mut self, number: u16, value: &[u8]) {
        self.packet.add_option(number.into(), value.to_vec());
    }

    /// Set payload
    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.packet.payload = payload;
    }

    /// Add one Uri-Path option per `/`-separated segment
    pub fn add_uri_path(&mut self, path: &str) {
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            self.add_option(OPTION_URI_PATH, segment.as_bytes());
        }
    }

    /// Set the Content-Format option to the format's registered number
    pub fn set_content_format(&mut self, format: ContentFormat) {
        self.packet.set_content_format(format);
    }

    /// Serialize message into a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoapError> {
        self.packet.to_bytes().map_err(|_| CoapError::InvalidMessage)
    }

    /// Parse message from bytes
    pub fn parse(data: &[u8]) -> Result<Self, CoapError> {
        let packet = Packet::from_bytes(data).map_err(|_| CoapError::InvalidMessage)?;
        Ok(Self { packet })
    }

    /// Get message type
    pub fn get_type(&self) -> MessageType {
        self.packet.header.get_type().into()
    }

    /// Get message code, if it is one the gateway knows
    pub fn get_code(&self) -> Option<Code> {
        Code::from_message_class(&self.packet.header.code)
    }

    /// True for any request method, including ones without a `Code` variant
    pub fn is_request(&self) -> bool {
        matches!(self.packet.header.code, MessageClass::Request(_))
    }

    /// True for the empty message (code 0.00)
    pub fn is_empty(&self) -> bool {
        matches!(self.packet.header.code, MessageClass::Empty)
    }

    /// Get message ID
    pub fn get_message_id(&self) -> u16 {
        self.packet.header.message_id
    }

    /// Get token
    pub fn get_token(&self) -> &[u8] {
        self.packet.get_token()
    }

    /// Get payload
    pub fn get_payload(&self) -> &[u8] {
        &self.packet.payload
    }

    /// Uri-Path segments joined with `/`, without a leading slash
    pub fn uri_path(&self) -> String {
        self.packet
            .get_option(CoapOption::UriPath)
            .map(|segments| {
                segments
                    .iter()
                    .map(|segment| String::from_utf8_lossy(segment).into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    /// Numeric Content-Format, if present
    pub fn content_format(&self) -> Option<u16> {
        let value = self
            .packet
            .get_option(CoapOption::ContentFormat)?
            .iter()
            .next()?;
        Some(value.iter().fold(0u16, |acc, b| (acc << 8) | u16::from(*b)))
    }
}

impl Default for CoapMessage {
    fn default() -> Self {
        Self::new()
    }
}

// UDP client for std environments
#[cfg(feature = "std")]
pub use self::std_impl::*;

#[cfg(feature = "std")]
mod std_impl {
    use super::*;
    use crate::ConnectionStats;
    use sensorhub_core::constants::MAX_DATAGRAM_SIZE;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    /// CoAP client configuration
    #[derive(Debug, Clone)]
    pub struct CoapConfig {
        /// Server address
        pub endpoint: SocketAddr,
        /// Use confirmable messages
        pub confirmable: bool,
        /// Initial response timeout (ms), doubled per retransmission
        pub ack_timeout: u32,
        /// Maximum retransmissions
        pub max_retransmit: u8,
    }

    impl CoapConfig {
        /// Create new configuration with endpoint
        pub fn new(endpoint: SocketAddr) -> Self {
            Self {
                endpoint,
                confirmable: true,
                ack_timeout: 2000,
                max_retransmit: 4,
            }
        }

        /// Set confirmable mode
        pub fn confirmable(mut self, confirmable: bool) -> Self {
            self.confirmable = confirmable;
            self
        }

        /// Set initial response timeout
        pub fn ack_timeout(mut self, ack_timeout_ms: u32) -> Self {
            self.ack_timeout = ack_timeout_ms;
            self
        }

        /// Set maximum retransmissions
        pub fn max_retransmit(mut self, max_retransmit: u8) -> Self {
            self.max_retransmit = max_retransmit;
            self
        }
    }

    /// Decoded reply to a client request
    #[derive(Debug, Clone, PartialEq)]
    pub struct ClientResponse {
        /// Response code, `None` when the server sent a code this client does not know
        pub code: Option<Code>,
        /// Numeric Content-Format option
        pub content_format: Option<u16>,
        /// Raw payload
        pub payload: Vec<u8>,
    }

    impl ClientResponse {
        /// Payload as text
        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.payload).into_owned()
        }
    }

    /// CoAP client with UDP transport
    pub struct CoapClient {
        config: CoapConfig,
        socket: UdpSocket,
        message_id: u16,
        stats: Arc<Mutex<ConnectionStats>>,
    }

    impl CoapClient {
        /// Create new CoAP client bound to an ephemeral port
        pub async fn new(config: CoapConfig) -> Result<Self, CoapError> {
            let bind: SocketAddr = if config.endpoint.is_ipv4() {
                ([0, 0, 0, 0], 0).into()
            } else {
                (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
            };
            let socket = UdpSocket::bind(bind).await.map_err(CoapError::Network)?;

            // Simple pseudo-random message ID based on current time
            let message_id = (std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
                & 0xFFFF) as u16;

            Ok(Self {
                config,
                socket,
                message_id,
                stats: Arc::new(Mutex::new(ConnectionStats::default())),
            })
        }

        /// Send GET request
        pub async fn get(&mut self, resource: &str) -> Result<ClientResponse, CoapError> {
            self.request(Code::Get, resource, Vec::new()).await
        }

        /// Send a request with any method
        pub async fn request(
            &mut self,
            code: Code,
            resource: &str,
            payload: Vec<u8>,
        ) -> Result<ClientResponse, CoapError> {
            let mut msg = CoapMessage::new();
            msg.set_type(if self.config.confirmable {
                MessageType::Confirmable
            } else {
                MessageType::NonConfirmable
            });
            msg.set_code(code);
            let message_id = self.next_message_id();
            msg.set_message_id(message_id);
            msg.set_token(message_id.to_be_bytes().to_vec());
            msg.add_uri_path(resource);
            msg.set_payload(payload);

            self.send_and_receive(msg).await
        }

        /// Connection statistics
        pub fn stats(&self) -> ConnectionStats {
            self.stats
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Internal: Send message and wait for the matching response
        async fn send_and_receive(&mut self, msg: CoapMessage) -> Result<ClientResponse, CoapError> {
            let request = msg.to_bytes()?;
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            // Send with retransmissions
            for attempt in 0..=self.config.max_retransmit {
                self.socket
                    .send_to(&request, self.config.endpoint)
                    .await
                    .map_err(CoapError::Network)?;
                self.record(|stats| {
                    stats.messages_sent += 1;
                    stats.bytes_sent += request.len() as u64;
                });

                // Exponential backoff
                let wait = Duration::from_millis(u64::from(self.config.ack_timeout) << attempt);
                let deadline = tokio::time::Instant::now() + wait;

                loop {
                    let received =
                        tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buffer)).await;
                    let (n, from) = match received {
                        Ok(result) => result.map_err(CoapError::Network)?,
                        Err(_) => break,
                    };
                    if from != self.config.endpoint {
                        continue;
                    }
                    let Ok(response) = CoapMessage::parse(&buffer[..n]) else {
                        continue;
                    };
                    if response.get_token() == msg.get_token() {
                        return Ok(ClientResponse {
                            code: response.get_code(),
                            content_format: response.content_format(),
                            payload: response.get_payload().to_vec(),
                        });
                    }
                }
            }

            self.record(|stats| {
                stats.messages_failed += 1;
                stats.last_error = Some(CoapError::MaxRetransmissions.to_string());
            });
            Err(CoapError::MaxRetransmissions)
        }

        fn record(&self, update: impl FnOnce(&mut ConnectionStats)) {
            update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
        }

        fn next_message_id(&mut self) -> u16 {
            self.message_id = self.message_id.wrapping_add(1);
            self.message_id
        }
    }
}
