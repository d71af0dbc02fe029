//! CoAP Endpoint Defaults

/// IANA-assigned CoAP port (RFC 7252 §12.6).
pub const COAP_DEFAULT_PORT: u16 = 5683;

/// Interface the resource server binds to when none is configured (all IPv4).
pub const DEFAULT_BIND_IP: [u8; 4] = [0, 0, 0, 0];

/// Largest datagram the server reads.
///
/// RFC 7252 §4.6 recommends staying under 1152 bytes of message; requests for
/// sensor resources are a few dozen bytes.
pub const MAX_DATAGRAM_SIZE: usize = 1152;
