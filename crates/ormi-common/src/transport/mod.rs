//! ORMI Transport Layer
//!
//! This module provides the framing shared between servers and clients.
//!
//! # Architecture
//!
//! - **Stream / datagram**: one `service|method|params` line per connection
//!   or datagram, one reply line back ([`LineCodec`])
//! - **HTTP**: JSON array body in, JSON result or JSON error envelope out
//!   ([`HttpTransport`])
//!
//! # Size Limits
//!
//! Stream request lines are capped at [`MAX_LINE_LENGTH`]; datagrams at
//! [`MAX_DATAGRAM_SIZE`], the largest UDP payload over IPv4.

pub mod codec;
pub mod http;

pub use codec::{LineCodec, Reply, RequestLine, ERROR_PREFIX, HEARTBEAT, HEARTBEAT_ACK, SEPARATOR};
pub use http::{ErrorBody, HttpTransport, HyperRequest, HyperResponse, INVOKE_BASE_PATH, JSON_CONTENT_TYPE};

/// Maximum request line length for the stream transport (1 MB)
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Maximum datagram payload
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[cfg(test)]
mod tests;
