//! Server upgrade response.
//!
//! From [RFC-6455 Section 4.2](https://datatracker.ietf.org/doc/html/rfc6455#section-4.2):
//!
//! If the server chooses to accept the incoming connection, it MUST
//! reply with a valid HTTP response.
//!
//! Example:
//!
//! ```text
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! Sec-WebSocket-Protocol: chat
//! ```
//!

use super::{HTTP_STATUS_LINE, HTTP_LINE_BREAK, HTTP_HEADER_SP};
use super::static_headers::*;

/// Http response presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub sec_accept: String,
    pub protocol: Option<String>,
}

macro_rules! write_header {
    ($w: expr, $name: expr, $value: expr) => {{
        $w.extend_from_slice($name);
        $w.extend_from_slice(HTTP_HEADER_SP);
        $w.extend_from_slice($value);
        $w.extend_from_slice(HTTP_LINE_BREAK);
    }};
}

impl Response {
    #[inline]
    pub fn new(sec_accept: String, protocol: Option<String>) -> Self {
        Self {
            sec_accept,
            protocol,
        }
    }

    /// Append the response to `buf`, return the number of written bytes.
    ///
    /// Necessary headers, including `Upgrade`, `Connection`, and
    /// `Sec-WebSocket-Accept` are written first, then `Sec-WebSocket-Protocol`
    /// if a protocol was negotiated. The response ends with an empty line.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let beg = buf.len();

        // HTTP/1.1 101 Switching Protocols
        buf.extend_from_slice(HTTP_STATUS_LINE);
        buf.extend_from_slice(HTTP_LINE_BREAK);

        // Upgrade: websocket
        write_header!(buf, HEADER_UPGRADE_NAME, HEADER_UPGRADE_VALUE);

        // Connection: Upgrade
        write_header!(buf, HEADER_CONNECTION_NAME, HEADER_CONNECTION_VALUE);

        // Sec-WebSocket-Accept: {sec_accept}
        write_header!(buf, HEADER_SEC_WEBSOCKET_ACCEPT_NAME, self.sec_accept.as_bytes());

        // Sec-WebSocket-Protocol: {protocol}
        if let Some(protocol) = &self.protocol {
            write_header!(buf, HEADER_SEC_WEBSOCKET_PROTOCOL_NAME, protocol.as_bytes());
        }

        // finish with CRLF
        buf.extend_from_slice(HTTP_LINE_BREAK);

        buf.len() - beg
    }
}
