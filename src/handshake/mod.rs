//! Websocket handshake.

pub mod key;
pub mod negotiate;
pub mod response;

pub use response::Response;
pub use key::derive_accept_key;
pub use negotiate::{negotiate, select_protocol};

/// 258EAFA5-E914-47DA-95CA-C5AB0DC85B11
pub const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// GET
pub const HTTP_METHOD: &[u8] = b"GET";

/// HTTP/1.1
pub const HTTP_VERSION: &[u8] = b"HTTP/1.1";

/// CRLF
pub const HTTP_LINE_BREAK: &[u8] = b"\r\n";

/// A colon + one SP is prefered
pub const HTTP_HEADER_SP: &[u8] = b": ";

/// HTTP/1.1 101 Switching Protocols
pub const HTTP_STATUS_LINE: &[u8] = b"HTTP/1.1 101 Switching Protocols";

/// 64
pub const MAX_ALLOW_HEADERS: usize = 64;

macro_rules! header {
    (   $(
            $(#[$docs: meta])*
            ($hdr_name: ident => $name: expr);
        )+
    ) => {
        $(
            $(#[$docs])*
            pub const $hdr_name: &[u8] = $name;
        )+
    };
}

/// Static headers of the upgrade response
pub mod static_headers {
    // header name
    header! {
        (HEADER_UPGRADE_NAME => b"Upgrade");

        (HEADER_CONNECTION_NAME => b"Connection");

        (HEADER_SEC_WEBSOCKET_ACCEPT_NAME => b"Sec-WebSocket-Accept");

        (HEADER_SEC_WEBSOCKET_PROTOCOL_NAME => b"Sec-WebSocket-Protocol");
    }

    // header value
    header! {
        (HEADER_UPGRADE_VALUE => b"websocket");

        (HEADER_CONNECTION_VALUE => b"Upgrade");

        (HEADER_SEC_WEBSOCKET_VERSION_VALUE => b"13");
    }
}

/// A minimal http error response, for a request that failed the handshake
/// before its connection was hijacked.
pub fn reject_response(status: u16, reason: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(HTTP_VERSION);
    buf.extend_from_slice(format!(" {} {}", status, reason).as_bytes());
    buf.extend_from_slice(HTTP_LINE_BREAK);
    buf.extend_from_slice(b"Connection: close");
    buf.extend_from_slice(HTTP_LINE_BREAK);
    buf.extend_from_slice(b"Content-Length: 0");
    buf.extend_from_slice(HTTP_LINE_BREAK);
    buf.extend_from_slice(HTTP_LINE_BREAK);
    buf
}
