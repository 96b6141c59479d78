//! Validate an upgrade request and pick a sub-protocol.

use log::debug;

use super::Response;
use super::key::{derive_accept_key, is_valid_sec_key};
use super::static_headers::*;
use super::HTTP_METHOD;
use crate::http::UpgradeRequest;
use crate::error::HandshakeError;

macro_rules! handshake_check {
    ($value: expr, $e: expr) => {
        match $value {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Err($e),
        }
    };
}

/// Pick the first protocol in `supported` that the client also offers.
///
/// `offered` is the raw, comma-separated `Sec-WebSocket-Protocol` value.
/// Server order wins, client order is irrelevant.
pub fn select_protocol<'a, S: AsRef<str>>(supported: &'a [S], offered: &str) -> Option<&'a str> {
    let offered: Vec<&str> = offered
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    supported
        .iter()
        .map(AsRef::as_ref)
        .find(|p| offered.contains(p))
}

/// Check an upgrade request and build the response to it.
///
/// Nothing is written here, so a failed check still leaves the host
/// free to answer with an ordinary http error.
pub fn negotiate<R, S>(request: &R, protocols: &[S]) -> Result<Response, HandshakeError>
where
    R: UpgradeRequest + ?Sized,
    S: AsRef<str>,
{
    let method = request.method();
    // methods are case sensitive
    if method.as_bytes() != HTTP_METHOD {
        return Err(HandshakeError::HttpMethod(method.to_string()));
    }

    // header values here are case insensitive
    // ref: https://datatracker.ietf.org/doc/html/rfc6455#section-4.2.1
    let upgrade = handshake_check!(request.header("upgrade"), HandshakeError::Upgrade);
    if !upgrade.trim().eq_ignore_ascii_case("websocket") {
        return Err(HandshakeError::Upgrade);
    }

    let connection = handshake_check!(request.header("connection"), HandshakeError::Connection);
    if !connection
        .split(',')
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    {
        return Err(HandshakeError::Connection);
    }

    let version = handshake_check!(
        request.header("sec-websocket-version"),
        HandshakeError::SecWebSocketVersion
    );
    if version.trim().as_bytes() != HEADER_SEC_WEBSOCKET_VERSION_VALUE {
        return Err(HandshakeError::SecWebSocketVersion);
    }

    let sec_key = handshake_check!(
        request.header("sec-websocket-key"),
        HandshakeError::SecWebSocketKey
    );
    if !is_valid_sec_key(sec_key) {
        return Err(HandshakeError::IllegalSecWebSocketKey(sec_key.to_string()));
    }

    let protocol = request
        .header("sec-websocket-protocol")
        .and_then(|offered| select_protocol(protocols, offered))
        .map(str::to_string);

    debug!("negotiated protocol: {:?}", protocol);

    Ok(Response::new(derive_accept_key(sec_key), protocol))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::HttpRequest;

    fn request(method: &str, headers: &[(&str, &str)]) -> HttpRequest {
        HttpRequest::new(
            method,
            "/ws",
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn upgrade_headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Host", "www.example.com"),
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ("Sec-WebSocket-Version", "13"),
        ]
    }

    fn without(name: &str) -> Vec<(&'static str, &'static str)> {
        upgrade_headers()
            .into_iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(name))
            .collect()
    }

    fn with(name: &'static str, value: &'static str) -> Vec<(&'static str, &'static str)> {
        let mut headers = without(name);
        headers.push((name, value));
        headers
    }

    const NO_PROTOCOL: &[&str] = &[];

    #[test]
    fn server_order_wins() {
        let supported = ["chat", "cursor"];
        assert_eq!(select_protocol(&supported, "cursor, chat"), Some("chat"));
        assert_eq!(select_protocol(&supported, "cursor"), Some("cursor"));
        assert_eq!(select_protocol(&supported, " chat ,cursor "), Some("chat"));
        assert_eq!(select_protocol(&supported, "superchat"), None);
        assert_eq!(select_protocol(&supported, ""), None);
        assert_eq!(select_protocol(NO_PROTOCOL, "chat"), None);
        // exact match only
        assert_eq!(select_protocol(&supported, "Chat"), None);
    }

    #[test]
    fn accept() {
        let req = request("GET", &upgrade_headers());
        let response = negotiate(&req, NO_PROTOCOL).unwrap();
        assert_eq!(response.sec_accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert_eq!(response.protocol, None);
    }

    #[test]
    fn accept_with_protocol() {
        let supported = vec!["chat".to_string(), "cursor".to_string()];

        let req = request("GET", &with("Sec-WebSocket-Protocol", "cursor, chat"));
        let response = negotiate(&req, &supported).unwrap();
        assert_eq!(response.protocol.as_deref(), Some("chat"));

        // no match is not a failure
        let req = request("GET", &with("Sec-WebSocket-Protocol", "mqtt"));
        let response = negotiate(&req, &supported).unwrap();
        assert_eq!(response.protocol, None);
    }

    #[test]
    fn accept_loose_values() {
        let mut headers = with("Connection", "keep-alive, Upgrade");
        headers.retain(|(k, _)| *k != "Upgrade");
        headers.push(("upgrade", "WebSocket"));
        headers.retain(|(k, _)| *k != "Sec-WebSocket-Key");
        headers.push(("sec-websocket-key", "  dGhlIHNhbXBsZSBub25jZQ==  "));

        let req = request("GET", &headers);
        let response = negotiate(&req, NO_PROTOCOL).unwrap();
        assert_eq!(response.sec_accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn reject() {
        macro_rules! reject {
            ($method: expr, $headers: expr, $pat: pat) => {{
                let req = request($method, &$headers);
                let err = negotiate(&req, NO_PROTOCOL).unwrap_err();
                assert!(matches!(err, $pat), "{}", err);
            }};
        }

        reject!("POST", upgrade_headers(), HandshakeError::HttpMethod(_));
        reject!("get", upgrade_headers(), HandshakeError::HttpMethod(_));
        reject!("GET", without("Upgrade"), HandshakeError::Upgrade);
        reject!("GET", with("Upgrade", "h2c"), HandshakeError::Upgrade);
        reject!("GET", without("Connection"), HandshakeError::Connection);
        reject!("GET", with("Connection", "keep-alive"), HandshakeError::Connection);
        reject!("GET", without("Sec-WebSocket-Version"), HandshakeError::SecWebSocketVersion);
        reject!("GET", with("Sec-WebSocket-Version", "8"), HandshakeError::SecWebSocketVersion);
        reject!("GET", without("Sec-WebSocket-Key"), HandshakeError::SecWebSocketKey);
        reject!("GET", with("Sec-WebSocket-Key", "  "), HandshakeError::SecWebSocketKey);
        reject!("GET", with("Sec-WebSocket-Key", "short"), HandshakeError::IllegalSecWebSocketKey(_));
    }
}
