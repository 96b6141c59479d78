use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    // http error
    #[error("Illegal http method {0:?}, expect GET")]
    HttpMethod(String),

    #[error("Incomplete or malformed http request: {0}")]
    Httparse(#[from] httparse::Error),

    // websocket error
    #[error("Missing or illegal upgrade header")]
    Upgrade,

    #[error("Missing or illegal connection header")]
    Connection,

    #[error("Missing sec-websocket-key header")]
    SecWebSocketKey,

    #[error("Illegal sec-websocket-key {0:?}")]
    IllegalSecWebSocketKey(String),

    #[error("Missing or illegal sec-websocket-version")]
    SecWebSocketVersion,

    // host error
    #[error("Http server does not support hijacking")]
    HijackUnsupported,

    #[error("Failed to hijack connection: {0}")]
    Hijack(#[source] std::io::Error),

    // read
    #[error("Not enough data to parse")]
    NotEnoughData,

    #[error("Request does not fit in {0} bytes")]
    NotEnoughCapacity(usize),

    #[error("Failed to read request: {0}")]
    Read(#[source] std::io::Error),

    // write
    #[error("Failed to write handshake response: {0}")]
    Write(#[source] std::io::Error),
}

impl HandshakeError {
    /// Http status to answer a failed upgrade with, as long as the
    /// connection has not been hijacked yet.
    pub const fn status(&self) -> (u16, &'static str) {
        use HandshakeError::*;
        match self {
            HttpMethod(_) => (405, "Method Not Allowed"),
            SecWebSocketVersion => (426, "Upgrade Required"),
            NotEnoughCapacity(_) => (431, "Request Header Fields Too Large"),
            HijackUnsupported | Hijack(_) | Read(_) | Write(_) => (500, "Internal Server Error"),
            _ => (400, "Bad Request"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status() {
        assert_eq!(HandshakeError::HttpMethod("POST".into()).status().0, 405);
        assert_eq!(HandshakeError::SecWebSocketVersion.status().0, 426);
        assert_eq!(HandshakeError::Upgrade.status().0, 400);
        assert_eq!(HandshakeError::SecWebSocketKey.status().0, 400);
        assert_eq!(HandshakeError::HijackUnsupported.status().0, 500);
    }
}
