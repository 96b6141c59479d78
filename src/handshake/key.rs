//! Key exchange.

use super::GUID;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};

/// Derive `sec-websocket-accept` from `sec-websocket-key`.
///
/// Surrounding whitespace of the key is ignored.
#[inline]
pub fn derive_accept_key(sec_key: &str) -> String {
    let mut sha1 = Sha1::default();
    sha1.update(sec_key.trim().as_bytes());
    sha1.update(GUID);
    STANDARD.encode(sha1.finalize())
}

/// Check that a `sec-websocket-key` is the base64 form of 16 bytes.
#[inline]
pub fn is_valid_sec_key(sec_key: &str) -> bool {
    matches!(STANDARD.decode(sec_key.trim()), Ok(raw) if raw.len() == 16)
}
