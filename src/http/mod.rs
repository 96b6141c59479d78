//! Http collaborator.
//!
//! The http server itself is not part of this crate. An upgrade only needs
//! two things from it: read access to the request ([`UpgradeRequest`]) and
//! exclusive ownership of the raw socket underneath it ([`Hijack`]).
//!
//! [`Incoming`] is a minimal host which reads one request off a socket,
//! for servers that do not sit behind a full http stack.

mod request;
mod incoming;

pub use request::HttpRequest;
pub use incoming::Incoming;

use crate::error::HandshakeError;

/// Read access to an in-flight http request.
pub trait UpgradeRequest {
    fn method(&self) -> &str;

    /// Header lookup, `name` is case insensitive.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Raw socket taken over from the http layer.
#[derive(Debug)]
pub struct Hijacked<IO> {
    pub io: IO,
    /// Bytes the http layer had already read past the request.
    pub buffered: Vec<u8>,
}

impl<IO> Hijacked<IO> {
    #[inline]
    pub fn new(io: IO, buffered: Vec<u8>) -> Self { Self { io, buffered } }
}

/// Take exclusive ownership of the socket behind a request.
///
/// Hosts which can not do this should return
/// [`HandshakeError::HijackUnsupported`].
pub trait Hijack {
    type Io;

    fn hijack(self) -> Result<Hijacked<Self::Io>, HandshakeError>;
}

impl<T: UpgradeRequest + ?Sized> UpgradeRequest for &T {
    #[inline]
    fn method(&self) -> &str { (**self).method() }

    #[inline]
    fn header(&self, name: &str) -> Option<&str> { (**self).header(name) }
}
