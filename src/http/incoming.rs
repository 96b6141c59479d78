use std::io::{Read, Write};

use log::{debug, trace};

use super::{HttpRequest, Hijack, Hijacked, UpgradeRequest};
use crate::handshake::reject_response;
use crate::error::{Error, HandshakeError};

/// Max size of a request head.
pub const MAX_REQUEST_SIZE: usize = 8192;

const READ_CHUNK: usize = 1024;

/// An http request read directly off a socket.
///
/// Holds the socket and any bytes read past the request head,
/// both are handed over on [`hijack`](Hijack::hijack).
#[derive(Debug)]
pub struct Incoming<IO> {
    request: HttpRequest,
    io: IO,
    buffered: Vec<u8>,
}

impl<IO> Incoming<IO> {
    #[inline]
    pub fn new(request: HttpRequest, io: IO, buffered: Vec<u8>) -> Self {
        Self {
            request,
            io,
            buffered,
        }
    }

    #[inline]
    pub fn request(&self) -> &HttpRequest { &self.request }

    #[inline]
    pub fn into_inner(self) -> IO { self.io }

    /// Feed newly read bytes, return the request once it is complete.
    fn advance(buf: &mut Vec<u8>, n: usize) -> Result<Option<HttpRequest>, HandshakeError> {
        match HttpRequest::decode(buf) {
            Ok((request, parse_n)) => {
                // keep whatever the client sent after the head
                buf.drain(..parse_n);
                trace!("request parsed, {} bytes buffered", buf.len());
                Ok(Some(request))
            }
            Err(HandshakeError::NotEnoughData) if buf.len() < MAX_REQUEST_SIZE => {
                trace!("read {} bytes, need more", n);
                Ok(None)
            }
            Err(HandshakeError::NotEnoughData) => {
                Err(HandshakeError::NotEnoughCapacity(MAX_REQUEST_SIZE))
            }
            Err(e) => Err(e),
        }
    }
}

impl<IO: Read + Write> Incoming<IO> {
    /// Read an http request from IO source.
    /// This function will block on reading data, until there is enough
    /// data to parse a request or an error occurs.
    pub fn read_from(mut io: IO) -> Result<Self, Error> {
        let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0_u8; READ_CHUNK];

        loop {
            let n = io.read(&mut chunk).map_err(HandshakeError::Read)?;

            // EOF, no more data
            if n == 0 {
                return Err(HandshakeError::NotEnoughData.into());
            }

            buf.extend_from_slice(&chunk[..n]);

            if let Some(request) = Self::advance(&mut buf, n)? {
                debug!("{} {}", request.method, request.path);
                return Ok(Self::new(request, io, buf));
            }
        }
    }

    /// Answer with an http error and drop the connection.
    pub fn reject(mut self, status: u16, reason: &str) -> std::io::Result<()> {
        self.io.write_all(&reject_response(status, reason))?;
        self.io.flush()
    }
}

impl<IO> UpgradeRequest for Incoming<IO> {
    #[inline]
    fn method(&self) -> &str { self.request.method() }

    #[inline]
    fn header(&self, name: &str) -> Option<&str> { self.request.header(name) }
}

impl<IO> Hijack for Incoming<IO> {
    type Io = IO;

    #[inline]
    fn hijack(self) -> Result<Hijacked<IO>, HandshakeError> {
        Ok(Hijacked::new(self.io, self.buffered))
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "async")] {
        use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

        impl<IO: AsyncRead + AsyncWrite + Unpin> Incoming<IO> {
            /// Async version of [`read_from`](Self::read_from).
            pub async fn read_from_async(mut io: IO) -> Result<Self, Error> {
                let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
                let mut chunk = [0_u8; READ_CHUNK];

                loop {
                    let n = io.read(&mut chunk).await.map_err(HandshakeError::Read)?;

                    // EOF, no more data
                    if n == 0 {
                        return Err(HandshakeError::NotEnoughData.into());
                    }

                    buf.extend_from_slice(&chunk[..n]);

                    if let Some(request) = Self::advance(&mut buf, n)? {
                        debug!("{} {}", request.method, request.path);
                        return Ok(Self::new(request, io, buf));
                    }
                }
            }

            /// Async version of [`reject`](Self::reject).
            pub async fn reject_async(mut self, status: u16, reason: &str) -> std::io::Result<()> {
                self.io.write_all(&reject_response(status, reason)).await?;
                self.io.flush().await
            }
        }
    }
}
