use std::io;
use std::net::SocketAddr;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{closed_error, handshake_write_error, peer_label, Rewind};
use crate::frame::Frame;
use crate::handshake::Response;
use crate::http::Hijacked;
use crate::server::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{Error, ProtocolViolation};

/// Async raw bidirectional byte stream.
pub trait AsyncTransport: AsyncRead + AsyncWrite + Unpin {
    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

impl AsyncTransport for TcpStream {
    #[inline]
    fn local_addr(&self) -> io::Result<SocketAddr> { TcpStream::local_addr(self) }

    #[inline]
    fn peer_addr(&self) -> io::Result<SocketAddr> { TcpStream::peer_addr(self) }
}

/// Async websocket connection, server side.
///
/// Besides the `send_*` family, frames can be queued without awaiting
/// and written later by [`flush`](Self::flush). Queued frames are kept
/// in order, and always go out before any frame sent afterwards.
pub struct AsyncConnection<IO: AsyncTransport> {
    reader: BufReader<Rewind<IO>>,
    wbuf: Vec<u8>,
    max_frame_size: usize,
    peer: String,
    closing: bool,
    closed: bool,
}

impl<IO: AsyncTransport> std::fmt::Debug for AsyncConnection<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncConnection")
            .field("peer", &self.peer)
            .field("max_frame_size", &self.max_frame_size)
            .field("queued", &self.wbuf.len())
            .field("closing", &self.closing)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<IO: AsyncTransport> AsyncConnection<IO> {
    #[inline]
    pub fn new(hijacked: Hijacked<IO>) -> Self {
        Self::with_limits(hijacked, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_limits(hijacked: Hijacked<IO>, buffer_size: usize, max_frame_size: usize) -> Self {
        let Hijacked { io, buffered } = hijacked;
        let peer = peer_label(io.peer_addr());
        Self {
            reader: BufReader::with_capacity(buffer_size, Rewind::new(buffered, io)),
            wbuf: Vec::with_capacity(buffer_size),
            max_frame_size,
            peer,
            closing: false,
            closed: false,
        }
    }

    /// Async version of [`Connection::read_frame`](super::Connection::read_frame).
    pub async fn read_frame(&mut self) -> Result<Frame, Error> {
        if self.closed {
            return Err(closed_error());
        }

        let frame = Frame::read_from_async(&mut self.reader, self.max_frame_size).await?;

        trace!(
            "{}: read {} frame, fin={}, len={}",
            self.peer,
            frame.opcode,
            frame.fin,
            frame.payload_len()
        );

        if !frame.is_masked() {
            return Err(ProtocolViolation::UnmaskedFrame.into());
        }
        Ok(frame)
    }

    /// Append a frame to the write queue.
    pub fn queue_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        if self.closed || self.closing {
            return Err(closed_error());
        }

        frame.encode(&mut self.wbuf)?;

        trace!(
            "{}: queue {} frame, fin={}, len={}",
            self.peer,
            frame.opcode,
            frame.fin,
            frame.payload_len()
        );
        Ok(())
    }

    #[inline]
    pub fn queue_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.queue_frame(&Frame::text(text))
    }

    #[inline]
    pub fn queue_binary(&mut self, data: impl Into<Vec<u8>>) -> Result<(), Error> {
        self.queue_frame(&Frame::binary(data))
    }

    /// Queue a close frame. Nothing can be queued after it, and a
    /// dispatch loop stops reading once it is flushed.
    pub fn queue_close(&mut self, code: Option<u16>) -> Result<(), Error> {
        self.queue_frame(&Frame::close(code))?;
        self.closing = true;
        Ok(())
    }

    /// Whether a close frame was queued.
    #[inline]
    pub const fn is_closing(&self) -> bool { self.closing }

    /// Write out everything queued so far.
    pub async fn flush(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(closed_error());
        }
        if self.wbuf.is_empty() {
            return Ok(());
        }

        let io = self.reader.get_mut();
        io.write_all(&self.wbuf).await?;
        io.flush().await?;
        self.wbuf.clear();
        Ok(())
    }

    /// Queue one frame and flush.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        self.queue_frame(frame)?;
        self.flush().await
    }

    pub async fn write_handshake(&mut self, response: &Response) -> Result<(), Error> {
        if self.closed {
            return Err(closed_error());
        }

        response.encode(&mut self.wbuf);
        self.flush().await.map_err(handshake_write_error)
    }

    #[inline]
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.write_frame(&Frame::text(text)).await
    }

    #[inline]
    pub async fn send_binary(&mut self, data: impl Into<Vec<u8>>) -> Result<(), Error> {
        self.write_frame(&Frame::binary(data)).await
    }

    #[inline]
    pub async fn send_close(&mut self, code: Option<u16>) -> Result<(), Error> {
        self.write_frame(&Frame::close(code)).await
    }

    /// Shut down the socket, frames still queued are discarded.
    /// Calling it again is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.wbuf.clear();

        if let Err(e) = self.reader.get_mut().get_mut().shutdown().await {
            trace!("{}: shutdown: {}", self.peer, e);
        }
        debug!("{}: closed", self.peer);
    }

    #[inline]
    pub const fn is_closed(&self) -> bool { self.closed }

    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.get_ref().local_addr() }

    #[inline]
    pub fn remote_addr(&self) -> io::Result<SocketAddr> { self.get_ref().peer_addr() }

    #[inline]
    pub fn peer(&self) -> &str { &self.peer }

    #[inline]
    pub fn get_ref(&self) -> &IO { self.reader.get_ref().get_ref() }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::connection::test::{client_frame, server_frames, LOCAL, PEER};
    use crate::frame::OpCode;
    use tokio::io::{AsyncReadExt, DuplexStream};

    impl AsyncTransport for DuplexStream {
        fn local_addr(&self) -> io::Result<SocketAddr> { Ok(LOCAL) }

        fn peer_addr(&self) -> io::Result<SocketAddr> { Ok(PEER) }
    }

    #[tokio::test]
    async fn read_write_frames() {
        let (mut client, server) = tokio::io::duplex(1 << 16);

        // the first bytes were read by the http layer
        let mut pre = client_frame(true, OpCode::Text, b"hello");
        let post = pre.split_off(3);
        client.write_all(&post).await.unwrap();
        client.write_all(&client_frame(true, OpCode::Ping, b"p")).await.unwrap();

        let mut conn = AsyncConnection::new(Hijacked::new(server, pre));
        assert_eq!(conn.peer(), PEER.to_string());

        let frame = conn.read_frame().await.unwrap();
        assert_eq!(frame.payload, b"hello");
        let ping = conn.read_frame().await.unwrap();
        assert_eq!(ping.opcode, OpCode::Ping);

        conn.queue_text("a").unwrap();
        conn.queue_binary(vec![1]).unwrap();
        conn.write_frame(&ping.into_pong()).await.unwrap();
        conn.queue_close(Some(1001)).unwrap();
        assert!(conn.is_closing());
        assert!(conn.queue_text("late").is_err());
        conn.flush().await.unwrap();

        conn.close().await;
        conn.close().await;
        assert!(conn.is_closed());
        assert!(conn.send_text("late").await.is_err());

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        assert_eq!(
            server_frames(&wire),
            vec![
                Frame::text("a"),
                Frame::binary(vec![1]),
                Frame::pong(b"p".to_vec()),
                Frame::close(Some(1001)),
            ]
        );
    }

    #[tokio::test]
    async fn read_unmasked_frame() {
        let (mut client, server) = tokio::io::duplex(1024);
        Frame::text("plain").write_to_async(&mut client).await.unwrap();

        let mut conn = AsyncConnection::new(Hijacked::new(server, Vec::new()));
        let err = conn.read_frame().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolViolation::UnmaskedFrame)));
    }

    #[tokio::test]
    async fn read_eof() {
        let (client, server) = tokio::io::duplex(1024);
        drop(client);

        let mut conn = AsyncConnection::new(Hijacked::new(server, Vec::new()));
        assert!(conn.read_frame().await.unwrap_err().is_eof());
    }
}
