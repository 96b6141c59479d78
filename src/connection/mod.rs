//! Websocket connection.
//!
//! A connection exclusively owns a hijacked socket, reads and writes
//! whole frames, and closes the socket at the latest when dropped.

mod rewind;

cfg_if::cfg_if! {
    if #[cfg(feature = "async")] {
        mod async_conn;
        pub use async_conn::{AsyncConnection, AsyncTransport};
    }
}

pub use rewind::Rewind;

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use log::{debug, trace};

use crate::frame::Frame;
use crate::handshake::Response;
use crate::http::Hijacked;
use crate::server::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{Error, HandshakeError, ProtocolViolation};

/// Raw bidirectional byte stream.
pub trait Transport: Read + Write {
    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Shut down both halves of the stream.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    #[inline]
    fn local_addr(&self) -> io::Result<SocketAddr> { TcpStream::local_addr(self) }

    #[inline]
    fn peer_addr(&self) -> io::Result<SocketAddr> { TcpStream::peer_addr(self) }

    #[inline]
    fn shutdown(&mut self) -> io::Result<()> { TcpStream::shutdown(self, Shutdown::Both) }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    #[inline]
    fn local_addr(&self) -> io::Result<SocketAddr> { (**self).local_addr() }

    #[inline]
    fn peer_addr(&self) -> io::Result<SocketAddr> { (**self).peer_addr() }

    #[inline]
    fn shutdown(&mut self) -> io::Result<()> { (**self).shutdown() }
}

/// Peer address as a log label.
#[inline]
pub(crate) fn peer_label(addr: io::Result<SocketAddr>) -> String {
    addr.map(|a| a.to_string())
        .unwrap_or_else(|_| String::from("unknown"))
}

/// Failing to send the upgrade response is a handshake failure.
#[inline]
pub(crate) fn handshake_write_error(e: Error) -> Error {
    match e {
        Error::Transport(e) => HandshakeError::Write(e).into(),
        e => e,
    }
}

#[inline]
pub(crate) fn closed_error() -> Error {
    Error::Transport(io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
}

/// Blocking websocket connection, server side.
pub struct Connection<IO: Transport> {
    reader: BufReader<Rewind<IO>>,
    wbuf: Vec<u8>,
    max_frame_size: usize,
    peer: String,
    closed: bool,
}

impl<IO: Transport> std::fmt::Debug for Connection<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("max_frame_size", &self.max_frame_size)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<IO: Transport> Connection<IO> {
    /// Create from a hijacked socket, with default limits.
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
            closed: false,
        }
    }

    /// Read exactly one frame, blocking until it is complete.
    ///
    /// Frames from a client must be masked, an unmasked frame is
    /// a [`ProtocolViolation::UnmaskedFrame`].
    pub fn read_frame(&mut self) -> Result<Frame, Error> {
        if self.closed {
            return Err(closed_error());
        }

        let frame = Frame::read_from(&mut self.reader, self.max_frame_size)?;

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

    /// Write one frame and flush.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        if self.closed {
            return Err(closed_error());
        }

        self.wbuf.clear();
        frame.encode(&mut self.wbuf)?;

        trace!(
            "{}: write {} frame, fin={}, len={}",
            self.peer,
            frame.opcode,
            frame.fin,
            frame.payload_len()
        );

        self.write_buffered()
    }

    /// Write the upgrade response, the handshake completes once it is flushed.
    pub fn write_handshake(&mut self, response: &Response) -> Result<(), Error> {
        if self.closed {
            return Err(closed_error());
        }

        self.wbuf.clear();
        response.encode(&mut self.wbuf);
        self.write_buffered().map_err(handshake_write_error)
    }

    fn write_buffered(&mut self) -> Result<(), Error> {
        let io = self.reader.get_mut();
        io.write_all(&self.wbuf)?;
        io.flush()?;
        Ok(())
    }

    #[inline]
    pub fn send_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.write_frame(&Frame::text(text))
    }

    #[inline]
    pub fn send_binary(&mut self, data: impl Into<Vec<u8>>) -> Result<(), Error> {
        self.write_frame(&Frame::binary(data))
    }

    #[inline]
    pub fn send_close(&mut self, code: Option<u16>) -> Result<(), Error> {
        self.write_frame(&Frame::close(code))
    }

    /// Close the underlying socket. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.reader.get_mut().get_mut().shutdown() {
            // the peer may have gone already
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

    /// Peer address, as used in logs.
    #[inline]
    pub fn peer(&self) -> &str { &self.peer }

    #[inline]
    pub fn max_frame_size(&self) -> usize { self.max_frame_size }

    #[inline]
    pub fn get_ref(&self) -> &IO { self.reader.get_ref().get_ref() }
}

impl<IO: Transport> Drop for Connection<IO> {
    fn drop(&mut self) { self.close(); }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::frame::{Mask, OpCode};
    use std::net::{IpAddr, Ipv4Addr};

    pub const PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 50000);
    pub const LOCAL: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80);

    /// In-memory transport, reads at most `rlimit` bytes at a time.
    #[derive(Debug)]
    pub struct LimitReadWriter {
        pub rbuf: Vec<u8>,
        pub wbuf: Vec<u8>,
        pub rlimit: usize,
        pub cursor: usize,
        pub shutdown: usize,
    }

    impl LimitReadWriter {
        pub fn new(rbuf: Vec<u8>, rlimit: usize) -> Self {
            Self {
                rbuf,
                wbuf: Vec::new(),
                rlimit,
                cursor: 0,
                shutdown: 0,
            }
        }
    }

    impl Read for LimitReadWriter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let to_read = std::cmp::min(buf.len(), self.rlimit);
            let left_data = self.rbuf.len() - self.cursor;
            let n = std::cmp::min(to_read, left_data);
            buf[..n].copy_from_slice(&self.rbuf[self.cursor..self.cursor + n]);
            self.cursor += n;
            Ok(n)
        }
    }

    impl Write for LimitReadWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.wbuf.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    impl Transport for LimitReadWriter {
        fn local_addr(&self) -> io::Result<SocketAddr> { Ok(LOCAL) }

        fn peer_addr(&self) -> io::Result<SocketAddr> { Ok(PEER) }

        fn shutdown(&mut self) -> io::Result<()> {
            self.shutdown += 1;
            Ok(())
        }
    }

    /// Wire bytes of a masked client frame.
    pub fn client_frame(fin: bool, opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        let frame = Frame::new(fin, opcode, Mask::Key(rand::random()), payload.to_vec());
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();
        buf
    }

    /// Decode everything the server wrote.
    pub fn server_frames(mut wire: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        while !wire.is_empty() {
            frames.push(Frame::read_from(&mut wire, usize::MAX).unwrap());
        }
        frames
    }

    #[test]
    fn read_frames() {
        let mut data = client_frame(true, OpCode::Text, b"hello");
        data.extend(client_frame(false, OpCode::Binary, &[7; 300]));
        data.extend(client_frame(true, OpCode::Continue, &[8; 70000]));

        for limit in [1, 2, 13, 1024, 100000] {
            let rw = LimitReadWriter::new(data.clone(), limit);
            let mut conn = Connection::new(Hijacked::new(rw, Vec::new()));

            let frame = conn.read_frame().unwrap();
            assert_eq!((frame.fin, frame.opcode), (true, OpCode::Text));
            assert_eq!(frame.payload, b"hello");

            let frame = conn.read_frame().unwrap();
            assert_eq!((frame.fin, frame.opcode), (false, OpCode::Binary));
            assert_eq!(frame.payload, [7; 300]);

            let frame = conn.read_frame().unwrap();
            assert_eq!((frame.fin, frame.opcode), (true, OpCode::Continue));
            assert_eq!(frame.payload_len(), 70000);

            // EOF at a frame boundary is still a transport error
            assert!(conn.read_frame().unwrap_err().is_eof());
        }
    }

    #[test]
    fn read_buffered_before_hijack() {
        let data = client_frame(true, OpCode::Binary, b"0123456789");
        let (pre, post) = data.split_at(5);

        let rw = LimitReadWriter::new(post.to_vec(), 3);
        let mut conn = Connection::new(Hijacked::new(rw, pre.to_vec()));

        assert_eq!(conn.read_frame().unwrap().payload, b"0123456789");
    }

    #[test]
    fn read_unmasked_frame() {
        let mut data = Vec::new();
        Frame::text("plain").encode(&mut data).unwrap();

        let rw = LimitReadWriter::new(data, 64);
        let mut conn = Connection::new(Hijacked::new(rw, Vec::new()));

        let err = conn.read_frame().unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolViolation::UnmaskedFrame)));
    }

    #[test]
    fn read_oversized_frame() {
        let data = client_frame(true, OpCode::Binary, &[0; 2048]);
        let rw = LimitReadWriter::new(data, 64);
        let mut conn = Connection::with_limits(Hijacked::new(rw, Vec::new()), 64, 1024);

        let err = conn.read_frame().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolViolation::FrameTooLarge { len: 2048, max: 1024 })
        ));
    }

    #[test]
    fn write_frames() {
        let mut rw = LimitReadWriter::new(Vec::new(), 0);
        {
            let mut conn = Connection::new(Hijacked::new(&mut rw, Vec::new()));
            conn.send_text("hi").unwrap();
            conn.send_binary(vec![1, 2, 3]).unwrap();
            conn.write_frame(&Frame::pong(b"p".to_vec())).unwrap();
            conn.send_close(Some(1000)).unwrap();
        }

        let frames = server_frames(&rw.wbuf);
        assert_eq!(
            frames,
            vec![
                Frame::text("hi"),
                Frame::binary(vec![1, 2, 3]),
                Frame::pong(b"p".to_vec()),
                Frame::close(Some(1000)),
            ]
        );
        assert!(frames.iter().all(|f| !f.is_masked()));
    }

    #[test]
    fn write_handshake() {
        let mut rw = LimitReadWriter::new(Vec::new(), 0);
        {
            let mut conn = Connection::new(Hijacked::new(&mut rw, Vec::new()));
            let response = Response::new("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=".to_string(), None);
            conn.write_handshake(&response).unwrap();
        }
        assert!(rw.wbuf.starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(rw.wbuf.ends_with(b"\r\n\r\n"));
    }

    #[test]
    fn close_is_idempotent() {
        let mut rw = LimitReadWriter::new(client_frame(true, OpCode::Text, b"x"), 64);
        {
            let mut conn = Connection::new(Hijacked::new(&mut rw, Vec::new()));
            assert_eq!(conn.peer(), PEER.to_string());
            assert_eq!(conn.local_addr().unwrap(), LOCAL);
            assert_eq!(conn.remote_addr().unwrap(), PEER);

            conn.close();
            conn.close();
            assert!(conn.is_closed());

            assert!(conn.read_frame().is_err());
            assert!(conn.send_text("x").is_err());
            // dropped here, still a single shutdown
        }
        assert_eq!(rw.shutdown, 1);
        assert!(rw.wbuf.is_empty());
    }

    #[test]
    fn close_on_drop() {
        let mut rw = LimitReadWriter::new(Vec::new(), 0);
        drop(Connection::new(Hijacked::new(&mut rw, Vec::new())));
        assert_eq!(rw.shutdown, 1);
    }
}
