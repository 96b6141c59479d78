//! Server façade.
//!
//! A [`Server`] is built once from a [`ServerConfig`] and a set of
//! [`Callbacks`], then handed every upgrade request. Per request it runs
//! negotiate, hijack, handshake and the dispatch loop, until the
//! connection closes.
//!
//! ```no_run
//! use std::net::TcpListener;
//! use wsupgrade::{Callbacks, Connection, Incoming, Server, ServerConfig};
//!
//! let server = Server::new(
//!     ServerConfig::new().protocol("echo"),
//!     Callbacks::new().on_text_message(|conn: &mut Connection<_>, text| {
//!         let _ = conn.send_text(text);
//!     }),
//! );
//!
//! let listener = TcpListener::bind("127.0.0.1:8080").unwrap();
//! for tcp in listener.incoming() {
//!     let incoming = Incoming::read_from(tcp.unwrap()).unwrap();
//!     server.spawn(incoming);
//! }
//! ```

pub mod config;
pub mod callback;

cfg_if::cfg_if! {
    if #[cfg(feature = "async")] {
        mod async_server;
    }
}

pub use config::ServerConfig;
pub use callback::Callbacks;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::connection::{Connection, Transport};
use crate::frame::Frame;
use crate::handshake::{negotiate, Response};
use crate::http::{Hijack, UpgradeRequest};
use crate::message::{Assembler, Event, Message};
use crate::error::{Error, HandshakeError};

struct Inner<C> {
    config: ServerConfig,
    callbacks: Callbacks<C>,
}

/// Websocket server, generic over the connection type its callbacks take.
///
/// Cloning is cheap, every clone shares the same config and callbacks.
pub struct Server<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for Server<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Server<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.inner.config)
            .field("callbacks", &self.inner.callbacks)
            .finish()
    }
}

impl<C> Server<C> {
    pub fn new(config: ServerConfig, callbacks: Callbacks<C>) -> Self {
        Self {
            inner: Arc::new(Inner { config, callbacks }),
        }
    }

    #[inline]
    pub fn config(&self) -> &ServerConfig { &self.inner.config }

    #[inline]
    pub fn callbacks(&self) -> &Callbacks<C> { &self.inner.callbacks }

    /// Check an upgrade request against this server's config.
    ///
    /// On failure the request is untouched, and the host may answer it
    /// with [`HandshakeError::status`].
    pub fn negotiate<R: UpgradeRequest + ?Sized>(&self, request: &R) -> Result<Response, HandshakeError> {
        negotiate(request, &self.inner.config.protocols).map_err(|e| {
            warn!("upgrade rejected: {}", e);
            e
        })
    }
}

/// Log how a dispatch loop ended.
pub(crate) fn log_exit(peer: &str, ret: &Result<(), Error>) {
    match ret {
        Ok(()) => debug!("{}: connection closed", peer),
        Err(e) if e.is_eof() => debug!("{}: peer went away", peer),
        Err(Error::Protocol(e)) => warn!("{}: protocol violation: {}", peer, e),
        Err(e) => warn!("{}: {}", peer, e),
    }
}

impl<IO: Transport> Server<Connection<IO>> {
    /// Upgrade a request and run its connection to the end, blocking
    /// the current thread.
    ///
    /// Returns `Ok` if the peer closed the connection with a close frame
    /// or a callback closed it.
    pub fn serve<R>(&self, request: R) -> Result<(), Error>
    where
        R: UpgradeRequest + Hijack<Io = IO>,
    {
        let response = self.negotiate(&request)?;
        self.accept(request, &response)
    }

    /// Hijack a request that already passed [`negotiate`](Self::negotiate),
    /// write the response, then run the dispatch loop.
    pub fn accept<R>(&self, request: R, response: &Response) -> Result<(), Error>
    where
        R: Hijack<Io = IO>,
    {
        let config = &self.inner.config;

        let hijacked = request.hijack().map_err(|e| {
            warn!("hijack failed: {}", e);
            e
        })?;

        let mut conn = Connection::with_limits(hijacked, config.buffer_size, config.max_frame_size);
        if let Err(e) = conn.write_handshake(response) {
            warn!("{}: {}", conn.peer(), e);
            return Err(e);
        }

        debug!(
            "{}: upgraded, protocol={:?}",
            conn.peer(),
            response.protocol.as_deref()
        );

        self.run(&mut conn)
    }

    /// Upgrade and serve a request on a new thread.
    pub fn spawn<R>(&self, request: R) -> JoinHandle<Result<(), Error>>
    where
        R: UpgradeRequest + Hijack<Io = IO> + Send + 'static,
        IO: Send + 'static,
    {
        let server = self.clone();
        thread::spawn(move || server.serve(request))
    }

    fn run(&self, conn: &mut Connection<IO>) -> Result<(), Error> {
        let callbacks = &self.inner.callbacks;
        callbacks.connect(conn);

        let ret = self.dispatch(conn);
        callbacks.disconnect(conn);

        let ret = match ret {
            Ok(Some(payload)) if self.inner.config.reply_close && !conn.is_closed() => {
                // best effort, the socket is closed right after
                if let Err(e) = conn.write_frame(&Frame::close_reply(&payload)) {
                    debug!("{}: close reply: {}", conn.peer(), e);
                }
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };

        log_exit(conn.peer(), &ret);
        conn.close();
        ret
    }

    /// Read frames until a close frame arrives, returning its payload.
    /// Returns `None` when a callback closed the connection.
    fn dispatch(&self, conn: &mut Connection<IO>) -> Result<Option<Vec<u8>>, Error> {
        let callbacks = &self.inner.callbacks;
        let mut assembler = Assembler::new(self.inner.config.max_message_size);

        loop {
            if conn.is_closed() {
                return Ok(None);
            }

            let frame = conn.read_frame()?;

            match assembler.push(frame)? {
                None => {}
                Some(Event::Message(Message::Text(text))) => callbacks.text(conn, text),
                Some(Event::Message(Message::Binary(data))) => callbacks.binary(conn, data),
                Some(Event::Ping(ping)) => conn.write_frame(&ping.into_pong())?,
                Some(Event::Pong(_)) => {}
                Some(Event::Close(payload)) => return Ok(Some(payload)),
            }
        }
    }
}
