//! Server side websocket on top of an http server that can hand over
//! its raw sockets.
//!
//! ## Features
//! - Handshake checks run before the socket is hijacked, a failed upgrade
//!   can still be answered with a plain http error.
//! - Fragmented messages are reassembled, control frames are served in
//!   between without disturbing them.
//! - Blocking (thread per connection) and async (tokio, feature `async`)
//!   dispatch loops share the same config and callbacks.
//!
//! ## High-level API
//!
//! - [`server`]
//! - [`http`]
//! - [`connection`]
//!
//! ```ignore
//! {
//!     let server = Server::new(config, callbacks);
//!     // read a request off a socket, or implement `UpgradeRequest` and
//!     // `Hijack` for the request type of another http server
//!     let incoming = Incoming::read_from(tcp)?;
//!     server.serve(incoming)?;
//! }
//! ```
//!
//! ## Low-level API
//!
//! - [`frame`]
//! - [`handshake`]
//! - [`message`]
//!
//! Frame:
//!
//! ```ignore
//! {
//!     // encode a frame head
//!     let head = FrameHead::new(...);
//!     let offset = head.encode(&mut buf)?;
//!
//!     // decode a frame head
//!     let (head, offset) = FrameHead::decode(&buf)?;
//!
//!     // read a whole frame
//!     let frame = Frame::read_from(&mut tcp, max_payload)?;
//! }
//! ```
//!
//! Handshake:
//!
//! ```ignore
//! {
//!     // check a request, build the response
//!     let response = negotiate(&request, &["chat"])?;
//!     let n = response.encode(&mut buf);
//! }
//! ```

pub mod error;
pub mod frame;
pub mod handshake;
pub mod http;
pub mod connection;
pub mod message;
pub mod server;

pub use error::Error;
pub use frame::{Frame, OpCode};
pub use http::{Hijack, Hijacked, HttpRequest, Incoming, UpgradeRequest};
pub use connection::{Connection, Transport};
pub use message::Message;
pub use server::{Callbacks, Server, ServerConfig};

#[cfg(feature = "async")]
pub use connection::{AsyncConnection, AsyncTransport};
