#![allow(missing_docs)]
//! Errors

mod frame;
mod handshake;
mod protocol;

pub use frame::FrameError;
pub use handshake::HandshakeError;
pub use protocol::ProtocolViolation;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Io error: {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// Check if the peer went away in the middle of (or right before) a frame.
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Transport(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Transport(e) => e,
            e => std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        }
    }
}
