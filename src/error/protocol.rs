use thiserror::Error;

/// A frame or message that breaks RFC-6455.
///
/// After a violation the frame boundaries can no longer be trusted,
/// so every variant is fatal to the connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("Reserved bits set: {0:#05b}")]
    ReservedBits(u8),

    #[error("Reserved opcode {0:#x}")]
    ReservedOpCode(u8),

    #[error("Unmasked frame from client")]
    UnmaskedFrame,

    #[error("Fragmented control frame")]
    FragmentedControl,

    #[error("Control frame payload too long: {0}")]
    ControlTooLong(u64),

    #[error("Continuation frame without a started message")]
    UnexpectedContinuation,

    #[error("New data frame while a fragmented message is in progress")]
    ExpectedContinuation,

    #[error("Frame payload of {len} bytes exceeds limit {max}")]
    FrameTooLarge { len: u64, max: usize },

    #[error("Message of {len} bytes exceeds limit {max}")]
    MessageTooLarge { len: usize, max: usize },

    #[error("Text message is not valid utf-8")]
    InvalidUtf8,
}
