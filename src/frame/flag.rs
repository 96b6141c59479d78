//! Fin flag, reserved bits and opcode.

/// Fin bit of the first byte.
pub const FIN: u8 = 0x80;

/// Rsv1 bit of the first byte.
pub const RSV1: u8 = 0x40;

/// Rsv2 bit of the first byte.
pub const RSV2: u8 = 0x20;

/// Rsv3 bit of the first byte.
pub const RSV3: u8 = 0x10;

/// All reserved bits.
pub const RSV_MASK: u8 = RSV1 | RSV2 | RSV3;

/// Low 4 bits of the first byte.
pub const OPCODE_MASK: u8 = 0x0f;

/// Frame opcode.
///
/// Reserved opcodes are kept as-is so that the decoder stays
/// policy-free; rejecting them is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// denotes a continuation frame, 0x00
    Continue,
    /// denotes a text frame, 0x01
    Text,
    /// denotes a binary frame, 0x02
    Binary,

    /// denotes a connection close, 0x08
    Close,
    /// denotes a ping, 0x09
    Ping,
    /// denotes a pong, 0x0a
    Pong,

    /// 0x03 - 0x07, 0x0b - 0x0f
    Reserved(u8),
}

impl OpCode {
    /// Parse from byte, only the low 4 bits are used.
    #[inline]
    pub const fn from_flag(b: u8) -> Self {
        use OpCode::*;
        match b & OPCODE_MASK {
            0x00 => Continue,
            0x01 => Text,
            0x02 => Binary,
            0x08 => Close,
            0x09 => Ping,
            0x0a => Pong,
            x => Reserved(x),
        }
    }

    /// Generate the 4-bit flag.
    #[inline]
    pub const fn to_flag(self) -> u8 {
        use OpCode::*;
        match self {
            Continue => 0x00,
            Text => 0x01,
            Binary => 0x02,
            Close => 0x08,
            Ping => 0x09,
            Pong => 0x0a,
            Reserved(x) => x & OPCODE_MASK,
        }
    }

    /// Close, ping, pong, and reserved 0x0b - 0x0f.
    #[inline]
    pub const fn is_control(self) -> bool { self.to_flag() & 0x08 != 0 }

    #[inline]
    pub const fn is_reserved(self) -> bool { matches!(self, OpCode::Reserved(_)) }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use OpCode::*;
        match self {
            Continue => write!(f, "continue"),
            Text => write!(f, "text"),
            Binary => write!(f, "binary"),
            Close => write!(f, "close"),
            Ping => write!(f, "ping"),
            Pong => write!(f, "pong"),
            Reserved(x) => write!(f, "reserved({:#x})", x),
        }
    }
}
