//! Payload length as carried by the frame head.
//!
//! The second head byte holds a 7-bit length. The values 126 and 127 are
//! markers for a 16-bit or 64-bit length in the bytes right after it.
//! Frames written by this crate always use the shortest form, frames
//! read from a peer keep whatever form it chose.

/// Payload length in one of its three wire forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    /// 0 - 125, inside the flag byte
    Short(u8),
    /// flag 126, then 2 bytes
    Ext16(u16),
    /// flag 127, then 8 bytes
    Ext64(u64),
}

use PayloadLen::*;

impl PayloadLen {
    /// Shortest form able to hold `n`.
    #[inline]
    pub const fn from_num(n: u64) -> Self {
        if n <= 125 {
            Short(n as u8)
        } else if n <= u16::MAX as u64 {
            Ext16(n as u16)
        } else {
            Ext64(n)
        }
    }

    #[inline]
    pub const fn to_num(self) -> u64 {
        match self {
            Short(v) => v as u64,
            Ext16(v) => v as u64,
            Ext64(v) => v,
        }
    }

    /// Form announced by the second head byte. The mask bit is ignored.
    ///
    /// An extended form comes back with a zero value, see
    /// [`with_extended`](Self::with_extended).
    #[inline]
    pub const fn from_flag(b: u8) -> Self {
        match b & 0x7f {
            126 => Ext16(0),
            127 => Ext64(0),
            b => Short(b),
        }
    }

    /// Low 7 bits of the second head byte.
    #[inline]
    pub const fn to_flag(&self) -> u8 {
        match self {
            Short(b) => *b,
            Ext16(_) => 126,
            Ext64(_) => 127,
        }
    }

    /// Bytes between the flag byte and the mask key.
    #[inline]
    pub const fn extra_len(&self) -> usize {
        match self {
            Short(_) => 0,
            Ext16(_) => 2,
            Ext64(_) => 8,
        }
    }

    /// Fill in the value from the extended length bytes, big-endian.
    ///
    /// `ext` must be exactly [`extra_len`](Self::extra_len) bytes,
    /// otherwise the length is returned unchanged.
    pub fn with_extended(self, ext: &[u8]) -> Self {
        match self {
            Ext16(_) => match <[u8; 2]>::try_from(ext) {
                Ok(b2) => Ext16(u16::from_be_bytes(b2)),
                Err(_) => self,
            },
            Ext64(_) => match <[u8; 8]>::try_from(ext) {
                Ok(b8) => Ext64(u64::from_be_bytes(b8)),
                Err(_) => self,
            },
            Short(_) => self,
        }
    }

    /// Write the extended length bytes into `buf`, returns how many.
    pub fn write_extended(&self, buf: &mut [u8; 8]) -> usize {
        match self {
            Short(_) => 0,
            Ext16(v) => {
                buf[..2].copy_from_slice(&v.to_be_bytes());
                2
            }
            Ext64(v) => {
                *buf = v.to_be_bytes();
                8
            }
        }
    }
}
