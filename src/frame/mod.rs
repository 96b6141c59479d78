//! Websocket data frame.
//!
//! [RFC-6455 Section5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! :                     Payload Data continued ...                :
//! + - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - +
//! |                     Payload Data continued ...                |
//! +---------------------------------------------------------------+
//! ```
//!
//! [`FrameHead`] encodes/decodes the head over byte slices,
//! [`Frame`] reads/writes a whole frame over a byte stream.
//! Neither of them applies any policy: reserved bits and opcodes are
//! decoded as-is, and a frame is masked whenever the caller asks for it.

pub mod flag;
pub mod length;
pub mod mask;

pub use flag::OpCode;
pub use length::PayloadLen;
pub use mask::Mask;

use std::io::{Read, Write};

use flag::{FIN, RSV1, RSV2, RSV3, RSV_MASK};
use mask::apply_mask4;
use crate::error::{Error, FrameError, ProtocolViolation};

/// 2 + 8 + 4
pub const MAX_HEAD_LEN: usize = 14;

/// 1000, normal closure
pub const CLOSE_NORMAL: u16 = 1000;

/// 1002, protocol error
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;

/// Whether a close status code may appear on the wire.
///
/// [RFC-6455 Section7.4](https://datatracker.ietf.org/doc/html/rfc6455#section-7.4)
#[inline]
pub const fn is_sendable_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999)
}

/// Websocket frame head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: bool,
    /// rsv1, rsv2, rsv3 in their original bit positions.
    pub rsv: u8,
    pub opcode: OpCode,
    pub mask: Mask,
    pub length: PayloadLen,
}

impl FrameHead {
    /// Constructor, reserved bits are left clear.
    #[inline]
    pub const fn new(fin: bool, opcode: OpCode, mask: Mask, length: PayloadLen) -> Self {
        Self {
            fin,
            rsv: 0,
            opcode,
            mask,
            length,
        }
    }

    /// Total head length, derived from the second byte of a frame.
    #[inline]
    pub const fn head_len(b2: u8) -> usize {
        let mask_len = if Mask::from_flag(b2).is_masked() { 4 } else { 0 };
        2 + PayloadLen::from_flag(b2).extra_len() + mask_len
    }

    /// Encode to provided buffer, returns the count of written bytes.
    /// The caller should ensure the buffer is large enough,
    /// otherwise a [`FrameError::NotEnoughCapacity`] error will be returned.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, FrameError> {
        let mut n: usize = 0;

        macro_rules! writex {
            ($src: expr) => {{
                let src: &[u8] = $src;
                match buf.get_mut(n..n + src.len()) {
                    Some(dst) => dst.copy_from_slice(src),
                    None => return Err(FrameError::NotEnoughCapacity),
                }
                n += src.len();
            }};
        }

        // fin, rsv, opcode
        let fin = if self.fin { FIN } else { 0 };
        let b1 = fin | (self.rsv & RSV_MASK) | self.opcode.to_flag();

        // mask, payload length
        let b2 = self.mask.to_flag() | self.length.to_flag();

        writex!(&[b1, b2]);

        // extended payload length
        let mut ext = [0_u8; 8];
        let ext_n = self.length.write_extended(&mut ext);
        writex!(&ext[..ext_n]);

        // mask key
        if let Mask::Key(k) = &self.mask {
            writex!(k);
        }

        Ok(n)
    }

    /// Parse from provided buffer, returns [`FrameHead`] and the count of read bytes
    /// if the parse succeeds.
    /// If there is not enough data to parse, a [`FrameError::NotEnoughData`] error
    /// will be returned.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), FrameError> {
        let (b1, b2) = match buf {
            [b1, b2, ..] => (*b1, *b2),
            _ => return Err(FrameError::NotEnoughData),
        };

        let total = Self::head_len(b2);
        if buf.len() < total {
            return Err(FrameError::NotEnoughData);
        }

        let fin = b1 & FIN != 0;
        let rsv = b1 & RSV_MASK;
        let opcode = OpCode::from_flag(b1);

        let mut mask = Mask::from_flag(b2);
        let length = PayloadLen::from_flag(b2);
        let mut n: usize = 2 + length.extra_len();
        let length = length.with_extended(&buf[2..n]);

        if mask.is_masked() {
            mask = Mask::Key([buf[n], buf[n + 1], buf[n + 2], buf[n + 3]]);
            n += 4;
        }

        Ok((
            FrameHead {
                fin,
                rsv,
                opcode,
                mask,
                length,
            },
            n,
        ))
    }
}

/// A complete websocket frame.
///
/// The payload is always kept in clear text. It is unmasked when read,
/// and masked on the wire only if `mask` holds a key when written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: OpCode,
    pub mask: Mask,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Constructor, reserved bits are left clear.
    #[inline]
    pub fn new(fin: bool, opcode: OpCode, mask: Mask, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            mask,
            payload,
        }
    }

    /// A final, unmasked text frame.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(true, OpCode::Text, Mask::None, text.into().into_bytes())
    }

    /// A final, unmasked binary frame.
    #[inline]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, Mask::None, data.into())
    }

    #[inline]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, Mask::None, data.into())
    }

    #[inline]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, Mask::None, data.into())
    }

    /// A close frame, with an optional status code.
    #[inline]
    pub fn close(code: Option<u16>) -> Self {
        let payload = code.map(|c| c.to_be_bytes().to_vec()).unwrap_or_default();
        Self::new(true, OpCode::Close, Mask::None, payload)
    }

    /// Answer to a received close frame.
    ///
    /// A legal status code is echoed, an empty payload gets an empty reply.
    /// A code that may not appear on the wire is answered with 1000, and a
    /// payload too short to hold a code with 1002.
    pub fn close_reply(payload: &[u8]) -> Self {
        match payload {
            [] => Self::close(None),
            [_] => Self::close(Some(CLOSE_PROTOCOL_ERROR)),
            [a, b, ..] => {
                let code = u16::from_be_bytes([*a, *b]);
                if is_sendable_close_code(code) {
                    Self::close(Some(code))
                } else {
                    Self::close(Some(CLOSE_NORMAL))
                }
            }
        }
    }

    /// Rewrite a received ping into the pong that answers it.
    /// The payload is kept, the mask is dropped.
    #[inline]
    pub fn into_pong(mut self) -> Self {
        self.opcode = OpCode::Pong;
        self.mask = Mask::None;
        self
    }

    /// Logical payload length, whichever wire encoding carries it.
    #[inline]
    pub fn payload_len(&self) -> u64 { self.payload.len() as u64 }

    #[inline]
    pub const fn is_masked(&self) -> bool { self.mask.is_masked() }

    #[inline]
    pub const fn masking_key(&self) -> Option<[u8; 4]> {
        match self.mask {
            Mask::Key(k) => Some(k),
            Mask::None => None,
        }
    }

    /// Reserved bits in their original bit positions.
    #[inline]
    pub const fn rsv(&self) -> u8 {
        (if self.rsv1 { RSV1 } else { 0 })
            | (if self.rsv2 { RSV2 } else { 0 })
            | (if self.rsv3 { RSV3 } else { 0 })
    }

    #[inline]
    pub fn head(&self) -> FrameHead {
        FrameHead {
            fin: self.fin,
            rsv: self.rsv(),
            opcode: self.opcode,
            mask: self.mask,
            length: PayloadLen::from_num(self.payload_len()),
        }
    }

    /// Build from a decoded head and the raw payload read after it,
    /// unmasking the payload in place.
    #[inline]
    pub fn from_head(head: FrameHead, mut payload: Vec<u8>) -> Self {
        if let Mask::Key(key) = head.mask {
            apply_mask4(key, &mut payload);
        }
        Self {
            fin: head.fin,
            rsv1: head.rsv & RSV1 != 0,
            rsv2: head.rsv & RSV2 != 0,
            rsv3: head.rsv & RSV3 != 0,
            opcode: head.opcode,
            mask: head.mask,
            payload,
        }
    }

    /// Append the wire representation to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), FrameError> {
        let mut head = [0_u8; MAX_HEAD_LEN];
        let n = self.head().encode(&mut head)?;
        buf.reserve(n + self.payload.len());
        buf.extend_from_slice(&head[..n]);

        let beg = buf.len();
        buf.extend_from_slice(&self.payload);
        if let Mask::Key(key) = self.mask {
            apply_mask4(key, &mut buf[beg..]);
        }
        Ok(())
    }

    /// Read exactly one frame.
    ///
    /// A declared payload longer than `max_payload` is rejected before
    /// anything is allocated. A stream closed in the middle of a frame
    /// surfaces as an [`std::io::ErrorKind::UnexpectedEof`] transport error.
    pub fn read_from<R: Read>(r: &mut R, max_payload: usize) -> Result<Self, Error> {
        let mut buf = [0_u8; MAX_HEAD_LEN];
        r.read_exact(&mut buf[..2])?;

        let head_len = FrameHead::head_len(buf[1]);
        r.read_exact(&mut buf[2..head_len])?;

        let (head, _) = FrameHead::decode(&buf[..head_len])?;
        let len = payload_limit(head.length.to_num(), max_payload)?;

        let mut payload = vec![0_u8; len];
        r.read_exact(&mut payload)?;

        Ok(Self::from_head(head, payload))
    }

    /// Write the frame and flush.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        w.write_all(&buf)?;
        w.flush()?;
        Ok(())
    }
}

#[inline]
pub(crate) fn payload_limit(len: u64, max: usize) -> Result<usize, ProtocolViolation> {
    match usize::try_from(len) {
        Ok(n) if n <= max => Ok(n),
        _ => Err(ProtocolViolation::FrameTooLarge { len, max }),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "async")] {
        use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

        impl Frame {
            /// Async version of [`read_from`](Self::read_from).
            pub async fn read_from_async<R>(r: &mut R, max_payload: usize) -> Result<Self, Error>
            where
                R: AsyncRead + Unpin,
            {
                let mut buf = [0_u8; MAX_HEAD_LEN];
                r.read_exact(&mut buf[..2]).await?;

                let head_len = FrameHead::head_len(buf[1]);
                r.read_exact(&mut buf[2..head_len]).await?;

                let (head, _) = FrameHead::decode(&buf[..head_len])?;
                let len = payload_limit(head.length.to_num(), max_payload)?;

                let mut payload = vec![0_u8; len];
                r.read_exact(&mut payload).await?;

                Ok(Self::from_head(head, payload))
            }

            /// Async version of [`write_to`](Self::write_to).
            pub async fn write_to_async<W>(&self, w: &mut W) -> Result<(), Error>
            where
                W: AsyncWrite + Unpin,
            {
                let mut buf = Vec::new();
                self.encode(&mut buf)?;
                w.write_all(&buf).await?;
                w.flush().await?;
                Ok(())
            }
        }
    }
}
