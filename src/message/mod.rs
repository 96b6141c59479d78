//! Message assembly.
//!
//! [`Assembler`] turns a sequence of received frames into [`Event`]s.
//! Data frames are accumulated until `fin`, control frames pass through
//! immediately and never touch the accumulated payload.

use crate::frame::{Frame, OpCode};
use crate::error::ProtocolViolation;

/// Max payload of a control frame.
pub const MAX_CONTROL_PAYLOAD: u64 = 125;

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Message::Text(s) => s.len(),
            Message::Binary(b) => b.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// What one received frame amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The last frame of a data message arrived.
    Message(Message),
    /// A ping, kept whole so it can be turned into the reply.
    Ping(Frame),
    Pong(Vec<u8>),
    /// Close frame payload, status code and reason if any.
    Close(Vec<u8>),
}

#[derive(Debug)]
enum State {
    AwaitingMessage,
    Accumulating { opcode: OpCode, payload: Vec<u8> },
    Closed,
}

/// Per connection fragmentation state.
#[derive(Debug)]
pub struct Assembler {
    state: State,
    max_message_size: usize,
}

impl Assembler {
    #[inline]
    pub const fn new(max_message_size: usize) -> Self {
        Self {
            state: State::AwaitingMessage,
            max_message_size,
        }
    }

    #[inline]
    pub const fn is_accumulating(&self) -> bool { matches!(self.state, State::Accumulating { .. }) }

    #[inline]
    pub const fn is_closed(&self) -> bool { matches!(self.state, State::Closed) }

    /// Bytes held for the message in progress.
    #[inline]
    pub fn pending_len(&self) -> usize {
        match &self.state {
            State::Accumulating { payload, .. } => payload.len(),
            _ => 0,
        }
    }

    /// Feed one frame.
    ///
    /// Returns `Ok(None)` while a message is incomplete. Any error leaves
    /// the assembler closed, as does a close frame. A closed assembler
    /// ignores whatever it is fed.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Event>, ProtocolViolation> {
        if self.is_closed() {
            return Ok(None);
        }

        let ret = self.advance(frame);
        if ret.is_err() {
            self.state = State::Closed;
        }
        ret
    }

    fn advance(&mut self, frame: Frame) -> Result<Option<Event>, ProtocolViolation> {
        let rsv = frame.rsv();
        if rsv != 0 {
            return Err(ProtocolViolation::ReservedBits(rsv));
        }

        match frame.opcode {
            OpCode::Reserved(x) => Err(ProtocolViolation::ReservedOpCode(x)),
            OpCode::Close | OpCode::Ping | OpCode::Pong => self.control(frame),
            OpCode::Text | OpCode::Binary => self.first(frame),
            OpCode::Continue => self.continuation(frame),
        }
    }

    fn control(&mut self, frame: Frame) -> Result<Option<Event>, ProtocolViolation> {
        if !frame.fin {
            return Err(ProtocolViolation::FragmentedControl);
        }
        if frame.payload_len() > MAX_CONTROL_PAYLOAD {
            return Err(ProtocolViolation::ControlTooLong(frame.payload_len()));
        }

        let event = match frame.opcode {
            OpCode::Ping => Event::Ping(frame),
            OpCode::Pong => Event::Pong(frame.payload),
            _ => {
                self.state = State::Closed;
                Event::Close(frame.payload)
            }
        };
        Ok(Some(event))
    }

    fn first(&mut self, frame: Frame) -> Result<Option<Event>, ProtocolViolation> {
        if self.is_accumulating() {
            return Err(ProtocolViolation::ExpectedContinuation);
        }
        self.check_size(0, frame.payload.len())?;

        if frame.fin {
            return finish(frame.opcode, frame.payload).map(Some);
        }

        self.state = State::Accumulating {
            opcode: frame.opcode,
            payload: frame.payload,
        };
        Ok(None)
    }

    fn continuation(&mut self, frame: Frame) -> Result<Option<Event>, ProtocolViolation> {
        let pending = self.pending_len();
        if !self.is_accumulating() {
            return Err(ProtocolViolation::UnexpectedContinuation);
        }
        self.check_size(pending, frame.payload.len())?;

        if let State::Accumulating { payload, .. } = &mut self.state {
            payload.extend_from_slice(&frame.payload);
        }

        if !frame.fin {
            return Ok(None);
        }

        match std::mem::replace(&mut self.state, State::AwaitingMessage) {
            State::Accumulating { opcode, payload } => finish(opcode, payload).map(Some),
            _ => Err(ProtocolViolation::UnexpectedContinuation),
        }
    }

    #[inline]
    fn check_size(&self, pending: usize, more: usize) -> Result<(), ProtocolViolation> {
        let len = pending.saturating_add(more);
        if len > self.max_message_size {
            return Err(ProtocolViolation::MessageTooLarge {
                len,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

fn finish(opcode: OpCode, payload: Vec<u8>) -> Result<Event, ProtocolViolation> {
    let msg = match opcode {
        OpCode::Text => {
            let text = String::from_utf8(payload).map_err(|_| ProtocolViolation::InvalidUtf8)?;
            Message::Text(text)
        }
        _ => Message::Binary(payload),
    };
    Ok(Event::Message(msg))
}
