//! Frame codec seam.
//!
//! The transport never interprets frame contents. It asks a
//! [`FrameCodec`] to turn `(frame, channel)` pairs into bytes and to
//! carve frames off the front of the read buffer.
//!
//! [`AmqpCodec`] is a reference codec for AMQP 0-9-1 general frames:
//!
//! ```text
//! +------+---------+----------+-----------------+-----------+
//! | type | channel |   size   |     payload     | frame-end |
//! |  u8  | u16 BE  |  u32 BE  |   size octets   |   0xCE    |
//! +------+---------+----------+-----------------+-----------+
//! ```
//!
//! Method, content header, and body payloads are passed through as raw
//! bytes; decoding the AMQP method set belongs to a higher layer.

use bytes::{BufMut, Bytes, BytesMut};

/// Largest frame the transport reads or writes, in bytes.
pub const FRAME_MAX_SIZE: usize = 131_072;

const HEADER_LEN: usize = 7;
const FRAME_END: u8 = 0xCE;

/// Why a buffer could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown frame type {0}")]
    UnknownFrameType(u8),

    #[error("frame payload of {size} bytes exceeds the {max} byte limit")]
    Oversized { size: usize, max: usize },

    #[error("expected frame-end octet 0xCE, found {0:#04x}")]
    BadFrameEnd(u8),
}

/// Outcome of one decode attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded<F> {
    /// A complete frame was found at the front of the buffer.
    Frame {
        consumed: usize,
        channel: u16,
        frame: F,
    },

    /// The buffer holds a partial frame; wait for more bytes.
    NeedMoreData,

    /// The front of the buffer cannot be decoded.
    Malformed(CodecError),
}

/// Turns frames into bytes and back.
///
/// Implementations must be stateless with respect to the stream: every
/// `unmarshal` call starts at the first unconsumed byte.
pub trait FrameCodec: Send + Sync + 'static {
    type Frame: Send + 'static;

    /// Encodes `frame` for `channel`.
    fn marshal(&self, frame: &Self::Frame, channel: u16) -> Bytes;

    /// Attempts to decode one frame from the front of `buffer`.
    fn unmarshal(&self, buffer: &[u8]) -> Decoded<Self::Frame>;
}

/// AMQP general frame types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Method,
    Header,
    Body,
    Heartbeat,
}

impl FrameKind {
    fn octet(self) -> u8 {
        match self {
            FrameKind::Method => 1,
            FrameKind::Header => 2,
            FrameKind::Body => 3,
            FrameKind::Heartbeat => 8,
        }
    }

    fn from_octet(octet: u8) -> Result<Self, CodecError> {
        match octet {
            1 => Ok(FrameKind::Method),
            2 => Ok(FrameKind::Header),
            3 => Ok(FrameKind::Body),
            8 => Ok(FrameKind::Heartbeat),
            other => Err(CodecError::UnknownFrameType(other)),
        }
    }
}

/// An AMQP frame with an undecoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// An empty heartbeat frame.
    pub fn heartbeat() -> Self {
        Self::new(FrameKind::Heartbeat, Bytes::new())
    }
}

/// Reference codec for AMQP 0-9-1 general frames.
#[derive(Clone, Copy, Debug)]
pub struct AmqpCodec {
    max_payload: usize,
}

impl AmqpCodec {
    pub fn new() -> Self {
        Self {
            max_payload: FRAME_MAX_SIZE,
        }
    }

    /// Lowers the accepted payload size, e.g. after `Connection.Tune`.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }
}

impl Default for AmqpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec for AmqpCodec {
    type Frame = RawFrame;

    fn marshal(&self, frame: &RawFrame, channel: u16) -> Bytes {
        let mut out = BytesMut::with_capacity(HEADER_LEN + frame.payload.len() + 1);

        out.put_u8(frame.kind.octet());
        out.put_u16(channel);
        out.put_u32(frame.payload.len() as u32);
        out.put_slice(&frame.payload);
        out.put_u8(FRAME_END);

        out.freeze()
    }

    fn unmarshal(&self, buffer: &[u8]) -> Decoded<RawFrame> {
        if buffer.len() < HEADER_LEN {
            return Decoded::NeedMoreData;
        }

        let kind = match FrameKind::from_octet(buffer[0]) {
            Ok(kind) => kind,
            Err(err) => return Decoded::Malformed(err),
        };

        let channel = u16::from_be_bytes([buffer[1], buffer[2]]);
        let size = u32::from_be_bytes([buffer[3], buffer[4], buffer[5], buffer[6]]) as usize;

        if size > self.max_payload {
            return Decoded::Malformed(CodecError::Oversized {
                size,
                max: self.max_payload,
            });
        }

        let total = HEADER_LEN + size + 1;
        if buffer.len() < total {
            return Decoded::NeedMoreData;
        }

        let end = buffer[total - 1];
        if end != FRAME_END {
            return Decoded::Malformed(CodecError::BadFrameEnd(end));
        }

        Decoded::Frame {
            consumed: total,
            channel,
            frame: RawFrame {
                kind,
                payload: Bytes::copy_from_slice(&buffer[HEADER_LEN..total - 1]),
            },
        }
    }
}
