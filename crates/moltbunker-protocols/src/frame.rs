//! Binary frame codec for exec terminal sessions.
//!
//! Every WebSocket binary message on the exec channel is one frame:
//!
//! ```text
//! +--------+---------------------------+
//! | type   | payload (rest of message) |
//! | 1 byte | 0..n bytes                |
//! +--------+---------------------------+
//! ```
//!
//! There is no length prefix. A `Resize` payload is always four bytes:
//! big-endian `u16` columns followed by big-endian `u16` rows.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Length of a resize payload.
pub const RESIZE_PAYLOAD_LEN: usize = 4;

/// Frame type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Terminal stdin/stdout bytes.
    Data = 0x01,
    /// Terminal size change.
    Resize = 0x02,
    /// Keep-alive probe.
    Ping = 0x03,
    /// Keep-alive answer.
    Pong = 0x04,
    /// Session end.
    Close = 0x05,
    /// Remote error text.
    Error = 0x06,
}

impl FrameType {
    /// Every known frame type, in tag order.
    pub const ALL: [FrameType; 6] = [
        FrameType::Data,
        FrameType::Resize,
        FrameType::Ping,
        FrameType::Pong,
        FrameType::Close,
        FrameType::Error,
    ];

    /// Wire tag for this type.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self, FrameError> {
        match tag {
            0x01 => Ok(FrameType::Data),
            0x02 => Ok(FrameType::Resize),
            0x03 => Ok(FrameType::Ping),
            0x04 => Ok(FrameType::Pong),
            0x05 => Ok(FrameType::Close),
            0x06 => Ok(FrameType::Error),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// A raw frame: type tag plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(frame_type: FrameType, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Encode as `type || payload`.
    pub fn encode(&self) -> Bytes {
        encode(self.frame_type, &self.payload)
    }

    /// Split a message into type byte and payload.
    ///
    /// Only the tag is checked here; payload structure is validated by
    /// [`ExecMessage::try_from`].
    pub fn decode(message: impl Into<Bytes>) -> Result<Self, FrameError> {
        let message = message.into();
        let Some(&tag) = message.first() else {
            return Err(FrameError::Empty);
        };
        Ok(Self {
            frame_type: FrameType::try_from(tag)?,
            payload: message.slice(1..),
        })
    }
}

/// Prepend the type tag to `payload`.
pub fn encode(frame_type: FrameType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(frame_type.as_byte());
    buf.put_slice(payload);
    buf.freeze()
}

/// Encode terminal dimensions as a resize payload.
pub fn encode_resize(cols: u16, rows: u16) -> [u8; RESIZE_PAYLOAD_LEN] {
    let [c0, c1] = cols.to_be_bytes();
    let [r0, r1] = rows.to_be_bytes();
    [c0, c1, r0, r1]
}

/// Decode a resize payload into `(cols, rows)`.
pub fn decode_resize(payload: &[u8]) -> Result<(u16, u16), FrameError> {
    match payload {
        [c0, c1, r0, r1] => Ok((
            u16::from_be_bytes([*c0, *c1]),
            u16::from_be_bytes([*r0, *r1]),
        )),
        _ => Err(FrameError::InvalidResize { len: payload.len() }),
    }
}

/// A validated exec frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecMessage {
    /// Terminal bytes.
    Data(Bytes),
    /// Terminal size.
    Resize { cols: u16, rows: u16 },
    Ping,
    Pong,
    Close,
    /// Error text, decoded lossily as UTF-8.
    Error(String),
}

impl ExecMessage {
    /// Frame type of this message.
    pub fn frame_type(&self) -> FrameType {
        match self {
            ExecMessage::Data(_) => FrameType::Data,
            ExecMessage::Resize { .. } => FrameType::Resize,
            ExecMessage::Ping => FrameType::Ping,
            ExecMessage::Pong => FrameType::Pong,
            ExecMessage::Close => FrameType::Close,
            ExecMessage::Error(_) => FrameType::Error,
        }
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Bytes {
        match self {
            ExecMessage::Data(data) => encode(FrameType::Data, data),
            ExecMessage::Resize { cols, rows } => {
                encode(FrameType::Resize, &encode_resize(*cols, *rows))
            }
            ExecMessage::Ping => encode(FrameType::Ping, &[]),
            ExecMessage::Pong => encode(FrameType::Pong, &[]),
            ExecMessage::Close => encode(FrameType::Close, &[]),
            ExecMessage::Error(text) => encode(FrameType::Error, text.as_bytes()),
        }
    }

    /// Decode and validate wire bytes.
    pub fn decode(message: impl Into<Bytes>) -> Result<Self, FrameError> {
        Self::try_from(Frame::decode(message)?)
    }
}

impl TryFrom<Frame> for ExecMessage {
    type Error = FrameError;

    fn try_from(frame: Frame) -> Result<Self, FrameError> {
        Ok(match frame.frame_type {
            FrameType::Data => ExecMessage::Data(frame.payload),
            FrameType::Resize => {
                let (cols, rows) = decode_resize(&frame.payload)?;
                ExecMessage::Resize { cols, rows }
            }
            FrameType::Ping => ExecMessage::Ping,
            FrameType::Pong => ExecMessage::Pong,
            FrameType::Close => ExecMessage::Close,
            FrameType::Error => {
                ExecMessage::Error(String::from_utf8_lossy(&frame.payload).into_owned())
            }
        })
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
