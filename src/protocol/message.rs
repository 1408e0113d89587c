//! # Message Payloads
//!
//! Typed views of the payload bytes carried by built-in message types.
//!
//! Every field is read and written explicitly at its byte offset in little-endian
//! order. Nothing depends on in-memory struct layout.
//!
//! ```text
//! Ping    [sequence_id u32][timestamp u64]                              12 bytes
//! Pong    [sequence_id u32][timestamp u64][echo_time u64]               20 bytes
//! Echo    [length u16][data; length]                                    length <= 256
//! Data    [data_type u16][data_id u16][data_length u16][data; len]      len <= 512
//! Status  [status_code u8][error_code u16][text]                        text <= 63
//! ```

use crate::core::frame::{Frame, FrameFlags, MessageType};
use crate::error::constants::{
    ERR_LENGTH_EXCEEDS_BOUND, ERR_LENGTH_EXCEEDS_INPUT, ERR_PAYLOAD_TRUNCATED,
    ERR_UNKNOWN_MESSAGE_TYPE,
};
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};

/// Largest Echo body
pub const MAX_ECHO_DATA: usize = 256;

/// Largest Data body
pub const MAX_DATA_PAYLOAD: usize = 512;

/// Longest Status text, excluding the terminator slot of the fixed buffer
pub const MAX_STATUS_TEXT: usize = 63;

/// A typed payload bound to one message type.
pub trait Payload: Sized + Into<Message> {
    const MESSAGE_TYPE: MessageType;

    /// Decode from the exact payload bytes of a frame
    fn decode(data: &[u8]) -> Result<Self>;

    /// Append the wire form to `dst`
    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    /// Size of the wire form in bytes
    fn encoded_len(&self) -> usize;
}

#[inline]
fn malformed(message_type: MessageType, reason: &'static str) -> ProtocolError {
    ProtocolError::MalformedPayload {
        message_type,
        reason,
    }
}

#[inline]
fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

#[inline]
fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(raw)
}

/// Liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingMessage {
    pub sequence_id: u32,
    pub timestamp: u64,
}

impl PingMessage {
    pub const SIZE: usize = 12;
}

impl Payload for PingMessage {
    const MESSAGE_TYPE: MessageType = MessageType::PING;

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_PAYLOAD_TRUNCATED));
        }
        Ok(Self {
            sequence_id: read_u32(data, 0),
            timestamp: read_u64(data, 4),
        })
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(Self::SIZE);
        dst.put_u32_le(self.sequence_id);
        dst.put_u64_le(self.timestamp);
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        Self::SIZE
    }
}

/// Reply to a [`PingMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PongMessage {
    pub sequence_id: u32,
    pub timestamp: u64,
    pub echo_time: u64,
}

impl PongMessage {
    pub const SIZE: usize = 20;

    /// Answer `ping`, stamping the time the reply was produced
    pub fn reply_to(ping: &PingMessage, echo_time: u64) -> Self {
        Self {
            sequence_id: ping.sequence_id,
            timestamp: ping.timestamp,
            echo_time,
        }
    }
}

impl Payload for PongMessage {
    const MESSAGE_TYPE: MessageType = MessageType::PONG;

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_PAYLOAD_TRUNCATED));
        }
        Ok(Self {
            sequence_id: read_u32(data, 0),
            timestamp: read_u64(data, 4),
            echo_time: read_u64(data, 12),
        })
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(Self::SIZE);
        dst.put_u32_le(self.sequence_id);
        dst.put_u64_le(self.timestamp);
        dst.put_u64_le(self.echo_time);
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        Self::SIZE
    }
}

/// Opaque bytes to be returned by the peer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoMessage {
    pub data: Vec<u8>,
}

impl Payload for EchoMessage {
    const MESSAGE_TYPE: MessageType = MessageType::ECHO;

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_PAYLOAD_TRUNCATED));
        }
        let length = usize::from(read_u16(data, 0));
        if length > MAX_ECHO_DATA {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_LENGTH_EXCEEDS_BOUND));
        }
        if data.len() < 2 + length {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_LENGTH_EXCEEDS_INPUT));
        }
        Ok(Self {
            data: data[2..2 + length].to_vec(),
        })
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if self.data.len() > MAX_ECHO_DATA {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_LENGTH_EXCEEDS_BOUND));
        }
        dst.reserve(self.encoded_len());
        dst.put_u16_le(self.data.len() as u16);
        dst.put_slice(&self.data);
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }
}

/// Application data tagged with a type and an id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataMessage {
    pub data_type: u16,
    pub data_id: u16,
    pub data: Vec<u8>,
}

impl Payload for DataMessage {
    const MESSAGE_TYPE: MessageType = MessageType::DATA;

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 6 {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_PAYLOAD_TRUNCATED));
        }
        let data_length = usize::from(read_u16(data, 4));
        if data_length > MAX_DATA_PAYLOAD {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_LENGTH_EXCEEDS_BOUND));
        }
        if data.len() < 6 + data_length {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_LENGTH_EXCEEDS_INPUT));
        }
        Ok(Self {
            data_type: read_u16(data, 0),
            data_id: read_u16(data, 2),
            data: data[6..6 + data_length].to_vec(),
        })
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if self.data.len() > MAX_DATA_PAYLOAD {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_LENGTH_EXCEEDS_BOUND));
        }
        dst.reserve(self.encoded_len());
        dst.put_u16_le(self.data_type);
        dst.put_u16_le(self.data_id);
        dst.put_u16_le(self.data.len() as u16);
        dst.put_slice(&self.data);
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        6 + self.data.len()
    }
}

/// Status report with a short text description
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusMessage {
    pub status_code: u8,
    pub error_code: u16,
    /// At most [`MAX_STATUS_TEXT`] bytes, never containing a NUL
    pub message: Vec<u8>,
}

impl StatusMessage {
    /// Build a status, truncating `text` to [`MAX_STATUS_TEXT`] bytes
    pub fn new(status_code: u8, error_code: u16, text: &str) -> Self {
        Self {
            status_code,
            error_code,
            message: status_text(text.as_bytes()),
        }
    }

    /// The text, with invalid UTF-8 replaced
    pub fn message_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }
}

/// Cut at the first NUL, then at the fixed buffer length.
fn status_text(raw: &[u8]) -> Vec<u8> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    raw[..end.min(MAX_STATUS_TEXT)].to_vec()
}

impl Payload for StatusMessage {
    const MESSAGE_TYPE: MessageType = MessageType::STATUS;

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(malformed(Self::MESSAGE_TYPE, ERR_PAYLOAD_TRUNCATED));
        }
        Ok(Self {
            status_code: data[0],
            error_code: read_u16(data, 1),
            message: status_text(&data[3..]),
        })
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let text = status_text(&self.message);
        dst.reserve(3 + text.len());
        dst.put_u8(self.status_code);
        dst.put_u16_le(self.error_code);
        dst.put_slice(&text);
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        3 + status_text(&self.message).len()
    }
}

/// Any decoded payload.
///
/// `Raw` carries application-defined types verbatim; the crate never interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Ping(PingMessage),
    Pong(PongMessage),
    Echo(EchoMessage),
    Data(DataMessage),
    Status(StatusMessage),
    Raw {
        message_type: MessageType,
        payload: Vec<u8>,
    },
}

impl Message {
    /// Decode the payload of a built-in message type.
    ///
    /// Unknown types fail with `MalformedPayload`; wrap them with [`Message::Raw`]
    /// explicitly if they should be carried through.
    pub fn decode(message_type: MessageType, data: &[u8]) -> Result<Self> {
        match message_type {
            MessageType::PING => PingMessage::decode(data).map(Message::Ping),
            MessageType::PONG => PongMessage::decode(data).map(Message::Pong),
            MessageType::ECHO => EchoMessage::decode(data).map(Message::Echo),
            MessageType::DATA => DataMessage::decode(data).map(Message::Data),
            MessageType::STATUS => StatusMessage::decode(data).map(Message::Status),
            other => Err(malformed(other, ERR_UNKNOWN_MESSAGE_TYPE)),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Ping(_) => MessageType::PING,
            Message::Pong(_) => MessageType::PONG,
            Message::Echo(_) => MessageType::ECHO,
            Message::Data(_) => MessageType::DATA,
            Message::Status(_) => MessageType::STATUS,
            Message::Raw { message_type, .. } => *message_type,
        }
    }

    /// Append the payload bytes (no frame) to `dst`
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Message::Ping(m) => m.encode(dst),
            Message::Pong(m) => m.encode(dst),
            Message::Echo(m) => m.encode(dst),
            Message::Data(m) => m.encode(dst),
            Message::Status(m) => m.encode(dst),
            Message::Raw { payload, .. } => {
                dst.extend_from_slice(payload);
                Ok(())
            }
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Message::Ping(m) => m.encoded_len(),
            Message::Pong(m) => m.encoded_len(),
            Message::Echo(m) => m.encoded_len(),
            Message::Data(m) => m.encoded_len(),
            Message::Status(m) => m.encoded_len(),
            Message::Raw { payload, .. } => payload.len(),
        }
    }

    /// Wrap the encoded payload in a frame ready for the stream codec
    pub fn to_frame(&self, flags: FrameFlags) -> Result<Frame> {
        let mut payload = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut payload)?;
        Frame::new(self.message_type(), flags, payload.freeze())
    }
}

impl From<PingMessage> for Message {
    fn from(m: PingMessage) -> Self {
        Message::Ping(m)
    }
}

impl From<PongMessage> for Message {
    fn from(m: PongMessage) -> Self {
        Message::Pong(m)
    }
}

impl From<EchoMessage> for Message {
    fn from(m: EchoMessage) -> Self {
        Message::Echo(m)
    }
}

impl From<DataMessage> for Message {
    fn from(m: DataMessage) -> Self {
        Message::Data(m)
    }
}

impl From<StatusMessage> for Message {
    fn from(m: StatusMessage) -> Self {
        Message::Status(m)
    }
}
