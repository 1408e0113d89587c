//! Frame header layout, message type tags and frame flags.

use crate::config::{
    CHECKSUM_SIZE, FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
use crate::core::serialization::encode_frame;
use crate::error::{ProtocolError, Result};
use bytes::Bytes;
use std::fmt;

/// One-byte message type tag.
///
/// Values 1 through 5 are the built-in message types. Every other value is legal
/// header content and can be routed to an application handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType(pub u8);

impl MessageType {
    pub const PING: MessageType = MessageType(0x01);
    pub const PONG: MessageType = MessageType(0x02);
    pub const ECHO: MessageType = MessageType(0x03);
    pub const DATA: MessageType = MessageType(0x04);
    pub const STATUS: MessageType = MessageType(0x05);

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Name of a built-in type, if this is one
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0x01 => Some("PING"),
            0x02 => Some("PONG"),
            0x03 => Some("ECHO"),
            0x04 => Some("DATA"),
            0x05 => Some("STATUS"),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.name().is_some()
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        MessageType(value)
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// Frame flag bits.
///
/// `COMPRESSED` and `ENCRYPTED` are reserved. The codec carries them verbatim and
/// never transforms the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameFlags(pub u8);

impl FrameFlags {
    pub const NONE: FrameFlags = FrameFlags(0x00);
    pub const ACK_REQUIRED: FrameFlags = FrameFlags(0x01);
    pub const COMPRESSED: FrameFlags = FrameFlags(0x02);
    pub const ENCRYPTED: FrameFlags = FrameFlags(0x04);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is set. The empty set is contained in any set.
    #[inline]
    pub const fn contains(self, other: FrameFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: FrameFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: FrameFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for FrameFlags {
    type Output = FrameFlags;

    fn bitor(self, rhs: FrameFlags) -> FrameFlags {
        FrameFlags(self.0 | rhs.0)
    }
}

/// The 8-byte frame header.
///
/// ```text
/// [magic u8][version u8][type u8][flags u8][payload_length u16 LE][reserved u16 LE]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u8,
    pub version: u8,
    pub message_type: u8,
    pub flags: u8,
    pub payload_length: u16,
    pub reserved: u16,
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            message_type: 0,
            flags: 0,
            payload_length: 0,
            reserved: 0,
        }
    }
}

impl FrameHeader {
    /// Header size in bytes (fixed)
    pub const SIZE: usize = FRAME_HEADER_SIZE;

    /// Create a valid header for a payload of `payload_length` bytes
    #[inline]
    pub fn new(message_type: MessageType, flags: FrameFlags, payload_length: u16) -> Self {
        Self {
            message_type: message_type.0,
            flags: flags.0,
            payload_length,
            ..Self::default()
        }
    }

    /// Build a header for `payload`, rejecting payloads the length field cannot hold
    pub fn for_payload(
        message_type: MessageType,
        flags: FrameFlags,
        payload: &[u8],
    ) -> Result<Self> {
        let len = u16::try_from(payload.len())
            .map_err(|_| ProtocolError::OversizedPayload(payload.len()))?;
        Ok(Self::new(message_type, flags, len))
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        MessageType(self.message_type)
    }

    #[inline]
    pub fn flags(&self) -> FrameFlags {
        FrameFlags(self.flags)
    }

    #[inline]
    pub fn has_flag(&self, flag: FrameFlags) -> bool {
        self.flags().contains(flag)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: FrameFlags) {
        self.flags |= flag.0;
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: FrameFlags) {
        self.flags &= !flag.0;
    }

    /// Check magic, version and declared length
    pub fn validate(&self) -> Result<()> {
        if self.magic != PROTOCOL_MAGIC
            || self.version != PROTOCOL_VERSION
            || usize::from(self.payload_length) > MAX_PAYLOAD_SIZE
        {
            return Err(ProtocolError::InvalidHeader {
                magic: self.magic,
                version: self.version,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Total wire size of the frame this header describes
    #[inline]
    pub fn frame_size(&self) -> usize {
        FRAME_HEADER_SIZE + usize::from(self.payload_length) + CHECKSUM_SIZE
    }

    /// Write the header bytes field by field.
    ///
    /// The caller guarantees `buf.len() >= FrameHeader::SIZE`.
    pub(crate) fn write_to(&self, buf: &mut [u8]) {
        buf[0] = self.magic;
        buf[1] = self.version;
        buf[2] = self.message_type;
        buf[3] = self.flags;
        buf[4..6].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[6..8].copy_from_slice(&self.reserved.to_le_bytes());
    }

    /// Decode the header bytes verbatim, without validation.
    ///
    /// The caller guarantees `buf.len() >= FrameHeader::SIZE`.
    pub(crate) fn read_from(buf: &[u8]) -> Self {
        Self {
            magic: buf[0],
            version: buf[1],
            message_type: buf[2],
            flags: buf[3],
            payload_length: u16::from_le_bytes([buf[4], buf[5]]),
            reserved: u16::from_le_bytes([buf[6], buf[7]]),
        }
    }
}

/// A validated frame held in memory: header plus payload.
///
/// This is the unit the stream codec yields and accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame with a header matching `payload`.
    pub fn new(
        message_type: MessageType,
        flags: FrameFlags,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let payload = payload.into();
        let header = FrameHeader::for_payload(message_type, flags, &payload)?;
        Ok(Self { header, payload })
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type()
    }

    /// The total wire size of this frame (header + payload + checksum).
    #[inline]
    pub fn wire_size(&self) -> usize {
        self.header.frame_size()
    }

    /// Serialize into a fresh checksummed buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        encode_frame(&self.header, &self.payload)
    }
}
