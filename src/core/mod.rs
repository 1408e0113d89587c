//! # Core Protocol Components
//!
//! Low-level framing, checksums and bit-level helpers.
//!
//! This module provides the foundation for the protocol: the frame header layout,
//! pure serialization functions, and a stream codec built on top of them.
//!
//! ## Components
//! - **Frame**: Header layout, message type tags and flag bits
//! - **Serialization**: Stateless encode/decode of checksummed frames
//! - **Codec**: Tokio codec for framing over byte streams, with resynchronization
//! - **CRC32**: Compile-time table, one-shot and streaming checksums
//! - **Endian / Bitpack**: Byte order conversion and LSB-first bit packing
//!
//! ## Wire Format
//! ```text
//! [Magic 0xAB] [Version 0x01] [Type(1)] [Flags(1)] [Length(2 LE)] [Reserved(2 LE)]
//! [Payload(N)] [CRC32(Payload) (4 LE)]
//! ```
//!
//! ## Limits
//! - Maximum payload size: 65535 bytes (the width of the length field)
//! - Receivers may lower the limit with [`crate::config::CodecConfig`]
//! - Length is validated before any payload is buffered

pub mod bitpack;
pub mod codec;
pub mod crc32;
pub mod endian;
pub mod frame;
pub mod serialization;
