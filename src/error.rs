//! # Error Types
//!
//! Error handling for the frame protocol.
//!
//! Every failure in this crate is returned as a [`ProtocolError`] value. Nothing
//! panics on malformed input, and nothing retries internally.
//!
//! ## Error Categories
//! - **Streaming**: [`ProtocolError::InsufficientData`] is not a failure, it tells the
//!   caller to keep the buffer and wait for more bytes
//! - **Framing**: invalid headers and checksum mismatches, after which the stream
//!   sync point may be wrong
//! - **Payload**: message-specific decode failures
//! - **Routing**: unmapped message types and rejected registrations
//! - **Local**: undersized output buffers, configuration and I/O problems
//!
//! ## Example Usage
//! ```rust
//! use wire_protocol::core::serialization::deserialize_frame;
//! use wire_protocol::error::ProtocolError;
//! use tracing::{debug, warn};
//!
//! let partial = [0xAB, 0x01, 0x01];
//! match deserialize_frame(&partial) {
//!     Ok(frame) => debug!(consumed = frame.consumed, "frame decoded"),
//!     Err(e) if e.is_incomplete() => debug!("waiting for more bytes"),
//!     Err(e) => warn!(error = %e, "dropping corrupt frame"),
//! }
//! ```

use crate::core::frame::MessageType;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Payload decode failure reasons
    pub const ERR_PAYLOAD_TRUNCATED: &str = "payload shorter than its fixed layout";
    pub const ERR_LENGTH_EXCEEDS_BOUND: &str = "declared length exceeds maximum";
    pub const ERR_LENGTH_EXCEEDS_INPUT: &str = "declared length exceeds available bytes";
    pub const ERR_UNKNOWN_MESSAGE_TYPE: &str = "no codec for message type";
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not enough bytes buffered yet. Keep the buffer and read more.
    #[error("Insufficient data: need {needed} bytes, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Invalid frame header (magic 0x{magic:02X}, version 0x{version:02X})")]
    InvalidHeader { magic: u8, version: u8 },

    #[error("Checksum mismatch: frame carries 0x{expected:08X}, payload hashes to 0x{actual:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Malformed {message_type} payload: {reason}")]
    MalformedPayload {
        message_type: MessageType,
        reason: &'static str,
    },

    #[error("No handler registered for message type {0}")]
    NoHandlerRegistered(MessageType),

    #[error("Handler already registered for message type {0}")]
    DuplicateRegistration(MessageType),

    #[error("Output buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Payload too large: {0} bytes")]
    OversizedPayload(usize),

    #[error("Header declares {declared} payload bytes but {actual} were supplied")]
    PayloadLengthMismatch { declared: usize, actual: usize },

    #[error("Synchronization primitive poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// True for the streaming signal that more bytes are needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ProtocolError::InsufficientData { .. })
    }

    /// True when the byte stream has probably lost frame alignment.
    pub fn is_resync_candidate(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidHeader { .. }
                | ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::OversizedPayload(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
