//! # Wire Protocol
//!
//! Checksummed binary frame protocol with typed message codecs and handler dispatch.
//!
//! ## Layers
//! - [`core`]: frame layout, stateless serialization, CRC32, bit packing, byte order,
//!   and a `tokio_util` stream codec with configurable resynchronization
//! - [`protocol`]: built-in message payloads, a thread-safe handler registry and an
//!   engine tying the two together
//! - [`config`]: wire constants and local policy (TOML or environment)
//! - [`utils`]: logging setup and metrics
//!
//! ## Quick Start
//! ```rust
//! use bytes::BytesMut;
//! use wire_protocol::protocol::message::{Message, PingMessage};
//! use wire_protocol::{FrameFlags, ProtocolConfig, ProtocolEngine};
//!
//! let engine = ProtocolEngine::new(&ProtocolConfig::default());
//! engine
//!     .register::<PingMessage, _>(|msg| matches!(msg, Message::Ping(p) if p.sequence_id == 7))
//!     .unwrap();
//!
//! let mut wire = BytesMut::new();
//! let ping = Message::Ping(PingMessage { sequence_id: 7, timestamp: 0 });
//! engine.encode(&ping, FrameFlags::NONE, &mut wire).unwrap();
//!
//! let report = engine.process(&mut wire);
//! assert!(report.is_clean());
//! assert!(report.outcomes[0].is_handled());
//! ```
//!
//! Transports, timeouts, compression and encryption are outside this crate. The
//! `COMPRESSED` and `ENCRYPTED` flag bits are carried verbatim.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::config::{CodecConfig, LoggingConfig, ProtocolConfig, ResyncPolicy};
pub use crate::core::codec::FrameCodec;
pub use crate::core::frame::{Frame, FrameFlags, FrameHeader, MessageType};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::dispatcher::{Dispatcher, Handler};
pub use crate::protocol::engine::{DispatchOutcome, ProcessReport, ProtocolEngine};
