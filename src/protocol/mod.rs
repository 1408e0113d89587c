//! # Protocol Layer
//!
//! Typed messages and routing on top of the frame codec.
//!
//! ## Components
//! - **Message**: Payload layouts for the built-in message types
//! - **Dispatcher**: Thread-safe registry mapping message types to handlers
//! - **Engine**: Decodes a receive buffer and dispatches every complete frame
//!
//! ## Message Types
//! | Type | Tag | Payload |
//! |------|-----|---------|
//! | Ping | 0x01 | sequence id, timestamp |
//! | Pong | 0x02 | sequence id, timestamp, echo time |
//! | Echo | 0x03 | up to 256 opaque bytes |
//! | Data | 0x04 | type, id, up to 512 bytes |
//! | Status | 0x05 | status code, error code, up to 63 bytes of text |
//!
//! Any other tag can be routed with [`dispatcher::Handler::raw`].

pub mod dispatcher;
pub mod engine;
pub mod message;
