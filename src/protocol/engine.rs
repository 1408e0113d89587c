//! Protocol engine: stream codec plus dispatch registry.
//!
//! Inbound bytes are decoded into frames and routed to handlers; outbound typed
//! messages are wrapped into checksummed frames. The engine holds no per-connection
//! state, so one instance can serve any number of connections, each owning its
//! own receive buffer.

use crate::config::{CodecConfig, ProtocolConfig};
use crate::core::codec::FrameCodec;
use crate::core::frame::{FrameFlags, MessageType};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::{Dispatcher, Handler};
use crate::protocol::message::{Message, Payload};
use crate::utils::metrics::Timer;
use bytes::BytesMut;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// What happened to one inbound frame.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub message_type: MessageType,
    pub flags: FrameFlags,
    /// Callback result, or the routing/decoding error for this frame
    pub result: Result<bool>,
}

impl DispatchOutcome {
    /// True when a handler ran and reported success
    pub fn is_handled(&self) -> bool {
        matches!(self.result, Ok(true))
    }
}

/// Result of one [`ProtocolEngine::process`] call.
#[derive(Debug, Default)]
#[must_use]
pub struct ProcessReport {
    /// Frames consumed from the buffer, in wire order
    pub outcomes: Vec<DispatchOutcome>,
    /// Stream error that stopped the batch, only under
    /// [`crate::config::ResyncPolicy::Fail`]
    pub stream_error: Option<ProtocolError>,
}

impl ProcessReport {
    /// True when every frame was handled and the stream stayed in sync
    pub fn is_clean(&self) -> bool {
        self.stream_error.is_none() && self.outcomes.iter().all(DispatchOutcome::is_handled)
    }

    /// The outcomes, or the stream error if one stopped the batch
    pub fn into_result(self) -> Result<Vec<DispatchOutcome>> {
        match self.stream_error {
            Some(err) => Err(err),
            None => Ok(self.outcomes),
        }
    }
}

#[derive(Debug)]
pub struct ProtocolEngine {
    dispatcher: Arc<Dispatcher>,
    codec: CodecConfig,
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}

impl ProtocolEngine {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self::with_dispatcher(config, Arc::new(Dispatcher::new()))
    }

    /// Engine sharing an existing registry
    pub fn with_dispatcher(config: &ProtocolConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            codec: config.codec.clone(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn codec_config(&self) -> &CodecConfig {
        &self.codec
    }

    /// A stream codec configured like this engine, for use with `Framed*`
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::with_config(&self.codec)
    }

    /// Empty receive buffer sized by `initial_buffer_capacity`
    pub fn receive_buffer(&self) -> BytesMut {
        BytesMut::with_capacity(self.codec.initial_buffer_capacity)
    }

    pub fn register<P, F>(&self, callback: F) -> Result<()>
    where
        P: Payload,
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.dispatcher.register::<P, F>(callback)
    }

    pub fn register_handler(&self, handler: Handler) -> Result<()> {
        self.dispatcher.register_handler(handler)
    }

    /// Decode and dispatch every complete frame at the front of `buf`.
    ///
    /// Consumed frames are removed from `buf`; an incomplete tail stays for the next
    /// call. Routing and payload errors are recorded per frame. A stream error under
    /// [`crate::config::ResyncPolicy::Fail`] stops the batch and is returned in
    /// [`ProcessReport::stream_error`] next to the frames already dispatched, with
    /// the offending bytes left at the front of `buf`.
    pub fn process(&self, buf: &mut BytesMut) -> ProcessReport {
        let _timer = Timer::start("engine.process");
        let mut codec = self.codec();
        let mut report = ProcessReport::default();

        loop {
            let frame = match codec.decode(buf) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, dispatched = report.outcomes.len(), "frame stream stopped");
                    report.stream_error = Some(err);
                    break;
                }
            };

            let message_type = frame.message_type();
            let result = self.dispatcher.dispatch(message_type, &frame.payload);
            report.outcomes.push(DispatchOutcome {
                message_type,
                flags: frame.header.flags(),
                result,
            });
        }

        trace!(
            frames = report.outcomes.len(),
            remaining = buf.len(),
            "receive buffer processed"
        );
        report
    }

    /// Serialize `message` as a complete frame appended to `dst`.
    ///
    /// Returns the number of bytes appended.
    pub fn encode(&self, message: &Message, flags: FrameFlags, dst: &mut BytesMut) -> Result<usize> {
        let frame = message.to_frame(flags)?;
        let size = frame.wire_size();
        self.codec().encode(frame, dst)?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResyncPolicy;
    use crate::protocol::message::{EchoMessage, PingMessage};

    #[test]
    fn test_process_batch_and_tail() {
        let engine = ProtocolEngine::default();
        engine.register::<PingMessage, _>(|_| true).unwrap();

        let mut wire = BytesMut::new();
        let ping = Message::Ping(PingMessage {
            sequence_id: 1,
            timestamp: 2,
        });
        engine.encode(&ping, FrameFlags::NONE, &mut wire).unwrap();
        engine
            .encode(&EchoMessage { data: vec![1] }.into(), FrameFlags::ACK_REQUIRED, &mut wire)
            .unwrap();
        let tail = engine.encode(&ping, FrameFlags::NONE, &mut wire).unwrap();
        wire.truncate(wire.len() - tail / 2);

        let outcomes = engine.process(&mut wire).into_result().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_handled());
        assert!(matches!(
            outcomes[1].result,
            Err(ProtocolError::NoHandlerRegistered(MessageType::ECHO))
        ));
        assert!(outcomes[1].flags.contains(FrameFlags::ACK_REQUIRED));
        assert_eq!(wire.len(), tail - tail / 2);
    }

    #[test]
    fn test_encode_reports_size() {
        let engine = ProtocolEngine::default();
        let mut wire = BytesMut::new();
        let n = engine
            .encode(&PingMessage::default().into(), FrameFlags::NONE, &mut wire)
            .unwrap();
        assert_eq!(n, 24);
        assert_eq!(wire.len(), 24);
    }

    #[test]
    fn test_fail_policy_keeps_dispatched_outcomes() {
        let config = ProtocolConfig::default_with_overrides(|c| {
            c.codec.resync_policy = ResyncPolicy::Fail;
        });
        let engine = ProtocolEngine::new(&config);
        engine.register::<PingMessage, _>(|_| true).unwrap();

        let mut wire = BytesMut::new();
        for sequence_id in 1..=2 {
            let ping = PingMessage {
                sequence_id,
                timestamp: 0,
            };
            engine.encode(&ping.into(), FrameFlags::NONE, &mut wire).unwrap();
        }
        wire.extend_from_slice(&[0u8; 16]);

        let report = engine.process(&mut wire);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(DispatchOutcome::is_handled));
        assert!(matches!(
            report.stream_error,
            Some(ProtocolError::InvalidHeader { magic: 0x00, .. })
        ));
        assert!(!report.is_clean());
        // the garbage stays put for the caller to inspect
        assert_eq!(wire.len(), 16);
    }

    #[test]
    fn test_receive_buffer_capacity() {
        let config = ProtocolConfig::default_with_overrides(|c| {
            c.codec.initial_buffer_capacity = 1_000_000;
        });
        let engine = ProtocolEngine::new(&config);
        let buf = engine.receive_buffer();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 1_000_000);
        assert_eq!(engine.codec().initial_capacity(), 1_000_000);
    }
}
