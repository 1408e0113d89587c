//! # Frame Codec
//!
//! Stream codec turning a byte stream into [`Frame`]s and back.
//!
//! Implements `tokio_util::codec::{Decoder, Encoder}` so any `AsyncRead`/`AsyncWrite`
//! can be wrapped with `FramedRead`/`FramedWrite`. Decoding is zero-copy: the
//! payload of a yielded frame is a slice of the receive buffer, split off without
//! copying.
//!
//! ## Resynchronization
//! A frame with a bad header, a bad checksum, or a declared length above
//! [`CodecConfig::max_payload_size`] is handled according to [`ResyncPolicy`].

use crate::config::{CodecConfig, ResyncPolicy, FRAME_HEADER_SIZE, PROTOCOL_MAGIC};
use crate::core::frame::{Frame, FrameHeader};
use crate::core::serialization::{check_frame, serialize_frame_into};
use crate::error::{ProtocolError, Result};
use crate::utils::metrics::global_metrics;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload_size: usize,
    resync_policy: ResyncPolicy,
    initial_capacity: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Codec with the default limits and [`ResyncPolicy::ScanForMagic`]
    pub fn new() -> Self {
        Self::with_config(&CodecConfig::default())
    }

    pub fn with_config(config: &CodecConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
            resync_policy: config.resync_policy,
            initial_capacity: config.initial_buffer_capacity,
        }
    }

    #[inline]
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    #[inline]
    pub fn resync_policy(&self) -> ResyncPolicy {
        self.resync_policy
    }

    /// Capacity an empty receive buffer is grown to before the next read
    #[inline]
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Validate the frame at the front of `src`, applying the local length limit
    /// before waiting for the body.
    fn check(&self, src: &[u8]) -> Result<FrameHeader> {
        // reject a wrong leading byte without waiting for a full header
        if let Some(&magic) = src.first() {
            if magic != PROTOCOL_MAGIC {
                return Err(ProtocolError::InvalidHeader {
                    magic,
                    version: src.get(1).copied().unwrap_or_default(),
                });
            }
        }

        if src.len() >= FRAME_HEADER_SIZE {
            let header = FrameHeader::read_from(src);
            let declared = usize::from(header.payload_length);
            if header.is_valid() && declared > self.max_payload_size {
                return Err(ProtocolError::OversizedPayload(declared));
            }
        }
        check_frame(src)
    }

    /// Drop garbage from the front of `src` after a rejected frame.
    ///
    /// Returns `Ok(true)` when the caller should try decoding again.
    fn resync(&self, src: &mut BytesMut, err: ProtocolError) -> Result<bool> {
        let metrics = global_metrics();
        match err {
            ProtocolError::ChecksumMismatch { .. } => metrics.checksum_mismatch(),
            _ => metrics.invalid_header(),
        }

        match self.resync_policy {
            ResyncPolicy::Fail => Err(err),
            ResyncPolicy::DropBuffer => {
                let dropped = src.len();
                src.clear();
                metrics.resync_skipped(dropped as u64);
                warn!(error = %err, dropped, "discarded receive buffer");
                Ok(false)
            }
            ResyncPolicy::ScanForMagic => {
                let skip = src[1..]
                    .iter()
                    .position(|&b| b == PROTOCOL_MAGIC)
                    .map_or(src.len(), |pos| pos + 1);
                src.advance(skip);
                metrics.resync_skipped(skip as u64);
                warn!(error = %err, skipped = skip, "resynchronizing frame stream");
                Ok(!src.is_empty())
            }
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            if src.is_empty() {
                src.reserve(self.initial_capacity);
                return Ok(None);
            }

            match self.check(src) {
                Ok(header) => {
                    let frame_size = header.frame_size();
                    let payload_len = usize::from(header.payload_length);

                    let mut raw = src.split_to(frame_size);
                    raw.advance(FRAME_HEADER_SIZE);
                    raw.truncate(payload_len);

                    global_metrics().frame_decoded(frame_size as u64);
                    trace!(
                        message_type = header.message_type,
                        payload_len,
                        "frame decoded"
                    );
                    return Ok(Some(Frame {
                        header,
                        payload: raw.freeze(),
                    }));
                }
                Err(ProtocolError::InsufficientData { needed, available }) => {
                    global_metrics().incomplete_read();
                    src.reserve(needed.saturating_sub(available));
                    return Ok(None);
                }
                Err(err) if err.is_resync_candidate() => {
                    if !self.resync(src, err)? {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => {
                let needed = if buf.len() >= FRAME_HEADER_SIZE {
                    FrameHeader::read_from(buf).frame_size()
                } else {
                    FRAME_HEADER_SIZE
                };
                Err(ProtocolError::InsufficientData {
                    needed,
                    available: buf.len(),
                })
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        let written = serialize_frame_into(&item.header, &item.payload, dst)?;
        global_metrics().frame_encoded(written as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{FrameFlags, MessageType};

    fn frame(payload: &'static [u8]) -> Frame {
        Frame::new(MessageType::ECHO, FrameFlags::NONE, payload).unwrap()
    }

    fn encoded(payload: &'static [u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        FrameCodec::new().encode(frame(payload), &mut buf).unwrap();
        buf
    }

    fn codec(policy: ResyncPolicy) -> FrameCodec {
        FrameCodec::with_config(&CodecConfig {
            resync_policy: policy,
            ..CodecConfig::default()
        })
    }

    #[test]
    fn test_decode_split_leaves_remainder() {
        let mut buf = encoded(b"first");
        buf.extend_from_slice(&encoded(b"second"));

        let mut codec = FrameCodec::new();
        let a = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&a.payload[..], b"first");
        let b = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&b.payload[..], b"second");
        assert!(buf.is_empty());
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_frame_waits() {
        let full = encoded(b"partial");
        let mut buf = BytesMut::from(&full[..10]);
        let mut codec = FrameCodec::new();
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 10);

        buf.extend_from_slice(&full[10..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"partial");
    }

    #[test]
    fn test_scan_for_magic_skips_garbage() {
        let mut buf = BytesMut::from(&[0x00, 0x11, 0x22][..]);
        buf.extend_from_slice(&encoded(b"after noise"));

        let frame = codec(ResyncPolicy::ScanForMagic)
            .decode(&mut buf)
            .unwrap()
            .unwrap();
        assert_eq!(&frame.payload[..], b"after noise");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_short_garbage_not_buffered() {
        let mut buf = BytesMut::from(&[0x00, 0x11][..]);
        assert!(FrameCodec::new().decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_scan_for_magic_recovers_after_corrupt_frame() {
        let mut buf = encoded(b"corrupt me");
        buf[FRAME_HEADER_SIZE] ^= 0x01;
        buf.extend_from_slice(&encoded(b"intact"));

        let frame = codec(ResyncPolicy::ScanForMagic)
            .decode(&mut buf)
            .unwrap()
            .unwrap();
        assert_eq!(&frame.payload[..], b"intact");
    }

    #[test]
    fn test_drop_buffer_policy() {
        let mut buf = BytesMut::from(&[0x00u8; 20][..]);
        assert!(codec(ResyncPolicy::DropBuffer)
            .decode(&mut buf)
            .unwrap()
            .is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_fail_policy_keeps_buffer() {
        let mut buf = BytesMut::from(&[0x00u8; 20][..]);
        let err = codec(ResyncPolicy::Fail).decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHeader { .. }));
        assert_eq!(buf.len(), 20);
    }

    #[test]
    fn test_local_payload_limit() {
        let mut codec = FrameCodec::with_config(&CodecConfig {
            max_payload_size: 4,
            resync_policy: ResyncPolicy::Fail,
            ..CodecConfig::default()
        });
        let mut buf = BytesMut::from(&encoded(b"too long")[..FRAME_HEADER_SIZE]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedPayload(8))
        ));
    }

    #[test]
    fn test_decode_eof_reports_truncation() {
        let full = encoded(b"cut short");
        let mut buf = BytesMut::from(&full[..full.len() - 2]);
        let err = FrameCodec::new().decode_eof(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InsufficientData { needed, .. } if needed == full.len()
        ));

        let mut empty = BytesMut::new();
        assert!(FrameCodec::new().decode_eof(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_empty_buffer_grows_to_initial_capacity() {
        let mut codec = FrameCodec::with_config(&CodecConfig {
            initial_buffer_capacity: 1_000_000,
            ..CodecConfig::default()
        });
        assert_eq!(codec.initial_capacity(), 1_000_000);

        let mut buf = encoded(b"drain");
        assert!(codec.decode(&mut buf).unwrap().is_some());
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.capacity() >= 1_000_000);
    }

    #[test]
    fn test_encode_rejects_mismatched_header() {
        let mut item = frame(b"abc");
        item.header.payload_length = 9;
        let mut dst = BytesMut::new();
        assert!(FrameCodec::new().encode(item, &mut dst).is_err());
        assert!(dst.is_empty());
    }
}
