//! # Frame Serialization
//!
//! Pure functions turning a header plus payload into a checksummed frame and back.
//!
//! ## Wire Format
//! ```text
//! [Header(8)] [Payload(N, 0..=65535)] [CRC32(Payload) u32 LE]
//! ```
//!
//! The checksum covers the payload bytes only. None of these functions keeps state, so
//! they can run concurrently on independent buffers from any number of threads.
//!
//! ## Streaming
//! [`deserialize_frame`] reports [`ProtocolError::InsufficientData`] until the whole
//! frame is buffered. Nothing is consumed on any error, so a reader keeps its buffer,
//! appends the next read and calls again.

use crate::config::{CHECKSUM_SIZE, FRAME_HEADER_SIZE, MIN_FRAME_SIZE};
use crate::core::crc32;
use crate::core::frame::FrameHeader;
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

/// A frame decoded from the front of a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
    /// Bytes taken from the front of the input
    pub consumed: usize,
}

/// Wire size of the frame described by `header`
#[inline]
pub fn calculate_frame_size(header: &FrameHeader) -> usize {
    header.frame_size()
}

fn check_outbound(header: &FrameHeader, payload: &[u8]) -> Result<usize> {
    header.validate()?;
    let declared = usize::from(header.payload_length);
    if declared != payload.len() {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    Ok(header.frame_size())
}

/// Serialize a frame into `out`, returning the number of bytes written.
///
/// The header must be valid and its `payload_length` must equal `payload.len()`.
/// All checks run before the first byte is written, so on error `out` is untouched.
pub fn serialize_frame(header: &FrameHeader, payload: &[u8], out: &mut [u8]) -> Result<usize> {
    let frame_size = check_outbound(header, payload)?;
    if out.len() < frame_size {
        return Err(ProtocolError::BufferTooSmall {
            required: frame_size,
            available: out.len(),
        });
    }

    header.write_to(&mut out[..FRAME_HEADER_SIZE]);

    let payload_end = FRAME_HEADER_SIZE + payload.len();
    let written = &mut out[FRAME_HEADER_SIZE..payload_end];
    written.copy_from_slice(payload);
    let checksum = crc32::checksum(written);
    out[payload_end..frame_size].copy_from_slice(&checksum.to_le_bytes());

    trace!(
        message_type = header.message_type,
        payload_len = payload.len(),
        checksum,
        "frame serialized"
    );
    Ok(frame_size)
}

/// Append a serialized frame to `dst`, returning the number of bytes appended.
pub fn serialize_frame_into(
    header: &FrameHeader,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<usize> {
    let frame_size = check_outbound(header, payload)?;
    dst.reserve(frame_size);

    let mut raw = [0u8; FRAME_HEADER_SIZE];
    header.write_to(&mut raw);
    dst.put_slice(&raw);
    dst.put_slice(payload);
    dst.put_u32_le(crc32::checksum(payload));

    Ok(frame_size)
}

/// Serialize a frame into a fresh buffer.
pub fn encode_frame(header: &FrameHeader, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    serialize_frame_into(header, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode and validate the header at the front of `data`.
///
/// Returns the header and the number of header bytes consumed (always 8).
pub fn deserialize_header(data: &[u8]) -> Result<(FrameHeader, usize)> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: FRAME_HEADER_SIZE,
            available: data.len(),
        });
    }

    let header = FrameHeader::read_from(data);
    if let Err(e) = header.validate() {
        debug!(
            magic = header.magic,
            version = header.version,
            "invalid frame header"
        );
        return Err(e);
    }

    Ok((header, FRAME_HEADER_SIZE))
}

#[inline]
fn read_trailing_checksum(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Validate the frame at the front of `data` without copying its payload.
///
/// Runs the header, length and checksum checks of [`deserialize_frame`] and returns
/// the header on success. The payload occupies
/// `FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + header.payload_length` of `data`.
pub fn check_frame(data: &[u8]) -> Result<FrameHeader> {
    let (header, _) = deserialize_header(data)?;

    let required = header.frame_size();
    if data.len() < required {
        return Err(ProtocolError::InsufficientData {
            needed: required,
            available: data.len(),
        });
    }

    let payload_end = FRAME_HEADER_SIZE + usize::from(header.payload_length);
    let expected = read_trailing_checksum(data, payload_end);
    let actual = crc32::checksum(&data[FRAME_HEADER_SIZE..payload_end]);

    if expected != actual {
        debug!(
            message_type = header.message_type,
            expected, actual, "frame checksum mismatch"
        );
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    Ok(header)
}

/// Decode one complete frame from the front of `data`.
///
/// Trailing bytes past the first frame are left alone; `consumed` says where the
/// next frame starts.
pub fn deserialize_frame(data: &[u8]) -> Result<DecodedFrame> {
    let header = check_frame(data)?;
    let payload_end = FRAME_HEADER_SIZE + usize::from(header.payload_length);

    Ok(DecodedFrame {
        header,
        payload: data[FRAME_HEADER_SIZE..payload_end].to_vec(),
        consumed: header.frame_size(),
    })
}

/// Check that `frame` is exactly one well-formed frame.
///
/// Unlike [`deserialize_frame`], extra trailing bytes make the frame invalid.
pub fn validate_frame(frame: &[u8]) -> bool {
    if frame.len() < MIN_FRAME_SIZE {
        return false;
    }

    match check_frame(frame) {
        Ok(header) => frame.len() == header.frame_size(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{FrameFlags, MessageType};

    fn sample() -> (FrameHeader, Vec<u8>) {
        let payload = b"hello, frame".to_vec();
        let header =
            FrameHeader::for_payload(MessageType::ECHO, FrameFlags::NONE, &payload).unwrap();
        (header, payload)
    }

    #[test]
    fn test_serialize_layout() {
        let (header, payload) = sample();
        let mut out = [0u8; 64];
        let n = serialize_frame(&header, &payload, &mut out).unwrap();

        assert_eq!(n, FRAME_HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
        assert_eq!(&out[..4], &[0xAB, 0x01, 0x03, 0x00]);
        assert_eq!(u16::from_le_bytes([out[4], out[5]]) as usize, payload.len());
        assert_eq!(&out[8..8 + payload.len()], payload.as_slice());
        assert_eq!(read_trailing_checksum(&out, 8 + payload.len()), crc32::checksum(&payload));
    }

    #[test]
    fn test_slice_and_bytesmut_agree() {
        let (header, payload) = sample();
        let mut out = vec![0u8; header.frame_size()];
        serialize_frame(&header, &payload, &mut out).unwrap();
        let encoded = encode_frame(&header, &payload).unwrap();
        assert_eq!(&encoded[..], out.as_slice());
    }

    #[test]
    fn test_serialize_rejects_small_buffer_without_writing() {
        let (header, payload) = sample();
        let mut out = vec![0x5Au8; header.frame_size() - 1];
        let err = serialize_frame(&header, &payload, &mut out).unwrap_err();
        assert!(matches!(err, ProtocolError::BufferTooSmall { .. }));
        assert!(out.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_serialize_rejects_invalid_header() {
        let (mut header, payload) = sample();
        header.version = 9;
        let mut out = [0u8; 64];
        assert!(matches!(
            serialize_frame(&header, &payload, &mut out),
            Err(ProtocolError::InvalidHeader { version: 9, .. })
        ));
    }

    #[test]
    fn test_serialize_rejects_length_mismatch() {
        let (mut header, payload) = sample();
        header.payload_length += 1;
        let mut out = [0u8; 64];
        assert!(matches!(
            serialize_frame(&header, &payload, &mut out),
            Err(ProtocolError::PayloadLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_roundtrip() {
        let (header, payload) = sample();
        let bytes = encode_frame(&header, &payload).unwrap();
        let decoded = deserialize_frame(&bytes).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.consumed, bytes.len());
    }

    #[test]
    fn test_deserialize_header_short_input() {
        let err = deserialize_header(&[0xAB, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InsufficientData {
                needed: 8,
                available: 2
            }
        ));
    }

    #[test]
    fn test_deserialize_header_bad_magic() {
        let raw = [0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            deserialize_header(&raw),
            Err(ProtocolError::InvalidHeader { magic: 0x00, .. })
        ));
    }

    #[test]
    fn test_deserialize_every_prefix_is_incomplete() {
        let (header, payload) = sample();
        let bytes = encode_frame(&header, &payload).unwrap();
        for cut in 0..bytes.len() {
            let err = deserialize_frame(&bytes[..cut]).unwrap_err();
            assert!(err.is_incomplete(), "prefix {cut} gave {err:?}");
        }
    }

    #[test]
    fn test_deserialize_detects_corruption() {
        let (header, payload) = sample();
        let mut bytes = encode_frame(&header, &payload).unwrap().to_vec();
        bytes[FRAME_HEADER_SIZE + 3] ^= 0x10;
        assert!(matches!(
            deserialize_frame(&bytes),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_leaves_trailing_frame() {
        let (header, payload) = sample();
        let mut stream = encode_frame(&header, &payload).unwrap().to_vec();
        let first_len = stream.len();
        stream.extend_from_slice(&encode_frame(&FrameHeader::default(), &[]).unwrap());

        let first = deserialize_frame(&stream).unwrap();
        assert_eq!(first.consumed, first_len);
        let second = deserialize_frame(&stream[first.consumed..]).unwrap();
        assert!(second.payload.is_empty());
        assert_eq!(second.consumed, MIN_FRAME_SIZE);
    }

    #[test]
    fn test_validate_frame() {
        let (header, payload) = sample();
        let bytes = encode_frame(&header, &payload).unwrap().to_vec();
        assert!(validate_frame(&bytes));
        assert!(!validate_frame(&bytes[..bytes.len() - 1]));

        let mut longer = bytes.clone();
        longer.push(0);
        assert!(!validate_frame(&longer));

        let mut corrupt = bytes;
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        assert!(!validate_frame(&corrupt));
        assert!(!validate_frame(&[]));
    }

    #[test]
    fn test_reserved_flags_pass_through_untouched() {
        let payload = [1u8, 2, 3];
        let header = FrameHeader::for_payload(
            MessageType::DATA,
            FrameFlags::COMPRESSED | FrameFlags::ENCRYPTED,
            &payload,
        )
        .unwrap();
        let decoded = deserialize_frame(&encode_frame(&header, &payload).unwrap()).unwrap();
        assert_eq!(decoded.payload, payload);
        assert!(decoded.header.has_flag(FrameFlags::COMPRESSED));
        assert!(decoded.header.has_flag(FrameFlags::ENCRYPTED));
    }
}
