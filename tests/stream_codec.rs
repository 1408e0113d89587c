//! Integration tests for the stream codec
//!
//! These tests drive [`FrameCodec`] through `FramedRead`/`FramedWrite` over in-memory
//! readers and writers, and check the zero-copy split of the receive buffer.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};
use wire_protocol::protocol::message::{Message, PingMessage, StatusMessage};
use wire_protocol::{
    CodecConfig, Frame, FrameCodec, FrameFlags, MessageType, ProtocolConfig, ProtocolEngine,
    ProtocolError, ResyncPolicy,
};

fn frames() -> Vec<Frame> {
    vec![
        Frame::new(MessageType::ECHO, FrameFlags::NONE, &b"one"[..]).unwrap(),
        Frame::new(MessageType::DATA, FrameFlags::ACK_REQUIRED, vec![7u8; 300]).unwrap(),
        Frame::new(MessageType(0x42), FrameFlags::NONE, Bytes::new()).unwrap(),
    ]
}

fn wire(frames: &[Frame]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    let mut codec = FrameCodec::new();
    for frame in frames {
        codec.encode(frame.clone(), &mut buf).unwrap();
    }
    buf.to_vec()
}

#[tokio::test]
async fn test_framed_read_from_slice() {
    let expected = frames();
    let bytes = wire(&expected);

    let mut reader = FramedRead::new(&bytes[..], FrameCodec::new());
    let mut decoded = Vec::new();
    while let Some(frame) = reader.next().await {
        decoded.push(frame.expect("Failed to decode"));
    }

    assert_eq!(decoded, expected);
}

#[tokio::test]
async fn test_framed_write_then_read() {
    let mut writer = FramedWrite::new(Vec::new(), FrameCodec::new());
    for frame in frames() {
        writer.send(frame).await.unwrap();
    }
    let written = writer.into_inner();
    assert_eq!(written, wire(&frames()));

    let reader = FramedRead::new(&written[..], FrameCodec::new());
    let decoded: Vec<_> = reader.map(|r| r.unwrap()).collect().await;
    assert_eq!(decoded.len(), 3);
}

#[tokio::test]
async fn test_framed_read_across_pipe_chunks() {
    let expected = frames();
    let bytes = wire(&expected);
    let (mut tx, rx) = tokio::io::duplex(16);

    let feeder = tokio::spawn(async move {
        for chunk in bytes.chunks(5) {
            tx.write_all(chunk).await.unwrap();
        }
    });

    let decoded: Vec<Frame> = FramedRead::new(rx, FrameCodec::new())
        .map(|r| r.unwrap())
        .collect()
        .await;
    feeder.await.unwrap();

    assert_eq!(decoded, expected);
}

#[tokio::test]
async fn test_truncated_stream_reports_insufficient_data() {
    let bytes = wire(&frames());
    let cut = &bytes[..bytes.len() - 3];

    let results: Vec<_> = FramedRead::new(cut, FrameCodec::new()).collect().await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(
        results[2],
        Err(ProtocolError::InsufficientData { .. })
    ));
}

#[tokio::test]
async fn test_noise_between_frames_is_skipped() {
    let expected = frames();
    let mut bytes = vec![0x00, 0x13, 0x37];
    bytes.extend(wire(&expected[..1]));
    bytes.extend([0xFF, 0xFE]);
    bytes.extend(wire(&expected[1..]));

    let decoded: Vec<Frame> = FramedRead::new(&bytes[..], FrameCodec::new())
        .map(|r| r.unwrap())
        .collect()
        .await;
    assert_eq!(decoded, expected);
}

#[tokio::test]
async fn test_fail_policy_surfaces_error() {
    let codec = FrameCodec::with_config(&CodecConfig {
        resync_policy: ResyncPolicy::Fail,
        ..CodecConfig::default()
    });
    let mut bytes = wire(&frames());
    bytes[0] = 0x00;

    let mut reader = FramedRead::new(&bytes[..], codec);
    assert!(matches!(
        reader.next().await,
        Some(Err(ProtocolError::InvalidHeader { magic: 0x00, .. }))
    ));
}

#[test]
fn test_codec_decode_zero_copy_split() {
    let bytes = wire(&frames()[..1]);
    let mut buffer = BytesMut::from(&bytes[..]);
    let payload_ptr = buffer[8..].as_ptr();

    let frame = FrameCodec::new()
        .decode(&mut buffer)
        .expect("Failed to decode")
        .expect("Should have frame");

    assert_eq!(&frame.payload[..], b"one");
    // payload points into the original receive buffer
    assert_eq!(frame.payload.as_ptr(), payload_ptr);
    assert!(buffer.is_empty());
}

#[test]
fn test_engine_codec_matches_config() {
    let config = ProtocolConfig::default_with_overrides(|c| {
        c.codec.max_payload_size = 100;
        c.codec.resync_policy = ResyncPolicy::DropBuffer;
    });
    let engine = ProtocolEngine::new(&config);
    let codec = engine.codec();
    assert_eq!(codec.max_payload_size(), 100);
    assert_eq!(codec.resync_policy(), ResyncPolicy::DropBuffer);
}

#[tokio::test]
async fn test_engine_messages_through_framed_io() {
    let engine = ProtocolEngine::default();
    let messages: Vec<Message> = vec![
        PingMessage {
            sequence_id: 12345,
            timestamp: 1,
        }
        .into(),
        StatusMessage::new(1, 500, "degraded").into(),
    ];

    let mut writer = FramedWrite::new(Vec::new(), engine.codec());
    for msg in &messages {
        writer.send(msg.to_frame(FrameFlags::NONE).unwrap()).await.unwrap();
    }
    let written = writer.into_inner();

    let decoded: Vec<Message> = FramedRead::new(&written[..], engine.codec())
        .map(|r| {
            let frame = r.unwrap();
            Message::decode(frame.message_type(), &frame.payload).unwrap()
        })
        .collect()
        .await;
    assert_eq!(decoded, messages);
}
