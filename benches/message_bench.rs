use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use wire_protocol::protocol::message::{
    DataMessage, EchoMessage, Message, PingMessage, StatusMessage,
};
use wire_protocol::{Dispatcher, FrameFlags, MessageType};

#[allow(clippy::unwrap_used)]
fn bench_message_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_codecs");
    let messages: Vec<Message> = vec![
        PingMessage {
            sequence_id: 1,
            timestamp: 2,
        }
        .into(),
        EchoMessage {
            data: b"hello world".to_vec(),
        }
        .into(),
        DataMessage {
            data_type: 1,
            data_id: 2,
            data: vec![0xAA; 512],
        }
        .into(),
        StatusMessage::new(0, 0, "all systems nominal").into(),
    ];

    group.bench_function("encode", |b| {
        b.iter_batched(
            || BytesMut::with_capacity(1024),
            |mut buf| {
                for m in &messages {
                    m.encode(&mut buf).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });

    let encoded: Vec<(MessageType, Vec<u8>)> = messages
        .iter()
        .map(|m| {
            let mut buf = BytesMut::new();
            m.encode(&mut buf).unwrap();
            (m.message_type(), buf.to_vec())
        })
        .collect();
    group.bench_function("decode", |b| {
        b.iter(|| {
            for (ty, bytes) in &encoded {
                let _ = Message::decode(*ty, bytes).unwrap();
            }
        })
    });

    group.bench_function("to_frame", |b| {
        b.iter(|| {
            for m in &messages {
                let _ = m.to_frame(FrameFlags::NONE).unwrap();
            }
        })
    });

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_dispatch(c: &mut Criterion) {
    let dispatcher = Dispatcher::new();
    dispatcher.register::<PingMessage, _>(|_| true).unwrap();
    let payload = [0u8; 12];

    c.bench_function("dispatch_ping", |b| {
        b.iter(|| dispatcher.dispatch(MessageType::PING, &payload).unwrap())
    });
}

criterion_group!(benches, bench_message_codecs, bench_dispatch);
criterion_main!(benches);
