#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use wire_protocol::protocol::message::Message;
use wire_protocol::MessageType;

fuzz_target!(|data: &[u8]| {
    // Fuzz payload decoding; the first byte picks the message type
    let Some((&tag, payload)) = data.split_first() else {
        return;
    };

    if let Ok(msg) = Message::decode(MessageType(tag), payload) {
        let mut buf = BytesMut::new();
        if msg.encode(&mut buf).is_ok() {
            let again = Message::decode(msg.message_type(), &buf);
            assert_eq!(again.ok().as_ref(), Some(&msg));
        }
    }
});
