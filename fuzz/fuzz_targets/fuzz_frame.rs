#![no_main]

use libfuzzer_sys::fuzz_target;
use wire_protocol::core::serialization::{deserialize_frame, encode_frame, validate_frame};

fuzz_target!(|data: &[u8]| {
    // Fuzz frame deserialization - test for panics and out-of-bounds reads
    let valid = validate_frame(data);
    if let Ok(frame) = deserialize_frame(data) {
        assert!(frame.consumed <= data.len());
        assert_eq!(valid, frame.consumed == data.len());

        // A decoded frame must re-encode to the same bytes
        if let Ok(bytes) = encode_frame(&frame.header, &frame.payload) {
            assert_eq!(&bytes[..], &data[..frame.consumed]);
        }
    } else {
        assert!(!valid);
    }
});
