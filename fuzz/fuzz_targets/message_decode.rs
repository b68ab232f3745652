//! Negative space fuzzer for Message decoding.
//!
//! Feeds arbitrary bytes to the decoder. Decoding may fail, but it must
//! never panic, and anything it accepts must survive a re-encode/decode
//! trip unchanged. (Byte-identity does not hold: redundant LEB128
//! encodings are accepted but re-encode canonically.)

#![no_main]

use libfuzzer_sys::fuzz_target;
use spartic_proto::Message;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = Message::decode(data) {
        let reencoded = message.to_vec();
        assert!(reencoded.len() <= data.len(), "canonical encoding should never grow");

        let again = Message::decode(&reencoded).expect("re-encoded messages must decode");
        assert_eq!(again, message, "round-trip mismatch");
    }
});
