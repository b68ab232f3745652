//! Exhaustive positive space fuzzer for Message encoding/decoding
//!
//! Unlike random fuzzing (message_decode.rs), this fuzzer EXHAUSTIVELY
//! tests all combinations of:
//! - All three message kinds
//! - Edge-case values (0, 1, MAX, varint boundaries) for all integer
//!   fields
//! - Empty, undersized, exact, and oversized block payloads
//!
//! This ensures we don't miss bugs that occur only with specific
//! kind+value combinations that random sampling might not hit.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use spartic_proto::{BLOCK_SIZE, Message, SECRET_SIZE};

// Edge-case values for varint-encoded u64 fields
const U64_EDGES: &[u64] = &[
    0,
    1,
    127, // One varint byte
    128, // Two varint bytes
    0x3fff,
    0x4000,
    u32::MAX as u64,
    u64::MAX / 2,
    u64::MAX - 1,
    u64::MAX,
];

// Block payload sizes to test
const BLOCK_SIZES: &[usize] = &[
    0,              // Empty
    1,              // Single byte
    BLOCK_SIZE - 1, // Just under a legitimate block
    BLOCK_SIZE,     // A legitimate block
    BLOCK_SIZE + 1, // Just over
];

fuzz_target!(|data: &[u8]| {
    // Use input data to select which combination to test
    // This allows libFuzzer to guide exploration while remaining exhaustive
    if data.len() < 3 {
        return;
    }

    let group_id = U64_EDGES[data[0] as usize % U64_EDGES.len()];
    let sequence_number = U64_EDGES[data[1] as usize % U64_EDGES.len()];
    let fill = data[2];

    let mut shared_key = [0u8; SECRET_SIZE];
    for (i, byte) in shared_key.iter_mut().enumerate() {
        *byte = fill.wrapping_add(i as u8);
    }

    let mut messages = vec![Message::Key { group_id, shared_key }];

    for &size in BLOCK_SIZES {
        messages.push(Message::Block {
            group_id,
            sequence_number,
            block: Bytes::from(vec![fill; size]),
        });
    }

    if let Ok(text) = std::str::from_utf8(&data[3..]) {
        messages.push(Message::Error { text: text.to_owned() });
    }

    for message in messages {
        // INVARIANT 1: Encoding must succeed (it is infallible by type)
        let wire = message.to_vec();

        // INVARIANT 2: Decoding must succeed
        let decoded = Message::decode(&wire).expect("decode should succeed for valid encoding");

        // INVARIANT 3: Round-trip must be identity
        assert_eq!(decoded, message, "round-trip mismatch");

        // INVARIANT 4: The kind survives the trip
        assert_eq!(decoded.kind(), message.kind());
    }
});
