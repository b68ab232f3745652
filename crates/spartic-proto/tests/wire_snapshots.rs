//! Snapshot tests for wire format stability.
//!
//! Every message kind is pinned to its exact byte sequence. If the wire
//! format changes, these tests fail, so protocol compatibility is never
//! broken by accident.

use bytes::Bytes;
use insta::assert_snapshot;
use spartic_proto::{Message, SECRET_SIZE};

fn message_to_hex(message: &Message) -> String {
    hex::encode(message.to_vec())
}

#[test]
fn snapshot_key_message() {
    let message = Message::Key { group_id: 7, shared_key: [0xaa; SECRET_SIZE] };

    assert_snapshot!(
        message_to_hex(&message),
        @"0107aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
    );
}

#[test]
fn snapshot_key_message_multibyte_group() {
    let message = Message::Key { group_id: 300, shared_key: [0x11; SECRET_SIZE] };

    assert_snapshot!(
        message_to_hex(&message),
        @"01ac021111111111111111111111111111111111111111111111111111111111111111"
    );
}

#[test]
fn snapshot_block_message() {
    let message =
        Message::Block { group_id: 1, sequence_number: 5, block: Bytes::from(vec![0x42; 4]) };

    assert_snapshot!(message_to_hex(&message), @"02010542424242");
}

#[test]
fn snapshot_block_message_multibyte_sequence() {
    let message =
        Message::Block { group_id: 1, sequence_number: 128, block: Bytes::from(vec![0xff]) };

    assert_snapshot!(message_to_hex(&message), @"02018001ff");
}

#[test]
fn snapshot_error_message() {
    let message = Message::Error { text: "round mismatch".to_string() };

    assert_snapshot!(message_to_hex(&message), @"03726f756e64206d69736d61746368");
}
