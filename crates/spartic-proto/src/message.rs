//! The tagged message codec.
//!
//! Spartic speaks exactly three message kinds. The kind determines the
//! logical channel a message rides within the per-peer
//! [`PROTOCOL_NAME`](crate::PROTOCOL_NAME) protocol, and the tag byte lets
//! a receiver dispatch without further parsing.

use std::fmt;

use bytes::{Buf, BufMut, Bytes};

use crate::{
    GroupId, MAX_MESSAGE_SIZE, SECRET_SIZE,
    errors::{CodecError, Result},
    varint,
};

/// The three message kinds, doubling as channel names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// One half of a pairwise shared secret.
    Key,
    /// One participant's XOR-masked block for a round.
    Block,
    /// Human-readable report of a protocol violation.
    Error,
}

impl MessageKind {
    /// Wire tag for this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Key => 0x01,
            Self::Block => 0x02,
            Self::Error => 0x03,
        }
    }

    /// Parse a wire tag.
    ///
    /// Returns `None` for unknown tags; callers must reject those
    /// explicitly rather than guessing a kind.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Key),
            0x02 => Some(Self::Block),
            0x03 => Some(Self::Error),
            _ => None,
        }
    }

    /// Channel name within the `"spartic"` protocol.
    #[must_use]
    pub const fn channel(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Block => "block",
            Self::Error => "error",
        }
    }
}

/// A complete wire message.
///
/// Framing is the transport's job; a `Message` encodes to exactly one
/// transport frame and decodes from exactly one.
///
/// # Invariants
///
/// - Encoding then decoding yields an equal message (round-trip identity,
///   property tested).
/// - Decoding validates everything before allocating for the payload:
///   size bound, tag, field completeness.
#[derive(Clone, PartialEq, Eq)]
pub enum Message {
    /// One half of a pairwise shared secret, sent once per peer at session
    /// start.
    Key {
        /// Group the secret belongs to
        group_id: GroupId,
        /// The 32-byte secret half
        shared_key: [u8; SECRET_SIZE],
    },

    /// One participant's masked block for one round.
    Block {
        /// Group the block belongs to
        group_id: GroupId,
        /// Round the block belongs to
        sequence_number: u64,
        /// Masked block bytes. Legitimate senders put exactly
        /// [`BLOCK_SIZE`](crate::BLOCK_SIZE) bytes here; the codec carries
        /// whatever arrived so the session can report wrong-size blocks.
        block: Bytes,
    },

    /// Report of a protocol violation, carrying no group context.
    Error {
        /// Human-readable description
        text: String,
    },
}

impl Message {
    /// Kind of this message.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Key { .. } => MessageKind::Key,
            Self::Block { .. } => MessageKind::Block,
            Self::Error { .. } => MessageKind::Error,
        }
    }

    /// Encode into `dst`.
    ///
    /// Encoding is infallible: every in-memory message has exactly one
    /// wire representation.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.kind().tag());

        match self {
            Self::Key { group_id, shared_key } => {
                varint::put_uvarint(dst, *group_id);
                dst.put_slice(shared_key);
            },
            Self::Block { group_id, sequence_number, block } => {
                varint::put_uvarint(dst, *group_id);
                varint::put_uvarint(dst, *sequence_number);
                dst.put_slice(block);
            },
            Self::Error { text } => {
                dst.put_slice(text.as_bytes());
            },
        }
    }

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Decode one message from a complete transport frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer exceeds [`MAX_MESSAGE_SIZE`], is
    /// empty, starts with an unknown tag, ends mid-field, carries trailing
    /// bytes after a `Key`, or holds non-UTF-8 error text. The cheap checks
    /// run first so garbage is rejected before any copying.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge { size: bytes.len(), max: MAX_MESSAGE_SIZE });
        }

        let mut src = bytes;
        if !src.has_remaining() {
            return Err(CodecError::Empty);
        }

        let tag = src.get_u8();
        let kind = MessageKind::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;

        match kind {
            MessageKind::Key => {
                let group_id = varint::get_uvarint(&mut src, "group_id")?;

                if src.remaining() < SECRET_SIZE {
                    return Err(CodecError::Truncated { field: "shared_key" });
                }
                let mut shared_key = [0u8; SECRET_SIZE];
                src.copy_to_slice(&mut shared_key);

                if src.has_remaining() {
                    return Err(CodecError::TrailingBytes { len: src.remaining() });
                }

                Ok(Self::Key { group_id, shared_key })
            },
            MessageKind::Block => {
                let group_id = varint::get_uvarint(&mut src, "group_id")?;
                let sequence_number = varint::get_uvarint(&mut src, "sequence_number")?;
                let block = Bytes::copy_from_slice(src);

                Ok(Self::Block { group_id, sequence_number, block })
            },
            MessageKind::Error => {
                let text = std::str::from_utf8(src).map_err(|_| CodecError::InvalidText)?;

                Ok(Self::Error { text: text.to_owned() })
            },
        }
    }
}

// Manual Debug: never print secret halves, abbreviate block payloads.
impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { group_id, .. } => f
                .debug_struct("Key")
                .field("group_id", group_id)
                .field("shared_key", &"***")
                .finish(),
            Self::Block { group_id, sequence_number, block } => f
                .debug_struct("Block")
                .field("group_id", group_id)
                .field("sequence_number", sequence_number)
                .field("block", &format_args!("{} bytes", block.len()))
                .finish(),
            Self::Error { text } => f.debug_struct("Error").field("text", text).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::BLOCK_SIZE;

    impl Arbitrary for Message {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            let key = (any::<u64>(), any::<[u8; SECRET_SIZE]>())
                .prop_map(|(group_id, shared_key)| Message::Key { group_id, shared_key });

            let block = (any::<u64>(), any::<u64>(), prop::collection::vec(any::<u8>(), 0..8192))
                .prop_map(|(group_id, sequence_number, block)| Message::Block {
                    group_id,
                    sequence_number,
                    block: Bytes::from(block),
                });

            let error = any::<String>().prop_map(|text| Message::Error { text });

            prop_oneof![key, block, error].boxed()
        }
    }

    proptest! {
        #[test]
        fn message_round_trip(message in any::<Message>()) {
            let wire = message.to_vec();
            let parsed = Message::decode(&wire).expect("should decode");
            prop_assert_eq!(message, parsed);
        }
    }

    #[test]
    fn full_size_block_round_trip() {
        let message = Message::Block {
            group_id: 7,
            sequence_number: 42,
            block: Bytes::from(vec![0x5a; BLOCK_SIZE]),
        };

        let wire = message.to_vec();
        assert_eq!(Message::decode(&wire).expect("should decode"), message);
    }

    #[test]
    fn reject_empty_buffer() {
        assert_eq!(Message::decode(&[]), Err(CodecError::Empty));
    }

    #[test]
    fn reject_unknown_tag() {
        assert_eq!(Message::decode(&[0x7e, 0x01]), Err(CodecError::UnknownTag(0x7e)));
    }

    #[test]
    fn reject_short_key() {
        let mut wire = vec![MessageKind::Key.tag(), 0x01];
        wire.extend_from_slice(&[0xaa; SECRET_SIZE - 1]);

        assert_eq!(Message::decode(&wire), Err(CodecError::Truncated { field: "shared_key" }));
    }

    #[test]
    fn reject_key_with_trailing_bytes() {
        let mut wire = vec![MessageKind::Key.tag(), 0x01];
        wire.extend_from_slice(&[0xaa; SECRET_SIZE + 3]);

        assert_eq!(Message::decode(&wire), Err(CodecError::TrailingBytes { len: 3 }));
    }

    #[test]
    fn reject_oversized_message() {
        let wire = vec![MessageKind::Error.tag(); MAX_MESSAGE_SIZE + 1];

        assert_eq!(
            Message::decode(&wire),
            Err(CodecError::MessageTooLarge { size: MAX_MESSAGE_SIZE + 1, max: MAX_MESSAGE_SIZE })
        );
    }

    #[test]
    fn reject_non_utf8_error_text() {
        let wire = vec![MessageKind::Error.tag(), 0xff, 0xfe];

        assert_eq!(Message::decode(&wire), Err(CodecError::InvalidText));
    }

    #[test]
    fn wrong_size_blocks_still_decode() {
        // The session, not the codec, reports wrong-size blocks.
        let message = Message::Block {
            group_id: 1,
            sequence_number: 0,
            block: Bytes::from(vec![0u8; BLOCK_SIZE - 1]),
        };

        let wire = message.to_vec();
        assert_eq!(Message::decode(&wire).expect("should decode"), message);
    }

    #[test]
    fn empty_error_text_decodes() {
        let wire = vec![MessageKind::Error.tag()];
        assert_eq!(Message::decode(&wire), Ok(Message::Error { text: String::new() }));
    }

    #[test]
    fn tag_round_trip() {
        for kind in [MessageKind::Key, MessageKind::Block, MessageKind::Error] {
            assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MessageKind::from_tag(0x00), None);
        assert_eq!(MessageKind::from_tag(0x04), None);
    }

    #[test]
    fn kinds_name_distinct_channels() {
        let channels: std::collections::BTreeSet<&str> =
            [MessageKind::Key, MessageKind::Block, MessageKind::Error]
                .iter()
                .map(|kind| kind.channel())
                .collect();

        assert_eq!(channels.len(), 3);
    }

    #[test]
    fn debug_redacts_shared_key() {
        let message = Message::Key { group_id: 1, shared_key: [0xaa; SECRET_SIZE] };
        let rendered = format!("{message:?}");

        assert!(rendered.contains("***"));
        assert!(!rendered.contains("aa"), "got: {rendered}");
    }
}
