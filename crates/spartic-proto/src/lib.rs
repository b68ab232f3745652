//! Wire protocol for Spartic synchronized-keystream groups.
//!
//! This crate defines the three message kinds exchanged between group
//! participants and their byte-level encoding. Messages are framed by the
//! underlying message-oriented transport, so the codec operates on whole
//! message buffers and never needs to scan for boundaries.
//!
//! # Wire Format
//!
//! Every message starts with a one-byte tag followed by tag-specific fields:
//!
//! ```text
//! Key:    [0x01] [group_id: uvarint] [shared_key: 32 bytes]
//! Block:  [0x02] [group_id: uvarint] [sequence_number: uvarint] [block: rest]
//! Error:  [0x03] [text: UTF-8, rest]
//! ```
//!
//! Unsigned varints are LEB128: seven payload bits per byte, least
//! significant group first, high bit set on every byte except the last.
//!
//! The block field is deliberately not length-checked here. A misbehaving
//! peer can put any number of bytes on the wire, and the session layer is
//! responsible for rejecting blocks that are not exactly [`BLOCK_SIZE`]
//! long with a protocol error. The codec only enforces the overall
//! [`MAX_MESSAGE_SIZE`] sanity bound.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod message;
pub mod varint;

pub use errors::{CodecError, Result};
pub use message::{Message, MessageKind};

/// Identifier of a group, agreed out of band by its participants.
pub type GroupId = u64;

/// Byte length of every round block.
pub const BLOCK_SIZE: usize = 4096;

/// Byte length of a pairwise shared secret (one half of a pair's keying
/// material).
pub const SECRET_SIZE: usize = 32;

/// Byte length of an identity key derivation seed. Identity keys themselves
/// are managed outside the core.
pub const SEED_SIZE: usize = 32;

/// Name of the per-peer protocol all message channels live under.
pub const PROTOCOL_NAME: &str = "spartic";

/// Upper bound on a single encoded message.
///
/// The largest legitimate message is a `Block` carrying [`BLOCK_SIZE`]
/// payload bytes plus a handful of varint bytes; one mebibyte leaves
/// generous headroom while rejecting resource-exhaustion garbage before any
/// allocation happens.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
