//! Error types for the Spartic wire codec.
//!
//! All errors are structured, testable, and carry enough context to report
//! what a malformed buffer looked like without echoing its contents.

use thiserror::Error;

/// Errors that can occur while decoding a wire message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer contained no bytes at all.
    #[error("message is empty")]
    Empty,

    /// The leading tag byte does not name a known message kind.
    #[error("unknown message tag: {0:#04x}")]
    UnknownTag(u8),

    /// The buffer ended in the middle of a field.
    #[error("message truncated while reading {field}")]
    Truncated {
        /// Field being read when the buffer ran out
        field: &'static str,
    },

    /// A varint used more bits than fit in a `u64`.
    #[error("varint overflows u64")]
    VarintOverflow,

    /// The message exceeds the sanity bound.
    #[error("message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge {
        /// Actual encoded size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Bytes remained after the final fixed-size field of a message.
    #[error("{len} trailing bytes after key message")]
    TrailingBytes {
        /// Number of unexpected bytes
        len: usize,
    },

    /// An error message's text field is not valid UTF-8.
    #[error("error text is not valid UTF-8")]
    InvalidText,
}

/// Convenient Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
