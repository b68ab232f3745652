//! Unsigned LEB128 varints.
//!
//! Group identifiers and sequence numbers are usually tiny, so they ride
//! the wire as variable-length integers: seven payload bits per byte,
//! least significant group first, high bit set on every byte except the
//! last. A `u64` encodes in at most ten bytes.

use bytes::{Buf, BufMut};

use crate::errors::{CodecError, Result};

/// Maximum encoded length of a `u64` varint.
pub const MAX_LEN: usize = 10;

/// Append `value` to `dst` as an unsigned LEB128 varint.
pub fn put_uvarint(dst: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        dst.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Read an unsigned LEB128 varint from the front of `src`.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if the buffer ends before the final
/// byte of the varint, and [`CodecError::VarintOverflow`] if the encoding
/// carries more than 64 bits of payload.
pub fn get_uvarint(src: &mut impl Buf, field: &'static str) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        if !src.has_remaining() {
            return Err(CodecError::Truncated { field });
        }
        let byte = src.get_u8();
        let payload = u64::from(byte & 0x7f);

        // The tenth byte may only contribute the single remaining bit.
        if shift == 63 && payload > 1 {
            return Err(CodecError::VarintOverflow);
        }
        value |= payload << shift;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(CodecError::VarintOverflow);
        }
    }
}
