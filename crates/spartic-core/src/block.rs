//! Fixed-size round blocks.
//!
//! Every round exchanges exactly one [`BLOCK_SIZE`]-byte block per
//! participant. This module holds the block container and the XOR
//! utilities everything else is built from.

use zeroize::Zeroize;

use spartic_proto::BLOCK_SIZE;

/// One round's worth of bytes, exactly [`BLOCK_SIZE`] long.
///
/// The fixed length is part of the protocol: masked blocks are
/// indistinguishable from random only if every participant emits the same
/// amount, every round.
#[derive(Clone, PartialEq, Eq)]
pub struct Block(Box<[u8; BLOCK_SIZE]>);

impl Block {
    /// An all-zero block.
    #[must_use]
    pub fn zeroed() -> Self {
        Self(Box::new([0u8; BLOCK_SIZE]))
    }

    /// Copy a slice of exactly [`BLOCK_SIZE`] bytes.
    ///
    /// Returns `None` for any other length.
    #[must_use]
    pub fn copy_from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != BLOCK_SIZE {
            return None;
        }

        let mut block = Self::zeroed();
        block.0.copy_from_slice(bytes);
        Some(block)
    }

    /// Copy a message of at most [`BLOCK_SIZE`] bytes, zero-padded to the
    /// full block length.
    ///
    /// Returns `None` if the message is too long.
    #[must_use]
    pub fn from_padded(message: &[u8]) -> Option<Self> {
        if message.len() > BLOCK_SIZE {
            return None;
        }

        let mut block = Self::zeroed();
        block.0[..message.len()].copy_from_slice(message);
        Some(block)
    }

    /// The block's bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// XOR `other` into this block in place.
    pub fn xor_assign(&mut self, other: &Block) {
        for (byte, other_byte) in self.0.iter_mut().zip(other.0.iter()) {
            *byte ^= other_byte;
        }
    }

    /// True iff every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&byte| byte == 0)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Zeroize for Block {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

// Blocks pass through keystream material and recovered plaintext; wipe
// them when they die.
impl Drop for Block {
    fn drop(&mut self) {
        self.zeroize();
    }
}

// 4096 raw bytes are useless in debug output.
impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block({BLOCK_SIZE} bytes)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_is_zero() {
        assert!(Block::zeroed().is_zero());
    }

    #[test]
    fn copy_requires_exact_length() {
        assert!(Block::copy_from_slice(&[0u8; BLOCK_SIZE]).is_some());
        assert!(Block::copy_from_slice(&[0u8; BLOCK_SIZE - 1]).is_none());
        assert!(Block::copy_from_slice(&[0u8; BLOCK_SIZE + 1]).is_none());
    }

    #[test]
    fn padding_zero_extends() {
        let block = Block::from_padded(b"hello").expect("fits in a block");

        assert_eq!(&block.as_bytes()[..5], b"hello");
        assert!(block.as_bytes()[5..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn padding_rejects_oversized_messages() {
        assert!(Block::from_padded(&[0u8; BLOCK_SIZE + 1]).is_none());
    }

    #[test]
    fn xor_is_self_inverse() {
        let mut noise = Block::zeroed();
        for (i, byte) in noise.0.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        let mut block = Block::from_padded(b"payload").expect("fits in a block");
        let original = block.clone();

        block.xor_assign(&noise);
        assert_ne!(block, original);

        block.xor_assign(&noise);
        assert_eq!(block, original);
    }
}
