//! The synchronized keystream primitive.
//!
//! A *synchronized keystream* is one member of a set of N pseudorandom
//! streams whose per-bit XOR across the set is identically zero. The
//! construction: every pair of participants {p, q} shares one secret that
//! appears in exactly p's and q's secret lists and nowhere else. Each
//! participant's stream is the XOR of one XSalsa20 keystream per secret in
//! its list, so every pairwise cipher stream occurs in exactly two
//! participants' outputs and cancels when everything is summed.
//!
//! The stream is indexed by the round sequence number, which is encoded
//! into the cipher nonce. Reading the same position twice yields identical
//! bytes; XORing *different* data under the same position is the classic
//! two-time-pad break, so callers must consume each sequence number
//! exactly once.

use salsa20::{
    Key, XNonce, XSalsa20,
    cipher::{KeyIvInit, StreamCipher},
};

use crate::secret::SharedSecret;

/// XSalsa20 nonce: 16 zero bytes followed by the big-endian sequence
/// number.
const NONCE_LEN: usize = 24;

/// An immutable set of pairwise secrets producing one participant's
/// synchronized stream.
///
/// The list is stored as given. Order is semantically irrelevant (XOR
/// commutes) and duplicates are permitted — they cancel each other out.
///
/// Reading is stateless: the output is a pure function of
/// (secrets, sequence number, length), and no mutable state survives a
/// call.
#[derive(Clone)]
pub struct SynchronizedKeystream {
    secrets: Vec<SharedSecret>,
}

impl SynchronizedKeystream {
    /// Build a keystream over the given secrets.
    #[must_use]
    pub fn new(secrets: Vec<SharedSecret>) -> Self {
        Self { secrets }
    }

    /// Number of secrets keying this stream.
    #[must_use]
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    /// Produce `length` bytes of keystream at the position named by
    /// `sequence_number`.
    ///
    /// Cannot fail. An empty secret list yields all zeros, which is
    /// consistent with the XOR construction but keys nothing — sessions
    /// never build one.
    #[must_use]
    pub fn read(&self, sequence_number: u64, length: usize) -> Vec<u8> {
        let nonce_bytes = nonce_for(sequence_number);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let mut out = vec![0u8; length];
        for secret in &self.secrets {
            let key = Key::from_slice(secret.as_bytes());
            let mut cipher = XSalsa20::new(key, nonce);

            // apply_keystream XORs the cipher stream into the buffer, so
            // running every cipher over the same buffer accumulates the
            // XOR of all streams.
            cipher.apply_keystream(&mut out);
        }

        out
    }
}

fn nonce_for(sequence_number: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[NONCE_LEN - 8..].copy_from_slice(&sequence_number.to_be_bytes());
    nonce
}

impl std::fmt::Debug for SynchronizedKeystream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynchronizedKeystream")
            .field("secret_count", &self.secrets.len())
            .finish()
    }
}
