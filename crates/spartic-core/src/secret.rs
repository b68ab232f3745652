//! Pairwise shared secret material.
//!
//! For every ordered pair of participants the generating side produces one
//! uniformly random 32-byte half and sends it verbatim over the
//! authenticated channel; both halves together key that pair's keystream
//! contribution. The container below keeps the bytes out of logs, zeroizes
//! them on drop, and compares in constant time. Side channels are
//! ultimately a property of the deployed system, so this is best-effort
//! hygiene, not a guarantee.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::env::Environment;
use spartic_proto::SECRET_SIZE;

/// One 32-byte half of a pair's keying material.
#[derive(Clone, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SECRET_SIZE]);

impl SharedSecret {
    /// Wrap existing secret bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh uniformly random secret.
    #[must_use]
    pub fn generate(env: &impl Environment) -> Self {
        let mut bytes = [0u8; SECRET_SIZE];
        env.random_bytes(&mut bytes);

        let secret = Self(bytes);
        bytes.zeroize();
        secret
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

// Never reveal secret bytes in debug output.
impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret").field("value", &"***").finish()
    }
}
