//! One exchange round.
//!
//! A round is one [`BLOCK_SIZE`](spartic_proto::BLOCK_SIZE)-byte exchange:
//! each participant emits exactly one masked block, and everyone recovers
//! the XOR of all emitted payloads. This type is a plain record — every
//! transition is driven by [`Session`](crate::session::Session).

use std::collections::BTreeMap;

use crate::{block::Block, identity::PublicKey};

/// State of one round as seen by the local participant.
///
/// # Invariants
///
/// - `their_blocks` is keyed only by participants of the owning session,
///   each at most once.
/// - `sequence_number` increases monotonically from 0 across a session's
///   rounds.
#[derive(Debug, Clone)]
pub struct Round {
    pub(crate) sequence_number: u64,
    /// Our masked block, `None` until the local participant joins the
    /// round.
    pub(crate) our_block: Option<Block>,
    /// Masked blocks received from each other participant.
    pub(crate) their_blocks: BTreeMap<PublicKey, Block>,
}

impl Round {
    pub(crate) fn new(sequence_number: u64) -> Self {
        Self { sequence_number, our_block: None, their_blocks: BTreeMap::new() }
    }

    /// Round index, also the keystream position this round reads.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// True once the local participant has contributed its block.
    #[must_use]
    pub fn has_local_block(&self) -> bool {
        self.our_block.is_some()
    }

    /// Number of peer blocks received so far.
    #[must_use]
    pub fn received_blocks(&self) -> usize {
        self.their_blocks.len()
    }

    /// True if a block from `peer` is already recorded.
    #[must_use]
    pub fn has_block_from(&self, peer: &PublicKey) -> bool {
        self.their_blocks.contains_key(peer)
    }
}
