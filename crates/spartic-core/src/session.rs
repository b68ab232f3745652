//! Per-group session state machine.
//!
//! A `Session` is one participant's membership in one group. It owns the
//! pairwise key exchange, orders inbound and outbound blocks into
//! sequenced rounds, XOR-combines received blocks with the local one, and
//! queues outbound wire traffic per peer. It performs no I/O: inbound
//! messages arrive by method call, outbound messages leave through
//! per-peer FIFO queues that the [`Router`](crate::router::Router) drains.
//!
//! # State Machine
//!
//! ```text
//! ┌───────┐ last peer key  ┌───────────────────────┐ participate ┌────────────────────┐
//! │ SETUP │───────────────>│ RUNNING awaiting local│────────────>│ RUNNING awaiting   │
//! └───────┘                └───────────────────────┘             │ peers              │
//!     │                            ^                             └────────────────────┘
//!     │ blocks for round 0         │     round complete: emit result,      │
//!     └──> buffer in next round    └───────── promote next round <─────────┘
//! ```
//!
//! # Pipelining
//!
//! At most two rounds are live: the current round being assembled and the
//! next round, which buffers blocks from peers running one round ahead.
//! A block matching neither sequence number is rejected as out-of-window.
//!
//! # Error Discipline
//!
//! Protocol misuse by a peer (duplicate key, bad-size block, out-of-window
//! sequence, duplicate block) is reported by queueing an `Error` message
//! on that peer's outbound queue — never by failing, discarding silently,
//! or ending the session. Misuse by the local caller is a typed
//! [`SessionError`] and mutates nothing.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::mem;

use bytes::Bytes;
use zeroize::Zeroize;

use crate::{
    block::Block,
    env::Environment,
    error::SessionError,
    identity::PublicKey,
    keystream::SynchronizedKeystream,
    round::Round,
    secret::SharedSecret,
};
use spartic_proto::{BLOCK_SIZE, GroupId, Message};

const ERR_DUPLICATE_KEY: &str = "public key already received";
const ERR_UNACCEPTABLE_ROUND: &str = "block is for an unacceptable round";
const ERR_WRONG_SIZE: &str = "block is the wrong size";
const ERR_DUPLICATE_BLOCK: &str = "block is already here";

/// Coarse lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for at least one peer's shared key half.
    Setup,
    /// All keys exchanged; rounds are live.
    Running,
}

/// A message queued for one peer, not yet bound to the wire format.
///
/// The router attaches the group id and serializes when it drains the
/// queue, so secrets stay inside their zeroizing container until the last
/// moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Our shared secret half for this peer.
    Key(SharedSecret),
    /// Our masked block for a round.
    Block {
        /// Round the block belongs to
        sequence_number: u64,
        /// The masked block
        block: Block,
    },
    /// Report of a protocol violation by this peer.
    Error(String),
}

impl Outbound {
    /// Bind to a group and convert to the wire representation.
    #[must_use]
    pub fn into_message(self, group_id: GroupId) -> Message {
        match self {
            Self::Key(secret) => Message::Key { group_id, shared_key: *secret.as_bytes() },
            Self::Block { sequence_number, block } => Message::Block {
                group_id,
                sequence_number,
                block: Bytes::copy_from_slice(block.as_bytes()),
            },
            Self::Error(text) => Message::Error { text },
        }
    }
}

/// One participant's state for one group.
pub struct Session {
    group_id: GroupId,
    /// Half we generated for each peer; the peer set is this map's keys.
    our_shared_keys: BTreeMap<PublicKey, SharedSecret>,
    /// Half received from each peer, `None` until it arrives.
    their_shared_keys: BTreeMap<PublicKey, Option<SharedSecret>>,
    /// Built once the last peer half arrives.
    keystream: Option<SynchronizedKeystream>,
    /// Round currently being assembled; `None` during setup.
    current_round: Option<Round>,
    /// Buffers blocks arriving one round ahead.
    next_round: Round,
    /// Per-peer outbound FIFO.
    queues: BTreeMap<PublicKey, VecDeque<Outbound>>,
    /// Completed rounds' recovered content, in sequence order.
    results: VecDeque<Block>,
}

impl Session {
    /// Create a session for a group with the given other participants.
    ///
    /// Generates one fresh secret half per peer and queues it as a `Key`
    /// message on that peer's outbound queue.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoPeers`] for an empty peer set — a group
    /// needs at least two participants.
    pub fn new<E: Environment>(
        group_id: GroupId,
        other_pubkeys: &BTreeSet<PublicKey>,
        env: &E,
    ) -> Result<Self, SessionError> {
        if other_pubkeys.is_empty() {
            return Err(SessionError::NoPeers);
        }

        let mut our_shared_keys = BTreeMap::new();
        let mut their_shared_keys = BTreeMap::new();
        let mut queues = BTreeMap::new();

        for &peer in other_pubkeys {
            let secret = SharedSecret::generate(env);
            queues.insert(peer, VecDeque::from([Outbound::Key(secret.clone())]));
            our_shared_keys.insert(peer, secret);
            their_shared_keys.insert(peer, None);
        }

        tracing::debug!(group_id, peers = other_pubkeys.len(), "session created");

        Ok(Self {
            group_id,
            our_shared_keys,
            their_shared_keys,
            keystream: None,
            current_round: None,
            next_round: Round::new(0),
            queues,
            results: VecDeque::new(),
        })
    }

    /// Group this session belongs to.
    #[must_use]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Lifecycle state: `Setup` until every peer's key half has arrived.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.keystream.is_some() { SessionState::Running } else { SessionState::Setup }
    }

    /// The other participants, in stable (byte-lexicographic) order.
    pub fn peers(&self) -> impl Iterator<Item = &PublicKey> {
        self.our_shared_keys.keys()
    }

    /// True if `peer` is a member of this session.
    #[must_use]
    pub fn contains_peer(&self, peer: &PublicKey) -> bool {
        self.our_shared_keys.contains_key(peer)
    }

    /// The round currently being assembled, if key exchange has completed.
    #[must_use]
    pub fn current_round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    /// The buffer round one sequence number ahead of the current one.
    #[must_use]
    pub fn next_round(&self) -> &Round {
        &self.next_round
    }

    /// Sequence number of the current round.
    #[must_use]
    pub fn current_sequence_number(&self) -> Option<u64> {
        self.current_round.as_ref().map(Round::sequence_number)
    }

    /// True iff the local participant can contribute a block right now.
    #[must_use]
    pub fn ready_to_participate(&self) -> bool {
        self.current_round.as_ref().is_some_and(|round| round.our_block.is_none())
    }

    /// Accept a peer's shared secret half.
    ///
    /// When the final half arrives, the keystream is constructed and round
    /// 0 (including any blocks buffered during setup) becomes current.
    ///
    /// A duplicate key queues `"public key already received"` to the peer
    /// and leaves the stored half untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownPeer`] if `from` is not a member;
    /// the router checks membership before delivering, so hitting this is
    /// a driver bug.
    pub fn receive_key(
        &mut self,
        from: PublicKey,
        shared_key: SharedSecret,
    ) -> Result<(), SessionError> {
        let Some(slot) = self.their_shared_keys.get_mut(&from) else {
            return Err(SessionError::UnknownPeer(from));
        };

        if slot.is_some() {
            tracing::warn!(group_id = self.group_id, peer = %from, "duplicate key half");
            self.enqueue_error(from, ERR_DUPLICATE_KEY);
            return Ok(());
        }
        *slot = Some(shared_key);

        if self.their_shared_keys.values().any(Option::is_none) {
            return Ok(());
        }

        // Final half arrived. Both halves of every pair go into the list;
        // the peer's copy of the list contains the same two values for
        // this pair, which is exactly what makes the streams cancel.
        let mut secrets = Vec::with_capacity(self.our_shared_keys.len() * 2);
        for (peer, ours) in &self.our_shared_keys {
            secrets.push(ours.clone());
            secrets.push(
                self.their_shared_keys[peer]
                    .clone()
                    .expect("all peer halves present once none are missing"),
            );
        }
        self.keystream = Some(SynchronizedKeystream::new(secrets));

        tracing::debug!(group_id = self.group_id, "key exchange complete");
        self.advance_round();

        Ok(())
    }

    /// Accept a peer's masked block for a round.
    ///
    /// The block lands in the current round if the sequence number
    /// matches, or in the next round if it is one ahead. Anything else is
    /// out-of-window and is answered with
    /// `"block is for an unacceptable round"`; wrong-size and duplicate
    /// blocks are answered likewise without touching round state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownPeer`] if `from` is not a member.
    pub fn receive_block(
        &mut self,
        from: PublicKey,
        sequence_number: u64,
        block: &[u8],
    ) -> Result<(), SessionError> {
        if !self.our_shared_keys.contains_key(&from) {
            return Err(SessionError::UnknownPeer(from));
        }

        enum Target {
            Current,
            Next,
        }

        let target = if self.current_sequence_number() == Some(sequence_number) {
            Target::Current
        } else if self.next_round.sequence_number == sequence_number {
            Target::Next
        } else {
            tracing::warn!(
                group_id = self.group_id,
                peer = %from,
                sequence_number,
                "block outside the round window"
            );
            self.enqueue_error(from, ERR_UNACCEPTABLE_ROUND);
            return Ok(());
        };

        if block.len() != BLOCK_SIZE {
            tracing::warn!(
                group_id = self.group_id,
                peer = %from,
                length = block.len(),
                "wrong-size block"
            );
            self.enqueue_error(from, ERR_WRONG_SIZE);
            return Ok(());
        }

        let round = match target {
            Target::Current => {
                self.current_round.as_mut().expect("current round exists for its sequence number")
            },
            Target::Next => &mut self.next_round,
        };

        if round.their_blocks.contains_key(&from) {
            tracing::warn!(
                group_id = self.group_id,
                peer = %from,
                sequence_number,
                "duplicate block"
            );
            self.enqueue_error(from, ERR_DUPLICATE_BLOCK);
            return Ok(());
        }

        let block = Block::copy_from_slice(block).expect("length checked above");
        round.their_blocks.insert(from, block);

        if self.current_round_complete() {
            self.advance_round();
        }

        Ok(())
    }

    /// Contribute the local payload to the current round.
    ///
    /// The payload is XOR-masked with the keystream read at the current
    /// round's sequence number, recorded as our block, and queued to every
    /// peer. Supply an all-zero payload to participate without sending
    /// content — rounds only complete when everyone contributes.
    ///
    /// # Errors
    ///
    /// All failures leave the session untouched:
    /// - [`SessionError::NotRunning`] before key exchange completes
    /// - [`SessionError::AlreadyParticipated`] on a second call in one
    ///   round
    /// - [`SessionError::WrongLength`] unless
    ///   `message.len() == BLOCK_SIZE`
    pub fn participate_in_round(&mut self, message: &[u8]) -> Result<(), SessionError> {
        let Some(round) = self.current_round.as_ref() else {
            return Err(SessionError::NotRunning);
        };
        if round.our_block.is_some() {
            return Err(SessionError::AlreadyParticipated);
        }
        if message.len() != BLOCK_SIZE {
            return Err(SessionError::WrongLength { expected: BLOCK_SIZE, actual: message.len() });
        }

        let sequence_number = round.sequence_number;
        let keystream =
            self.keystream.as_ref().expect("keystream exists whenever a round is current");

        let mut masked = keystream.read(sequence_number, BLOCK_SIZE);
        for (byte, message_byte) in masked.iter_mut().zip(message) {
            *byte ^= message_byte;
        }
        let block = Block::copy_from_slice(&masked).expect("keystream read is block-sized");
        masked.zeroize();

        self.current_round
            .as_mut()
            .expect("checked above")
            .our_block = Some(block.clone());

        for queue in self.queues.values_mut() {
            queue.push_back(Outbound::Block { sequence_number, block: block.clone() });
        }

        tracing::debug!(group_id = self.group_id, sequence_number, "participated in round");

        if self.current_round_complete() {
            self.advance_round();
        }

        Ok(())
    }

    /// Pop the oldest queued outbound message for `peer`.
    ///
    /// Messages come out in the order they were enqueued. Returns `None`
    /// for unknown peers and drained queues alike.
    pub fn pop_message(&mut self, peer: &PublicKey) -> Option<Outbound> {
        self.queues.get_mut(peer)?.pop_front()
    }

    /// Pop the oldest completed round's recovered content.
    ///
    /// Results appear in sequence order: each is the XOR of every
    /// participant's payload for that round, keystreams cancelled.
    pub fn pop_result(&mut self) -> Option<Block> {
        self.results.pop_front()
    }

    fn current_round_complete(&self) -> bool {
        self.current_round.as_ref().is_some_and(|round| {
            round.our_block.is_some() && round.their_blocks.len() == self.our_shared_keys.len()
        })
    }

    /// Emit the current round's result (if one is live) and promote the
    /// next round.
    fn advance_round(&mut self) {
        if let Some(round) = self.current_round.take() {
            debug_assert!(round.their_blocks.len() == self.our_shared_keys.len());

            let mut result = round.our_block.expect("completed rounds hold a local block");
            for block in round.their_blocks.values() {
                result.xor_assign(block);
            }

            tracing::debug!(
                group_id = self.group_id,
                sequence_number = round.sequence_number,
                "round complete"
            );
            self.results.push_back(result);
        }

        let promoted_sequence = self.next_round.sequence_number;
        let fresh = Round::new(
            promoted_sequence.checked_add(1).expect("round sequence number overflow"),
        );
        self.current_round = Some(mem::replace(&mut self.next_round, fresh));
    }

    fn enqueue_error(&mut self, peer: PublicKey, text: &str) {
        self.queues
            .get_mut(&peer)
            .expect("errors are only queued for members")
            .push_back(Outbound::Error(text.to_owned()));
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("group_id", &self.group_id)
            .field("state", &self.state())
            .field("peers", &self.our_shared_keys.len())
            .field("current_sequence_number", &self.current_sequence_number())
            .field("pending_results", &self.results.len())
            .finish_non_exhaustive()
    }
}
