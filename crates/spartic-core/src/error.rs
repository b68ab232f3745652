//! Error types for the Spartic core.
//!
//! Only *local caller* misuse surfaces here. Protocol violations by remote
//! peers are never `Err`: they are reported back to the offending peer as
//! queued [`Error`](spartic_proto::Message::Error) wire messages and leave
//! the session runnable (see [`session`](crate::session)).

use thiserror::Error;

use crate::identity::PublicKey;
use spartic_proto::GroupId;

/// Errors returned to the embedding application for session API misuse.
///
/// No session state is mutated when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session needs at least one other participant.
    #[error("a session needs at least one other participant")]
    NoPeers,

    /// The named peer is not a member of this session. The router's
    /// membership check makes this unreachable in normal operation.
    #[error("peer {0} is not a member of this session")]
    UnknownPeer(PublicKey),

    /// `participate_in_round` was called before key exchange completed.
    #[error("no round is ready for participation")]
    NotRunning,

    /// `participate_in_round` was called twice in the same round.
    #[error("the current round already holds our block")]
    AlreadyParticipated,

    /// The payload handed to `participate_in_round` is not block-sized.
    #[error("payload is {actual} bytes, a round block must be exactly {expected}")]
    WrongLength {
        /// Required block size
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },
}

/// Errors returned by the router for driver-side misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A session already exists for this group.
    #[error("group {0} already has a session")]
    GroupAlreadyExists(GroupId),

    /// No session exists for this group.
    #[error("no session for group {0}")]
    GroupNotFound(GroupId),

    /// A session call failed; see [`SessionError`].
    #[error(transparent)]
    Session(#[from] SessionError),
}
