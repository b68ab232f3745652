//! Demultiplexes wire traffic onto sessions.
//!
//! The router sits between the transport and one [`Session`] per group.
//! Sessions never touch the transport: inbound messages are delivered to
//! them by method call, and their outbound queues are drained here into
//! [`RouterAction`]s a driver executes. This keeps every session a pure,
//! synchronous state machine and pushes all I/O to the edge.
//!
//! # Isolation
//!
//! The router is the sole enforcer of session membership: a session never
//! sees an inbound call sourced from a peer outside its membership set,
//! and traffic is dispatched strictly by group id, so cross-group
//! delivery cannot happen. Messages that match no session, or arrive from
//! a non-member, are answered with a text error to the sender.
//!
//! # Ownership
//!
//! The router owns its sessions; sessions hold no back-reference. The
//! driver owns the router and the transport, and is the only place the
//! two meet.

use std::collections::{BTreeSet, HashMap};

use crate::{
    env::Environment,
    error::RouterError,
    identity::PublicKey,
    secret::SharedSecret,
    session::Session,
};
use spartic_proto::{GroupId, Message};

const ERR_UNEXPECTED_KEY: &str = "unexpected key";
const ERR_UNEXPECTED_BLOCK: &str = "unexpected block";

/// Actions returned by the router for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Ask the transport to connect to this peer.
    Dial(PublicKey),

    /// Hand this message to the peer's live messenger.
    Send {
        /// Recipient
        to: PublicKey,
        /// Message to serialize and send
        message: Message,
    },
}

/// Per-participant message router.
///
/// Holds one session per group and tracks which peers currently have a
/// live messenger. Draining only emits `Send` actions for connected
/// peers; everything else stays queued inside the sessions until the peer
/// comes up.
#[derive(Debug, Default)]
pub struct Router {
    sessions: HashMap<GroupId, Session>,
    connected: BTreeSet<PublicKey>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `group_id` and return one
    /// [`RouterAction::Dial`] per peer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::GroupAlreadyExists`] if a session for the
    /// group is already present, or a [`SessionError`](crate::SessionError)
    /// from session construction.
    pub fn create_session<E: Environment>(
        &mut self,
        group_id: GroupId,
        other_pubkeys: &BTreeSet<PublicKey>,
        env: &E,
    ) -> Result<Vec<RouterAction>, RouterError> {
        if self.sessions.contains_key(&group_id) {
            return Err(RouterError::GroupAlreadyExists(group_id));
        }

        let session = Session::new(group_id, other_pubkeys, env)?;
        self.sessions.insert(group_id, session);

        Ok(other_pubkeys.iter().copied().map(RouterAction::Dial).collect())
    }

    /// The session for `group_id`, if one exists.
    #[must_use]
    pub fn session(&self, group_id: GroupId) -> Option<&Session> {
        self.sessions.get(&group_id)
    }

    /// Mutable access to the session for `group_id`.
    ///
    /// This is the embedding's handle for
    /// [`participate_in_round`](Session::participate_in_round) and
    /// [`pop_result`](Session::pop_result).
    #[must_use]
    pub fn session_mut(&mut self, group_id: GroupId) -> Option<&mut Session> {
        self.sessions.get_mut(&group_id)
    }

    /// Record that the transport established a connection to `peer`.
    pub fn peer_connected(&mut self, peer: PublicKey) {
        self.connected.insert(peer);
    }

    /// Record that the connection to `peer` went away. Outbound traffic
    /// for the peer keeps queueing inside sessions.
    pub fn peer_disconnected(&mut self, peer: &PublicKey) {
        self.connected.remove(peer);
    }

    /// True if `peer` currently has a live messenger.
    #[must_use]
    pub fn is_connected(&self, peer: &PublicKey) -> bool {
        self.connected.contains(peer)
    }

    /// Dispatch one inbound message from an authenticated peer.
    ///
    /// Delivery requires a session for the message's group with `from` in
    /// its membership; otherwise the sender is answered with a text error.
    /// Inbound `Error` messages are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns an error only for internal invariant violations surfaced by
    /// the session; protocol problems never fail this method.
    pub fn handle_message(
        &mut self,
        from: PublicKey,
        message: Message,
    ) -> Result<Vec<RouterAction>, RouterError> {
        match message {
            Message::Key { group_id, shared_key } => {
                let Some(session) = self.member_session(group_id, &from) else {
                    return Ok(reject(from, ERR_UNEXPECTED_KEY));
                };
                session.receive_key(from, SharedSecret::from_bytes(shared_key))?;
                Ok(Vec::new())
            },
            Message::Block { group_id, sequence_number, block } => {
                let Some(session) = self.member_session(group_id, &from) else {
                    return Ok(reject(from, ERR_UNEXPECTED_BLOCK));
                };
                session.receive_block(from, sequence_number, &block)?;
                Ok(Vec::new())
            },
            Message::Error { text } => {
                tracing::warn!(peer = %from, text = %text, "peer reported an error");
                Ok(Vec::new())
            },
        }
    }

    /// Drain one session's outbound queues for every connected peer.
    ///
    /// Emits `Send` actions in per-peer FIFO order; messages for peers
    /// without a live messenger remain queued.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::GroupNotFound`] for an unknown group.
    pub fn send_session_messages(
        &mut self,
        group_id: GroupId,
    ) -> Result<Vec<RouterAction>, RouterError> {
        let session =
            self.sessions.get_mut(&group_id).ok_or(RouterError::GroupNotFound(group_id))?;

        Ok(drain_session(session, &self.connected))
    }

    /// Drain every session's outbound queues for every connected peer.
    pub fn drain_all(&mut self) -> Vec<RouterAction> {
        let connected = &self.connected;
        self.sessions.values_mut().flat_map(|session| drain_session(session, connected)).collect()
    }

    fn member_session(&mut self, group_id: GroupId, from: &PublicKey) -> Option<&mut Session> {
        self.sessions.get_mut(&group_id).filter(|session| session.contains_peer(from))
    }
}

fn drain_session(session: &mut Session, connected: &BTreeSet<PublicKey>) -> Vec<RouterAction> {
    let group_id = session.group_id();
    let peers: Vec<PublicKey> = session.peers().copied().collect();

    let mut actions = Vec::new();
    for peer in peers {
        if !connected.contains(&peer) {
            continue;
        }
        while let Some(outbound) = session.pop_message(&peer) {
            actions.push(RouterAction::Send { to: peer, message: outbound.into_message(group_id) });
        }
    }
    actions
}

fn reject(to: PublicKey, text: &str) -> Vec<RouterAction> {
    tracing::warn!(peer = %to, text, "rejecting unexpected message");
    vec![RouterAction::Send { to, message: Message::Error { text: text.to_owned() } }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::testing::TestEnv;
    use crate::session::SessionState;
    use spartic_proto::{MessageKind, SECRET_SIZE};

    const GROUP: GroupId = 1;

    fn key(index: u8) -> PublicKey {
        let mut bytes = [0u8; PublicKey::LEN];
        bytes[0] = index + 1;
        PublicKey::from_bytes(bytes)
    }

    fn router_with_session(peers: &[PublicKey]) -> Router {
        let env = TestEnv::with_seed(5);
        let mut router = Router::new();
        let peer_set: BTreeSet<PublicKey> = peers.iter().copied().collect();
        router.create_session(GROUP, &peer_set, &env).expect("fresh group");
        router
    }

    #[test]
    fn create_session_dials_every_peer() {
        let env = TestEnv::with_seed(5);
        let mut router = Router::new();
        let peers: BTreeSet<PublicKey> = [key(1), key(2)].into_iter().collect();

        let actions = router.create_session(GROUP, &peers, &env).expect("fresh group");

        assert_eq!(actions, vec![RouterAction::Dial(key(1)), RouterAction::Dial(key(2))]);
        assert!(router.session(GROUP).is_some());
    }

    #[test]
    fn duplicate_group_is_rejected() {
        let env = TestEnv::with_seed(5);
        let mut router = router_with_session(&[key(1)]);
        let peers: BTreeSet<PublicKey> = [key(1)].into_iter().collect();

        let result = router.create_session(GROUP, &peers, &env);

        assert_eq!(result.err(), Some(RouterError::GroupAlreadyExists(GROUP)));
    }

    #[test]
    fn key_for_unknown_group_is_answered_with_error() {
        let mut router = router_with_session(&[key(1)]);

        let actions = router
            .handle_message(key(1), Message::Key { group_id: 99, shared_key: [0; SECRET_SIZE] })
            .expect("rejection is not a failure");

        assert_eq!(actions, vec![RouterAction::Send {
            to: key(1),
            message: Message::Error { text: "unexpected key".to_owned() },
        }]);
    }

    #[test]
    fn message_from_non_member_is_answered_with_error() {
        let mut router = router_with_session(&[key(1)]);
        let stranger = key(7);

        let actions = router
            .handle_message(stranger, Message::Block {
                group_id: GROUP,
                sequence_number: 0,
                block: bytes::Bytes::from(vec![0u8; 16]),
            })
            .expect("rejection is not a failure");

        assert_eq!(actions, vec![RouterAction::Send {
            to: stranger,
            message: Message::Error { text: "unexpected block".to_owned() },
        }]);

        // The session never saw the stranger's block.
        assert_eq!(router.session(GROUP).expect("session exists").state(), SessionState::Setup);
    }

    #[test]
    fn member_key_is_delivered_to_the_session() {
        let mut router = router_with_session(&[key(1)]);

        router
            .handle_message(key(1), Message::Key { group_id: GROUP, shared_key: [9; SECRET_SIZE] })
            .expect("member delivery");

        assert_eq!(router.session(GROUP).expect("session exists").state(), SessionState::Running);
    }

    #[test]
    fn inbound_error_text_is_swallowed() {
        let mut router = router_with_session(&[key(1)]);

        let actions = router
            .handle_message(key(1), Message::Error { text: "something broke".to_owned() })
            .expect("errors are logged, not failed");

        assert!(actions.is_empty());
    }

    #[test]
    fn drain_skips_disconnected_peers() {
        let mut router = router_with_session(&[key(1), key(2)]);

        // Nobody connected: everything stays queued.
        assert!(router.send_session_messages(GROUP).expect("group exists").is_empty());

        router.peer_connected(key(1));
        let actions = router.send_session_messages(GROUP).expect("group exists");
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            RouterAction::Send { to, message } => {
                assert_eq!(*to, key(1));
                assert_eq!(message.kind(), MessageKind::Key);
            },
            other => panic!("expected Send, got {other:?}"),
        }

        // Key(2)'s key half is still queued and drains on connect.
        router.peer_connected(key(2));
        let actions = router.drain_all();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            RouterAction::Send { to, message } => {
                assert_eq!(*to, key(2));
                assert_eq!(message.kind(), MessageKind::Key);
            },
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn drain_of_unknown_group_fails() {
        let mut router = Router::new();

        assert_eq!(router.send_session_messages(3).err(), Some(RouterError::GroupNotFound(3)));
    }

    #[test]
    fn disconnect_requeues_nothing_but_stops_draining() {
        let mut router = router_with_session(&[key(1)]);
        router.peer_connected(key(1));
        router.peer_disconnected(&key(1));

        assert!(!router.is_connected(&key(1)));
        assert!(router.drain_all().is_empty());
    }
}
