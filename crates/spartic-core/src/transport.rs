//! Transport abstraction.
//!
//! The core consumes a transport offering reliable, message-framed,
//! authenticated duplex channels keyed by a peer's long-term public
//! identity. Everything behind that interface — peer discovery, dialing
//! strategy, connection encryption, multiplexing — is out of scope here
//! and lives in the embedding:
//!
//! - **Production**: a real network stack that authenticates the remote
//!   identity key during its handshake.
//! - **Simulation** (`spartic-harness::SimTransport`): deterministic
//!   in-simulation TCP with an explicit identity exchange.
//!
//! The driver glues a [`Transport`] to a [`Router`](crate::router::Router):
//! it executes `Dial` actions via [`Transport::join_peer`], feeds accepted
//! connections into [`Router::peer_connected`](crate::router::Router::peer_connected),
//! pumps received messages into
//! [`Router::handle_message`](crate::router::Router::handle_message), and
//! writes drained `Send` actions to the matching [`Messenger`].

use std::io;

use async_trait::async_trait;

use crate::identity::PublicKey;
use spartic_proto::Message;

/// Authenticated facts about the remote end of a connection.
///
/// # Invariants
///
/// `public_key` MUST be authenticated by the transport at connect time.
/// Everything downstream — membership checks, keystream pairing — trusts
/// it; an unauthenticated key here breaks the anonymity set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    /// The peer's verified long-term identity key.
    pub public_key: PublicKey,
}

/// A duplex message channel to one peer.
///
/// Carries whole wire [`Message`]s; framing is the implementation's
/// problem (length prefixes, datagrams, whatever the medium offers).
/// Messages to one peer arrive in the order they were sent.
#[async_trait]
pub trait Messenger: Send + 'static {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the connection failed; the driver should
    /// report the peer disconnected and keep the session queued.
    async fn send(&mut self, message: &Message) -> io::Result<()>;

    /// Receive the next message, or `None` once the peer closed the
    /// channel cleanly.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for transport failures and undecodable
    /// frames.
    async fn recv(&mut self) -> io::Result<Option<Message>>;
}

/// Connection-oriented transport keyed by peer identity.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Channel type produced for each established connection.
    type Messenger: Messenger;

    /// The local participant's long-term identity key.
    fn public_key(&self) -> PublicKey;

    /// Schedule a connection attempt to `peer`.
    ///
    /// Resolution and dialing strategy are implementation-defined; the
    /// established connection surfaces through [`Transport::accept`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the attempt cannot even be scheduled
    /// (unknown peer, closed endpoint).
    async fn join_peer(&self, peer: PublicKey) -> io::Result<()>;

    /// Wait for the next established connection, inbound or outbound,
    /// with the peer's authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns an I/O error once the endpoint is shut down.
    async fn accept(&self) -> io::Result<(Self::Messenger, PeerInfo)>;
}
