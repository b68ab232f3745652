//! Turmoil-based transport implementation using simulated TCP.
//!
//! Implements the core [`Transport`]/[`Messenger`] traits over Turmoil's
//! deterministic TCP streams, so end-to-end tests can run whole groups
//! across simulated hosts with controlled ordering and fault injection.
//!
//! Framing is a 4-byte big-endian length prefix followed by one encoded
//! wire message, matching the "message-framed transport" the protocol
//! assumes.
//!
//! # Identity Exchange
//!
//! On connect, the dialing side writes its 32-byte identity key and reads
//! the acceptor's; the acceptor does the reverse. The simulation trusts
//! this exchange — production transports must authenticate the identity
//! key cryptographically during their handshake.

use std::{collections::HashMap, io, sync::Mutex};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    sync::{Mutex as AsyncMutex, mpsc},
};
use turmoil::net::{TcpListener, TcpStream};

use spartic_core::{
    PublicKey,
    transport::{Messenger, PeerInfo, Transport},
};
use spartic_proto::{MAX_MESSAGE_SIZE, Message};

/// A message channel over one simulated TCP connection.
pub struct SimMessenger {
    stream: TcpStream,
}

impl SimMessenger {
    fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Messenger for SimMessenger {
    async fn send(&mut self, message: &Message) -> io::Result<()> {
        let bytes = message.to_vec();
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "message exceeds maximum encoded size",
            ));
        }

        let len = bytes.len() as u32;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(&bytes).await?;
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Option<Message>> {
        let mut len_bytes = [0u8; 4];
        match self.stream.read_exact(&mut len_bytes).await {
            Ok(_) => {},
            // Clean shutdown between frames.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let len = u32::from_be_bytes(len_bytes) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame exceeds maximum message size",
            ));
        }

        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).await?;

        let message =
            Message::decode(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(message))
    }
}

/// Simulated transport: one listening endpoint per host, peers dialed by
/// identity key through a registered address book.
pub struct SimTransport {
    public_key: PublicKey,
    listener: TcpListener,
    address_book: Mutex<HashMap<PublicKey, String>>,
    dialed_tx: mpsc::UnboundedSender<(SimMessenger, PeerInfo)>,
    dialed_rx: AsyncMutex<mpsc::UnboundedReceiver<(SimMessenger, PeerInfo)>>,
}

impl SimTransport {
    /// Bind a listening endpoint for the participant identified by
    /// `public_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is already in use or invalid.
    pub async fn bind(public_key: PublicKey, address: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let (dialed_tx, dialed_rx) = mpsc::unbounded_channel();

        Ok(Self {
            public_key,
            listener,
            address_book: Mutex::new(HashMap::new()),
            dialed_tx,
            dialed_rx: AsyncMutex::new(dialed_rx),
        })
    }

    /// Teach the transport where a peer lives. Peer discovery is out of
    /// scope for the core, so the simulation gets a static address book.
    pub fn register_peer(&self, peer: PublicKey, address: impl Into<String>) {
        self.address_book
            .lock()
            .expect("address book mutex poisoned")
            .insert(peer, address.into());
    }
}

#[async_trait]
impl Transport for SimTransport {
    type Messenger = SimMessenger;

    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    async fn join_peer(&self, peer: PublicKey) -> io::Result<()> {
        let address = self
            .address_book
            .lock()
            .expect("address book mutex poisoned")
            .get(&peer)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "peer not in address book"))?;

        let mut stream = TcpStream::connect(&*address).await?;

        // Dialer speaks first.
        stream.write_all(self.public_key.as_bytes()).await?;
        let mut remote = [0u8; PublicKey::LEN];
        stream.read_exact(&mut remote).await?;

        let info = PeerInfo { public_key: PublicKey::from_bytes(remote) };
        if info.public_key != peer {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "peer identity mismatch"));
        }

        self.dialed_tx
            .send((SimMessenger::new(stream), info))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))?;
        Ok(())
    }

    async fn accept(&self) -> io::Result<(Self::Messenger, PeerInfo)> {
        let mut dialed = self.dialed_rx.lock().await;

        tokio::select! {
            accepted = self.listener.accept() => {
                let (mut stream, _addr) = accepted?;

                let mut remote = [0u8; PublicKey::LEN];
                stream.read_exact(&mut remote).await?;
                stream.write_all(self.public_key.as_bytes()).await?;

                Ok((SimMessenger::new(stream), PeerInfo { public_key: PublicKey::from_bytes(remote) }))
            },
            outbound = dialed.recv() => {
                outbound.ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use spartic_proto::SECRET_SIZE;

    use super::*;

    fn alice_key() -> PublicKey {
        PublicKey::from_bytes([1u8; PublicKey::LEN])
    }

    fn bob_key() -> PublicKey {
        PublicKey::from_bytes([2u8; PublicKey::LEN])
    }

    #[test]
    fn sim_transport_message_round_trip() {
        let mut sim = turmoil::Builder::new().build();

        sim.host("alice", || async {
            let transport = SimTransport::bind(alice_key(), "0.0.0.0:443").await?;
            let (mut messenger, peer) = transport.accept().await?;

            assert_eq!(peer.public_key, bob_key());

            let received = messenger.recv().await?.expect("bob sends one message");
            assert_eq!(received, Message::Key { group_id: 3, shared_key: [7u8; SECRET_SIZE] });

            messenger.send(&Message::Error { text: "ack".to_string() }).await?;

            Ok(())
        });

        sim.client("bob", async {
            let transport = SimTransport::bind(bob_key(), "0.0.0.0:443").await?;
            transport.register_peer(alice_key(), "alice:443");

            transport.join_peer(alice_key()).await?;
            let (mut messenger, peer) = transport.accept().await?;

            assert_eq!(peer.public_key, alice_key());

            messenger.send(&Message::Key { group_id: 3, shared_key: [7u8; SECRET_SIZE] }).await?;

            let reply = messenger.recv().await?.expect("alice replies");
            assert_eq!(reply, Message::Error { text: "ack".to_string() });

            Ok(())
        });

        sim.run().expect("simulation failed");
    }

    #[test]
    fn join_peer_requires_a_registered_address() {
        let mut sim = turmoil::Builder::new().build();

        sim.client("loner", async {
            let transport = SimTransport::bind(alice_key(), "0.0.0.0:443").await?;

            let err = transport.join_peer(bob_key()).await.expect_err("unknown peer");
            assert_eq!(err.kind(), io::ErrorKind::NotFound);

            Ok(())
        });

        sim.run().expect("simulation failed");
    }
}
