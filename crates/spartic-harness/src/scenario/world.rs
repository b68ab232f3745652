//! World state for scenario execution.
//!
//! A `World` holds one router per participant and plays postman between
//! them: outbound `Send` actions are encoded to wire bytes, decoded
//! again, and handed to the recipient's router, exactly as a driver
//! would. Delivery is synchronous and deterministic — messages move in
//! the order routers emit them — which is what makes scenario runs
//! reproducible from a seed.

use std::collections::{BTreeSet, VecDeque};

use spartic_core::{
    Block, PublicKey, Router, RouterAction, Session, SessionError,
};
use spartic_proto::{GroupId, Message};

use crate::sim_env::SimEnv;

struct Participant {
    public_key: PublicKey,
    router: Router,
}

/// An N-party group with in-memory message delivery.
pub struct World {
    group_id: GroupId,
    participants: Vec<Participant>,
}

impl World {
    /// Build a fully-connected world of `participants` routers, each with
    /// a session for `group_id`.
    ///
    /// Identities are drawn from `env`, so the whole world is a function
    /// of the seed. Key halves are queued but not yet delivered; call
    /// [`World::settle`] to run the exchange.
    ///
    /// # Panics
    ///
    /// Panics if `participants < 2`.
    #[must_use]
    pub fn new(group_id: GroupId, participants: usize, env: &SimEnv) -> Self {
        assert!(participants >= 2, "a group needs at least two participants");

        use spartic_core::Environment;
        let keys: Vec<PublicKey> = (0..participants)
            .map(|_| {
                let mut bytes = [0u8; PublicKey::LEN];
                env.random_bytes(&mut bytes);
                PublicKey::from_bytes(bytes)
            })
            .collect();

        let participants = (0..participants)
            .map(|i| {
                let mut router = Router::new();
                let others: BTreeSet<PublicKey> =
                    keys.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, &k)| k).collect();

                // The world is fully connected from the start, so Dial
                // actions have nothing left to do.
                let _dials = router
                    .create_session(group_id, &others, env)
                    .expect("group is fresh per router");
                for &peer in &others {
                    router.peer_connected(peer);
                }

                Participant { public_key: keys[i], router }
            })
            .collect();

        Self { group_id, participants }
    }

    /// Number of participants in the world.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Identity key of participant `i`.
    #[must_use]
    pub fn public_key(&self, i: usize) -> PublicKey {
        self.participants[i].public_key
    }

    /// Participant `i`'s router.
    #[must_use]
    pub fn router(&self, i: usize) -> &Router {
        &self.participants[i].router
    }

    /// Mutable access to participant `i`'s router, for tests that inject
    /// crafted traffic.
    pub fn router_mut(&mut self, i: usize) -> &mut Router {
        &mut self.participants[i].router
    }

    /// Participant `i`'s session for the world's group.
    #[must_use]
    pub fn session(&self, i: usize) -> &Session {
        self.participants[i]
            .router
            .session(self.group_id)
            .expect("session created at world construction")
    }

    /// Participant `i` contributes `message` to its current round.
    ///
    /// # Errors
    ///
    /// Propagates the session's caller-error surface unchanged.
    pub fn participate(&mut self, i: usize, message: &[u8]) -> Result<(), SessionError> {
        self.participants[i]
            .router
            .session_mut(self.group_id)
            .expect("session created at world construction")
            .participate_in_round(message)
    }

    /// Pop participant `i`'s oldest recovered round result.
    pub fn pop_result(&mut self, i: usize) -> Option<Block> {
        self.participants[i]
            .router
            .session_mut(self.group_id)
            .expect("session created at world construction")
            .pop_result()
    }

    /// Run one full round: every participant contributes its payload,
    /// traffic settles, and each participant's recovered result is
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics if `payloads` does not hold one payload per participant, if
    /// any participation fails, or if any participant fails to recover a
    /// result.
    pub fn run_round(&mut self, payloads: &[Vec<u8>]) -> Vec<Block> {
        assert_eq!(payloads.len(), self.participants.len(), "one payload per participant");

        for (i, payload) in payloads.iter().enumerate() {
            self.participate(i, payload).expect("round is open for participation");
        }
        self.settle();

        (0..self.participants.len())
            .map(|i| self.pop_result(i).expect("round completed for every participant"))
            .collect()
    }

    /// Shuttle messages between routers until nothing is in flight.
    ///
    /// Every message makes a real round trip through the wire codec on
    /// the way. Returns the number of messages delivered.
    pub fn settle(&mut self) -> usize {
        let mut delivered = 0;
        let mut inflight: VecDeque<(PublicKey, usize, Message)> = VecDeque::new();

        loop {
            for i in 0..self.participants.len() {
                let from = self.participants[i].public_key;
                for action in self.participants[i].router.drain_all() {
                    match action {
                        RouterAction::Send { to, message } => {
                            let wire = message.to_vec();
                            let decoded =
                                Message::decode(&wire).expect("world traffic round-trips");
                            inflight.push_back((from, self.index_of(&to), decoded));
                        },
                        RouterAction::Dial(_) => {},
                    }
                }
            }

            if inflight.is_empty() {
                return delivered;
            }

            while let Some((from, to, message)) = inflight.pop_front() {
                delivered += 1;

                let responder = self.participants[to].public_key;
                let responses = self.participants[to]
                    .router
                    .handle_message(from, message)
                    .expect("world delivery respects membership");

                for response in responses {
                    if let RouterAction::Send { to: target, message } = response {
                        inflight.push_back((responder, self.index_of(&target), message));
                    }
                }
            }
        }
    }

    fn index_of(&self, key: &PublicKey) -> usize {
        self.participants
            .iter()
            .position(|participant| participant.public_key == *key)
            .expect("message addressed to a world participant")
    }
}
