//! Spartic protocol core logic.
//!
//! This crate contains the pure state machine logic for Spartic, a
//! sender-anonymous group messaging protocol built on *synchronized
//! keystreams*: N cooperating participants each emit a pseudorandom
//! stream such that the XOR of all N streams is identically zero. Each
//! participant XORs its own payload (or zeros) into its stream, broadcasts
//! the result, and recovers the round content by XORing every stream
//! together — the keystreams cancel and only the payloads remain, with no
//! way to attribute any bit to its author.
//!
//! The crate is completely decoupled from I/O, enabling deterministic
//! testing:
//!
//! ```text
//!      ┌────────────────────────────┐
//!      │ spartic-core               │
//!      │ - Synchronized keystream   │
//!      │ - Session state machine    │
//!      │ - Router demultiplexer     │
//!      └────────────────────────────┘
//!         ↓                      ↓
//! ┌──────────────────┐  ┌──────────────────┐
//! │ spartic-harness  │  │ embedding driver │
//! │ - Seeded RNG     │  │ - Real transport │
//! │ - Sim transport  │  │ - OS entropy     │
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in core: no sockets, no clock, no direct RNG calls
//! - All entropy enters through the [`env::Environment`] trait
//! - Sessions and the router are synchronous, non-reentrant state
//!   machines; the router returns actions for a driver to execute
//!
//! # Modules
//!
//! - [`block`]: fixed-size block XOR utilities
//! - [`keystream`]: the XOR-to-zero keystream primitive
//! - [`session`]: per-group session state machine (key exchange, rounds)
//! - [`router`]: demultiplexes wire messages onto sessions
//! - [`identity`] / [`secret`]: participant identity and secret material
//! - [`env`]: randomness abstraction
//! - [`transport`]: transport abstraction the driver consumes

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod block;
pub mod env;
pub mod error;
pub mod identity;
pub mod keystream;
pub mod round;
pub mod router;
pub mod secret;
pub mod session;
pub mod transport;

pub use block::Block;
pub use env::Environment;
pub use error::{RouterError, SessionError};
pub use identity::PublicKey;
pub use keystream::SynchronizedKeystream;
pub use round::Round;
pub use router::{Router, RouterAction};
pub use secret::SharedSecret;
pub use session::{Outbound, Session, SessionState};
pub use spartic_proto::{BLOCK_SIZE, GroupId, SECRET_SIZE};
