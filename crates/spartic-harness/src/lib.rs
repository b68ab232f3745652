//! Deterministic simulation harness for Spartic protocol testing.
//!
//! This crate provides the pieces a test needs to run whole Spartic
//! groups without a network or an entropy pool:
//!
//! - [`SimEnv`]: a seeded RNG behind the core's `Environment` trait, so
//!   every generated secret — and therefore every keystream byte — is
//!   reproducible from a seed.
//! - [`scenario`]: an in-memory N-party world plus a builder that
//!   enforces oracle verification.
//! - [`SimTransport`]: a Turmoil-backed implementation of the core
//!   transport traits for end-to-end tests over simulated TCP.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod sim_env;
pub mod sim_transport;

pub use scenario::{Scenario, World};
pub use sim_env::SimEnv;
pub use sim_transport::{SimMessenger, SimTransport};
