//! Randomness abstraction for deterministic testing.
//!
//! The only side effect the Spartic core needs is entropy: shared secret
//! halves must be uniformly random. The `Environment` trait decouples that
//! from the OS so that:
//!
//! - Simulation (`spartic-harness::SimEnv`) injects a seeded RNG, making
//!   every test run byte-for-byte reproducible.
//! - Production embeddings inject a crypto-secure RNG backed by the OS
//!   entropy pool, without any code change in the protocol logic.
//!
//! Protocol state machines never call an RNG directly; an `Environment` is
//! passed where secrets are born and nowhere else. There is no clock in
//! the core at all — sessions have no timeouts, so time never enters.

/// Abstract source of randomness.
///
/// # Invariants
///
/// - Determinism during simulation: given the same seed, `random_bytes`
///   produces the same sequence.
/// - Unpredictability in production: implementations MUST draw from a
///   cryptographically secure source; shared secrets are only as good as
///   the entropy behind them.
/// - Clones of one environment share RNG state, so independently cloned
///   handles never replay each other's output.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::Environment;

    /// Seeded environment for unit tests in this crate.
    #[derive(Clone)]
    pub(crate) struct TestEnv {
        rng: Arc<Mutex<ChaCha20Rng>>,
    }

    impl TestEnv {
        pub(crate) fn with_seed(seed: u64) -> Self {
            Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
        }
    }

    impl Environment for TestEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().expect("test env rng").fill_bytes(buffer);
        }
    }
}
