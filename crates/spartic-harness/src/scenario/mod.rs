//! Scenario testing framework for deterministic group simulation.
//!
//! A [`World`] is a complete Spartic group held in memory: one router per
//! participant, everybody mutually connected, wire messages shuttled
//! through the real codec but never through a socket. The [`Scenario`]
//! builder constructs a world from a seed and enforces the oracle
//! pattern: every scenario ends in a verification function, so a test
//! cannot silently verify nothing.

mod world;

pub use world::World;

use spartic_core::SessionState;
use spartic_proto::GroupId;

use crate::sim_env::SimEnv;

/// Verification function run against the settled world.
pub type OracleFn = Box<dyn FnOnce(&mut World) -> Result<(), String>>;

/// Scenario builder.
///
/// Configure the group size and RNG seed, then attach an oracle to make
/// the scenario runnable.
pub struct Scenario {
    group_id: GroupId,
    participants: usize,
    seed: u64,
}

impl Scenario {
    /// Create a scenario with two participants, group id 1, and seed 0.
    #[must_use]
    pub fn new() -> Self {
        Self { group_id: 1, participants: 2, seed: 0 }
    }

    /// Set the number of participants (minimum 2).
    #[must_use]
    pub fn with_participants(mut self, participants: usize) -> Self {
        self.participants = participants;
        self
    }

    /// Set the RNG seed all secrets derive from.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the group identifier.
    #[must_use]
    pub fn with_group_id(mut self, group_id: GroupId) -> Self {
        self.group_id = group_id;
        self
    }

    /// Attach the oracle and return a runnable scenario.
    ///
    /// The oracle is mandatory — a scenario cannot run without
    /// verification.
    #[must_use]
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Build the world, run the key exchange to quiescence, verify every
    /// session reached `Running`, then invoke the oracle.
    ///
    /// # Errors
    ///
    /// Returns a description of the first failure: a session stuck in
    /// setup, or whatever the oracle reports.
    pub fn run(self) -> Result<(), String> {
        let env = SimEnv::with_seed(self.scenario.seed);
        let mut world = World::new(self.scenario.group_id, self.scenario.participants, &env);

        world.settle();

        for i in 0..world.participant_count() {
            if world.session(i).state() != SessionState::Running {
                return Err(format!("participant {i} did not finish key exchange"));
            }
        }

        (self.oracle)(&mut world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        // This should compile - oracle provided.
        let _scenario = Scenario::new().oracle(Box::new(|_world| Ok(())));
    }

    #[test]
    fn scenario_finishes_key_exchange_before_the_oracle() {
        Scenario::new()
            .with_participants(3)
            .with_seed(11)
            .oracle(Box::new(|world| {
                for i in 0..world.participant_count() {
                    if !world.session(i).ready_to_participate() {
                        return Err(format!("participant {i} not ready"));
                    }
                }
                Ok(())
            }))
            .run()
            .expect("scenario should succeed");
    }
}
