//! Invariant oracle for simulation runs.
//!
//! The Oracle watches the population after every tick and every resolution:
//! - Rank bounds, conservation of count, unique ids (via `Population`)
//! - Finished agents retire at max rank and never change afterwards

use arena_core::{Agent, InvariantViolation, Population};
use arena_env::AgentId;
use thiserror::Error;

/// An invariant the Oracle found broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleViolation {
    #[error(transparent)]
    Population(#[from] InvariantViolation),

    #[error("finished agent {0} changed after retirement")]
    FinishedMutated(AgentId),

    #[error("finished agent {id} retired at rank {rank}, below max rank")]
    RetiredBelowMaxRank { id: AgentId, rank: u32 },

    #[error("finished collection shrank from {before} to {after}")]
    FinishedShrank { before: usize, after: usize },
}

/// Tracks every finished agent as first observed.
pub struct Oracle {
    max_rank: u32,

    /// Frozen copies, in finish order
    frozen: Vec<Agent>,

    checks: u64,
}

impl Oracle {
    /// Creates an oracle for a run with the given max rank.
    pub fn new(max_rank: u32) -> Self {
        Self {
            max_rank,
            frozen: Vec::new(),
            checks: 0,
        }
    }

    /// Number of checks performed.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Verifies all invariants and records newly finished agents.
    pub fn check(&mut self, population: &Population) -> Result<(), OracleViolation> {
        self.checks += 1;
        population.check_invariants(self.max_rank)?;

        let finished = population.finished();
        if finished.len() < self.frozen.len() {
            return Err(OracleViolation::FinishedShrank {
                before: self.frozen.len(),
                after: finished.len(),
            });
        }

        for (frozen, current) in self.frozen.iter().zip(finished) {
            if frozen != current {
                return Err(OracleViolation::FinishedMutated(frozen.id));
            }
        }

        for agent in &finished[self.frozen.len()..] {
            if agent.rank != self.max_rank {
                return Err(OracleViolation::RetiredBelowMaxRank {
                    id: agent.id,
                    rank: agent.rank,
                });
            }
            self.frozen.push(agent.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_env::Vec2i;

    fn agent(id: u32, rank: u32) -> Agent {
        Agent::new(AgentId(id), Vec2i::new(50, 50), Vec2i::new(1, 0), 10).with_rank(rank)
    }

    #[test]
    fn test_oracle_accepts_fresh_population() {
        let mut oracle = Oracle::new(3);
        let population = Population::new(vec![agent(0, 0), agent(1, 2)]);

        assert!(oracle.check(&population).is_ok());
        assert_eq!(oracle.checks(), 1);
    }

    #[test]
    fn test_oracle_reports_rank_violation() {
        let mut oracle = Oracle::new(3);
        let population = Population::new(vec![agent(0, 4)]);

        assert!(matches!(
            oracle.check(&population),
            Err(OracleViolation::Population(InvariantViolation::RankOutOfBounds { .. }))
        ));
    }
}
