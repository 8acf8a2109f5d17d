//! Active and finished agent collections.
//!
//! Iteration order of `active` is insertion order and drives the pairing
//! tie-break, so it is kept stable: retirement removes agents with an
//! order-preserving partition, never a swap-remove.

use crate::agent::Agent;
use arena_env::AgentId;
use std::collections::HashSet;
use thiserror::Error;

/// A broken population invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("agent {id} has rank {rank} outside 0..={max_rank}")]
    RankOutOfBounds { id: AgentId, rank: u32, max_rank: u32 },

    #[error("population holds {actual} agents, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("agent {0} appears more than once")]
    DuplicateId(AgentId),

    #[error("agent {0} is finished but still active")]
    FinishedInActive(AgentId),

    #[error("agent {0} is in the finished collection without being finished")]
    UnfinishedInFinished(AgentId),
}

/// The closed set of agents for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    active: Vec<Agent>,

    /// Append-only, ordered by finish time
    finished: Vec<Agent>,

    initial_count: usize,
}

impl Population {
    /// Creates a population where every agent starts active.
    pub fn new(agents: Vec<Agent>) -> Self {
        let initial_count = agents.len();
        Self {
            active: agents,
            finished: Vec::new(),
            initial_count,
        }
    }

    pub fn active(&self) -> &[Agent] {
        &self.active
    }

    pub(crate) fn active_mut(&mut self) -> &mut [Agent] {
        &mut self.active
    }

    pub fn finished(&self) -> &[Agent] {
        &self.finished
    }

    /// Number of agents created at initialization.
    pub fn initial_count(&self) -> usize {
        self.initial_count
    }

    /// `|active| + |finished|`
    pub fn total(&self) -> usize {
        self.active.len() + self.finished.len()
    }

    /// Looks an agent up in either collection.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.active
            .iter()
            .chain(self.finished.iter())
            .find(|agent| agent.id == id)
    }

    /// Looks up an active agent.
    pub fn get_active(&self, id: AgentId) -> Option<&Agent> {
        self.active.iter().find(|agent| agent.id == id)
    }

    /// Looks up an active agent for mutation. Finished agents are never returned.
    pub fn get_active_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.active.iter_mut().find(|agent| agent.id == id)
    }

    /// Moves every `Finished` agent from active to finished, preserving order.
    ///
    /// Returns the ids that moved, in discovery order.
    pub fn partition_finished(&mut self) -> Vec<AgentId> {
        if !self.active.iter().any(Agent::is_finished) {
            return Vec::new();
        }

        let (done, still_active): (Vec<Agent>, Vec<Agent>) =
            std::mem::take(&mut self.active)
                .into_iter()
                .partition(Agent::is_finished);

        self.active = still_active;
        let moved = done.iter().map(|agent| agent.id).collect();
        self.finished.extend(done);
        moved
    }

    /// Verifies rank bounds, conservation of count and id uniqueness.
    ///
    /// Meant to be called between ticks, after the partition step.
    pub fn check_invariants(&self, max_rank: u32) -> Result<(), InvariantViolation> {
        if self.total() != self.initial_count {
            return Err(InvariantViolation::CountMismatch {
                expected: self.initial_count,
                actual: self.total(),
            });
        }

        let mut seen = HashSet::with_capacity(self.total());
        for agent in self.active.iter().chain(self.finished.iter()) {
            if !seen.insert(agent.id) {
                return Err(InvariantViolation::DuplicateId(agent.id));
            }
            if agent.rank > max_rank {
                return Err(InvariantViolation::RankOutOfBounds {
                    id: agent.id,
                    rank: agent.rank,
                    max_rank,
                });
            }
        }

        if let Some(agent) = self.active.iter().find(|a| a.is_finished()) {
            return Err(InvariantViolation::FinishedInActive(agent.id));
        }
        if let Some(agent) = self.finished.iter().find(|a| !a.is_finished()) {
            return Err(InvariantViolation::UnfinishedInFinished(agent.id));
        }

        Ok(())
    }
}
